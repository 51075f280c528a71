use std::collections::BTreeMap;

use super::{BoardStore, StoreError};
use crate::identity::{
    Allocation, apply_allocated, new_opaque_id, next_direct_entry_sequence, next_sequence,
};
use crate::model::{Idea, NewIdea, Post};

/// In-memory board store for tests and dry runs.
///
/// Every `&mut self` call is one atomic unit, so conflicts never arise on
/// their own; [`MemoryStore::inject_conflicts`] simulates losing races.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ideas: BTreeMap<String, Idea>,
    posts: BTreeMap<String, Post>,
    idea_counter: u32,
    direct_counter: u32,
    pending_conflicts: u32,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `commit_post` fail with a conflict.
    pub fn inject_conflicts(&mut self, count: u32) {
        self.pending_conflicts = count;
    }

    fn duplicate_of(&self, post: &Post) -> Option<String> {
        self.posts
            .values()
            .filter(|other| other.id != post.id)
            .find_map(|other| match (&post.idea_id, &other.idea_id) {
                (Some(mine), Some(theirs))
                    if mine == theirs && post.sequence.is_some() && post.sequence == other.sequence =>
                {
                    Some(format!("idea {mine}"))
                }
                (None, None)
                    if post.direct_entry_sequence.is_some()
                        && post.direct_entry_sequence == other.direct_entry_sequence =>
                {
                    Some("direct entries".to_string())
                }
                _ => None,
            })
    }
}

impl BoardStore for MemoryStore {
    fn idea(&self, id: &str) -> Result<Option<Idea>, StoreError> {
        Ok(self.ideas.get(id).cloned())
    }

    fn idea_by_number(&self, idea_number: u32) -> Result<Option<Idea>, StoreError> {
        Ok(self
            .ideas
            .values()
            .find(|idea| idea.idea_number == idea_number)
            .cloned())
    }

    fn ideas(&self) -> Result<Vec<Idea>, StoreError> {
        let mut ideas: Vec<Idea> = self.ideas.values().cloned().collect();
        ideas.sort_by_key(|idea| idea.idea_number);
        Ok(ideas)
    }

    fn create_idea(&mut self, idea: NewIdea) -> Result<Idea, StoreError> {
        self.idea_counter += 1;
        let created = Idea {
            id: new_opaque_id("ida", &idea.title),
            idea_number: self.idea_counter,
            title: idea.title,
            body: idea.body,
            pillar: idea.pillar,
            status: idea.status,
            resource_links: idea.resource_links,
            audio_ref: idea.audio_ref,
            created_at: idea.created_at,
            updated_at: idea.created_at,
        };
        self.ideas.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    fn update_idea(&mut self, idea: &Idea) -> Result<(), StoreError> {
        let Some(slot) = self.ideas.get_mut(&idea.id) else {
            return Err(StoreError::NotFound {
                kind: "idea",
                id: idea.id.clone(),
            });
        };
        *slot = Idea {
            idea_number: slot.idea_number,
            ..idea.clone()
        };
        Ok(())
    }

    fn delete_idea(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.ideas.remove(id).is_some())
    }

    fn post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(id).cloned())
    }

    fn posts(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<Post> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(posts)
    }

    fn posts_for_idea(&self, idea_id: &str) -> Result<Vec<Post>, StoreError> {
        Ok(self
            .posts
            .values()
            .filter(|post| post.idea_id.as_deref() == Some(idea_id))
            .cloned()
            .collect())
    }

    fn direct_entry_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self
            .posts
            .values()
            .filter(|post| post.is_direct_entry() && post.direct_entry_sequence.is_some())
            .cloned()
            .collect())
    }

    fn direct_entry_counter(&self) -> Result<u32, StoreError> {
        Ok(self.direct_counter)
    }

    fn commit_post(&mut self, mut post: Post, allocation: &Allocation) -> Result<Post, StoreError> {
        if self.pending_conflicts > 0 {
            self.pending_conflicts -= 1;
            return Err(StoreError::Conflict {
                scope: "injected".to_string(),
            });
        }

        match allocation {
            Allocation::Keep => {}
            Allocation::NextForIdea(idea_id) => {
                let others: Vec<Post> = self
                    .posts
                    .values()
                    .filter(|other| other.id != post.id)
                    .cloned()
                    .collect();
                let number = next_sequence(&others, idea_id);
                apply_allocated(&mut post, allocation, number);
            }
            Allocation::NextDirectEntry => {
                let number = next_direct_entry_sequence(self.direct_counter);
                apply_allocated(&mut post, allocation, number);
            }
        }

        if let Some(scope) = self.duplicate_of(&post) {
            return Err(StoreError::Conflict { scope });
        }

        if matches!(allocation, Allocation::NextDirectEntry) {
            self.direct_counter = post.direct_entry_sequence.unwrap_or(self.direct_counter);
        }
        self.posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    fn delete_post(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.posts.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(id: &str, idea_id: &str) -> Post {
        Post {
            id: id.to_string(),
            idea_id: Some(idea_id.to_string()),
            ..Post::default()
        }
    }

    #[test]
    fn allocates_per_idea_and_direct_counters() {
        let mut store = MemoryStore::new();
        let a = store
            .commit_post(linked("p1", "ida-1"), &Allocation::NextForIdea("ida-1".into()))
            .expect("commit");
        let b = store
            .commit_post(linked("p2", "ida-1"), &Allocation::NextForIdea("ida-1".into()))
            .expect("commit");
        let c = store
            .commit_post(linked("p3", "ida-2"), &Allocation::NextForIdea("ida-2".into()))
            .expect("commit");
        assert_eq!((a.sequence, b.sequence, c.sequence), (Some(1), Some(2), Some(1)));

        let d = store
            .commit_post(
                Post {
                    id: "p4".to_string(),
                    ..Post::default()
                },
                &Allocation::NextDirectEntry,
            )
            .expect("commit");
        assert_eq!(d.direct_entry_sequence, Some(1));
        assert_eq!(store.direct_entry_counter().expect("counter"), 1);
    }

    #[test]
    fn keep_with_duplicate_sequence_conflicts() {
        let mut store = MemoryStore::new();
        store
            .commit_post(linked("p1", "ida-1"), &Allocation::NextForIdea("ida-1".into()))
            .expect("commit");
        let clash = Post {
            sequence: Some(1),
            ..linked("p2", "ida-1")
        };
        let err = store
            .commit_post(clash, &Allocation::Keep)
            .expect_err("duplicate must conflict");
        assert!(err.is_conflict());
    }

    #[test]
    fn injected_conflicts_are_consumed() {
        let mut store = MemoryStore::new();
        store.inject_conflicts(1);
        assert!(
            store
                .commit_post(linked("p1", "ida-1"), &Allocation::NextForIdea("ida-1".into()))
                .is_err()
        );
        assert!(
            store
                .commit_post(linked("p1", "ida-1"), &Allocation::NextForIdea("ida-1".into()))
                .is_ok()
        );
    }

    #[test]
    fn deleting_an_idea_leaves_posts() {
        let mut store = MemoryStore::new();
        let idea = store.create_idea(NewIdea::default()).expect("idea");
        store
            .commit_post(linked("p1", &idea.id), &Allocation::NextForIdea(idea.id.clone()))
            .expect("commit");
        assert!(store.delete_idea(&idea.id).expect("delete"));
        assert_eq!(store.posts_for_idea(&idea.id).expect("posts").len(), 1);
        assert!(store.idea(&idea.id).expect("lookup").is_none());
    }

    #[test]
    fn idea_numbers_are_monotonic_across_deletes() {
        let mut store = MemoryStore::new();
        let first = store.create_idea(NewIdea::default()).expect("idea");
        store.delete_idea(&first.id).expect("delete");
        let second = store.create_idea(NewIdea::default()).expect("idea");
        assert_eq!((first.idea_number, second.idea_number), (1, 2));
    }
}
