//! On-disk SQLite board tests: persistence, orphaning, and concurrent writers.
//!
//! Each writer thread owns its own connection to the same database file,
//! the way two CLI processes would.

use std::path::Path;
use std::thread;

use chrono::NaiveDate;
use laneboard_core::clock::FixedClock;
use laneboard_core::config::{BoardConfig, board_db_path};
use laneboard_core::identity::{DisplayId, format_id};
use laneboard_core::model::{NewIdea, Platform, Post};
use laneboard_core::session::{SaveOptions, save_post};
use laneboard_core::store::{BoardStore, SqliteStore, resolve_post};
use tempfile::TempDir;

fn clock() -> FixedClock {
    FixedClock::at_local(
        NaiveDate::from_ymd_opt(2024, 4, 2)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid instant"),
    )
}

fn draft(title: &str, idea_id: Option<&str>) -> Post {
    Post {
        title: title.to_string(),
        platform: Some(Platform::Instagram),
        idea_id: idea_id.map(str::to_string),
        ..Post::default()
    }
}

fn open(root: &Path) -> SqliteStore {
    SqliteStore::open(&board_db_path(root)).expect("open board")
}

fn save(store: &mut SqliteStore, post: Post) -> Post {
    save_post(
        store,
        &BoardConfig::default(),
        &clock(),
        post,
        SaveOptions::default(),
    )
    .expect("save")
    .post
}

#[test]
fn counters_survive_reopen() {
    let dir = TempDir::new().expect("temp dir");
    {
        let mut store = open(dir.path());
        save(&mut store, draft("first", None));
        store.create_idea(NewIdea::default()).expect("idea");
    }

    let mut store = open(dir.path());
    let second = save(&mut store, draft("second", None));
    assert_eq!(second.direct_entry_sequence, Some(2));
    let idea = store.create_idea(NewIdea::default()).expect("idea");
    assert_eq!(idea.idea_number, 2);
}

#[test]
fn deleted_sequences_are_not_reused() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(dir.path());
    let idea = store.create_idea(NewIdea::default()).expect("idea");

    let first = save(&mut store, draft("a", Some(&idea.id)));
    save(&mut store, draft("b", Some(&idea.id)));
    let third = save(&mut store, draft("c", Some(&idea.id)));
    assert_eq!(third.sequence, Some(3));

    assert!(store.delete_post(&first.id).expect("delete"));
    let fourth = save(&mut store, draft("d", Some(&idea.id)));
    assert_eq!(fourth.sequence, Some(4));

    let direct = save(&mut store, draft("e", None));
    assert!(store.delete_post(&direct.id).expect("delete"));
    let next_direct = save(&mut store, draft("f", None));
    assert_eq!(next_direct.direct_entry_sequence, Some(2));
}

#[test]
fn deleting_an_idea_orphans_its_posts() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(dir.path());
    let idea = store.create_idea(NewIdea::default()).expect("idea");
    let post = save(&mut store, draft("linked", Some(&idea.id)));

    let loaded_idea = store.idea(&idea.id).expect("lookup");
    assert_eq!(
        format_id(&post, loaded_idea.as_ref()).to_string(),
        "POST-1-1"
    );
    assert_eq!(resolve_post(&store, "post-1-1").expect("by display id").id, post.id);

    assert!(store.delete_idea(&idea.id).expect("delete idea"));
    let stored = store.post(&post.id).expect("lookup").expect("post kept");
    let gone = store.idea(&idea.id).expect("lookup");
    assert_eq!(
        format_id(&stored, gone.as_ref()),
        DisplayId::Orphaned { sequence: Some(1) }
    );
}

#[test]
fn concurrent_direct_entries_get_distinct_numbers() {
    const PER_WRITER: usize = 20;
    let dir = TempDir::new().expect("temp dir");
    let writers = [open(dir.path()), open(dir.path())];

    let mut numbers: Vec<u32> = thread::scope(|scope| {
        let handles: Vec<_> = writers
            .into_iter()
            .enumerate()
            .map(|(writer, mut store)| {
                scope.spawn(move || {
                    (0..PER_WRITER)
                        .map(|n| {
                            save(&mut store, draft(&format!("w{writer}-{n}"), None))
                                .direct_entry_sequence
                                .expect("numbered")
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("writer thread"))
            .collect()
    });

    numbers.sort_unstable();
    let expected: Vec<u32> = (1..=u32::try_from(PER_WRITER * 2).expect("fits")).collect();
    assert_eq!(numbers, expected);

    let store = open(dir.path());
    assert_eq!(
        store.direct_entry_counter().expect("counter"),
        u32::try_from(PER_WRITER * 2).expect("fits")
    );
}

#[test]
fn concurrent_linked_posts_get_distinct_sequences() {
    const PER_WRITER: usize = 15;
    let dir = TempDir::new().expect("temp dir");
    let idea_id = {
        let mut store = open(dir.path());
        store.create_idea(NewIdea::default()).expect("idea").id
    };
    let writers = [open(dir.path()), open(dir.path())];

    thread::scope(|scope| {
        for (writer, mut store) in writers.into_iter().enumerate() {
            let idea_id = idea_id.as_str();
            scope.spawn(move || {
                for n in 0..PER_WRITER {
                    save(&mut store, draft(&format!("w{writer}-{n}"), Some(idea_id)));
                }
            });
        }
    });

    let store = open(dir.path());
    let mut sequences: Vec<u32> = store
        .posts_for_idea(&idea_id)
        .expect("posts")
        .into_iter()
        .map(|post| post.sequence.expect("sequenced"))
        .collect();
    sequences.sort_unstable();
    let expected: Vec<u32> = (1..=u32::try_from(PER_WRITER * 2).expect("fits")).collect();
    assert_eq!(sequences, expected);
}
