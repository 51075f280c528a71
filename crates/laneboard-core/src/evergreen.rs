//! Evergreen resurfacing dates.
//!
//! An evergreen post comes back for repurposing `cycle_days` after it was
//! published. Everything here is recomputed per query; nothing is stored
//! besides the post's own `repurpose_date`.

use chrono::{Days, NaiveDate};

use crate::model::Post;

/// Default repurpose date: `publish_date + cycle_days`.
///
/// Undated posts (an evergreen draft) count from `today` instead.
#[must_use]
pub fn default_repurpose_date(
    publish_date: Option<NaiveDate>,
    cycle_days: u32,
    today: NaiveDate,
) -> NaiveDate {
    let base = publish_date.unwrap_or(today);
    base.checked_add_days(Days::new(u64::from(cycle_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// True when `post` is evergreen and its repurpose date has arrived.
#[must_use]
pub fn is_due_for_resurface(post: &Post, today: NaiveDate) -> bool {
    post.is_evergreen && post.repurpose_date.is_some_and(|date| date <= today)
}

/// Posts due for resurfacing, longest-waiting first.
pub fn resurface_queue<'a, I>(posts: I, today: NaiveDate) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut due: Vec<&Post> = posts
        .into_iter()
        .filter(|post| is_due_for_resurface(post, today))
        .collect();
    due.sort_by(|a, b| {
        a.repurpose_date
            .cmp(&b.repurpose_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    due
}

/// First cycle boundary (`publish_date + k * cycle_days`, k >= 1) strictly
/// after `today`. Used to roll a post forward once it has been resurfaced.
#[must_use]
pub fn next_cycle_date(publish_date: NaiveDate, cycle_days: u32, today: NaiveDate) -> NaiveDate {
    let step = i64::from(cycle_days.max(1));
    let elapsed = (today - publish_date).num_days();
    let cycles = if elapsed < 0 { 1 } else { elapsed / step + 1 };
    let offset = u64::try_from(cycles.saturating_mul(step)).unwrap_or(u64::MAX);
    publish_date
        .checked_add_days(Days::new(offset))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn evergreen(id: &str, repurpose: Option<NaiveDate>) -> Post {
        Post {
            id: id.to_string(),
            is_evergreen: true,
            repurpose_date: repurpose,
            ..Post::default()
        }
    }

    #[test]
    fn default_date_adds_cycle_to_publish_date() {
        let today = date(2024, 6, 1);
        assert_eq!(
            default_repurpose_date(Some(date(2024, 1, 1)), 90, today),
            date(2024, 3, 31)
        );
        assert_eq!(default_repurpose_date(None, 30, today), date(2024, 7, 1));
    }

    #[test]
    fn due_only_when_evergreen_and_date_reached() {
        let today = date(2024, 6, 1);
        assert!(is_due_for_resurface(&evergreen("a", Some(today)), today));
        assert!(is_due_for_resurface(
            &evergreen("b", Some(date(2024, 5, 1))),
            today
        ));
        assert!(!is_due_for_resurface(
            &evergreen("c", Some(date(2024, 6, 2))),
            today
        ));
        assert!(!is_due_for_resurface(&evergreen("d", None), today));

        let not_evergreen = Post {
            is_evergreen: false,
            ..evergreen("e", Some(date(2024, 1, 1)))
        };
        assert!(!is_due_for_resurface(&not_evergreen, today));
    }

    #[test]
    fn queue_lists_oldest_due_first() {
        let today = date(2024, 6, 1);
        let posts = [
            evergreen("late", Some(date(2024, 5, 20))),
            evergreen("future", Some(date(2024, 7, 1))),
            evergreen("oldest", Some(date(2024, 2, 1))),
        ];
        let queue: Vec<&str> = resurface_queue(&posts, today)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(queue, vec!["oldest", "late"]);
    }

    #[test]
    fn next_cycle_is_strictly_after_today() {
        let published = date(2024, 1, 1);
        assert_eq!(
            next_cycle_date(published, 30, date(2023, 12, 1)),
            date(2024, 1, 31)
        );
        assert_eq!(
            next_cycle_date(published, 30, date(2024, 1, 15)),
            date(2024, 1, 31)
        );
        assert_eq!(
            next_cycle_date(published, 30, date(2024, 1, 31)),
            date(2024, 3, 1)
        );
        assert!(next_cycle_date(published, 30, date(2024, 5, 5)) > date(2024, 5, 5));
    }
}
