use serde::{Deserialize, Serialize};

/// Default name prefix marking the reserved administrative pillar.
pub const DEFAULT_ADMIN_MARKER: &str = "[Admin]";

/// A strategic content category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Pillar {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: default_color(),
            active: true,
        }
    }
}

/// Ordered pillar configuration.
///
/// Index 0 is conventionally the administrative pillar; what actually makes a
/// pillar administrative is its name starting with `admin_marker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillarSet {
    pillars: Vec<Pillar>,
    admin_marker: String,
}

impl PillarSet {
    #[must_use]
    pub fn new(pillars: Vec<Pillar>, admin_marker: &str) -> Self {
        Self {
            pillars,
            admin_marker: admin_marker.to_string(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Pillar> {
        self.pillars.iter().find(|pillar| pillar.id == id)
    }

    #[must_use]
    pub fn is_administrative(&self, pillar: &Pillar) -> bool {
        !self.admin_marker.is_empty() && pillar.name.starts_with(&self.admin_marker)
    }

    /// The reserved pillar, if the configuration has one.
    #[must_use]
    pub fn administrative(&self) -> Option<&Pillar> {
        self.pillars
            .iter()
            .find(|pillar| self.is_administrative(pillar))
    }

    /// Pillars a user may assign to a scheduled or published post.
    pub fn assignable(&self) -> impl Iterator<Item = &Pillar> {
        self.pillars
            .iter()
            .filter(|pillar| pillar.active && !self.is_administrative(pillar))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pillar> {
        self.pillars.iter()
    }

    #[must_use]
    pub fn admin_marker(&self) -> &str {
        &self.admin_marker
    }
}

fn default_color() -> String {
    "#64748b".to_string()
}

const fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_ADMIN_MARKER, Pillar, PillarSet};

    fn pillars() -> PillarSet {
        let mut retired = Pillar::new("retired", "Retired Series");
        retired.active = false;
        PillarSet::new(
            vec![
                Pillar::new("ops", "[Admin] Operations"),
                Pillar::new("edu", "Education"),
                retired,
            ],
            DEFAULT_ADMIN_MARKER,
        )
    }

    #[test]
    fn administrative_pillar_is_found_by_marker() {
        let set = pillars();
        assert_eq!(set.administrative().map(|p| p.id.as_str()), Some("ops"));
        let edu = set.get("edu").expect("edu pillar");
        assert!(!set.is_administrative(edu));
    }

    #[test]
    fn assignable_skips_admin_and_inactive() {
        let set = pillars();
        let ids: Vec<&str> = set.assignable().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["edu"]);
    }

    #[test]
    fn empty_marker_never_matches() {
        let set = PillarSet::new(vec![Pillar::new("ops", "[Admin] Operations")], "");
        assert!(set.administrative().is_none());
    }
}
