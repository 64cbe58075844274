use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifies one advert position on the manifest, e.g. `1a` is letter
/// `a` of slot `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub number: u32,
    pub letter: char,
}

impl SlotId {
    pub fn new(number: u32, letter: char) -> Self {
        Self { number, letter }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.letter)
    }
}

/// One advert inside a slot. Transient display state is skipped by the
/// persistence codec and rebuilt after every load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdCandidate {
    pub slot_letter: char,
    pub ad_id: i64,
    pub package_name: String,
    pub ad_url: Url,
    pub image_url: Url,
    pub cache_file_name: String,
    pub is_self: bool,
    pub is_active: bool,
    pub is_installed: bool,
    /// Manifest timestamp the cached image was downloaded against.
    pub last_updated: i64,
    /// Manifest timestamp of the current entry; newer than
    /// `last_updated` means the image must be re-fetched.
    pub pending_update: i64,
    pub image_cached: bool,
    #[serde(skip)]
    pub image_ready: bool,
    #[serde(skip)]
    pub downloading: bool,
}

impl AdCandidate {
    pub fn needs_fetch(&self) -> bool {
        !self.image_cached || self.pending_update > self.last_updated
    }
}

/// All candidates sharing a slot number, plus the rotation cursor
/// (index of the candidate most recently shown).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSlot {
    pub number: u32,
    pub candidates: Vec<AdCandidate>,
    pub cursor: i64,
}

impl AdSlot {
    pub fn new(number: u32) -> Self {
        Self { number, candidates: Vec::new(), cursor: -1 }
    }

    pub fn candidate(&self, letter: char) -> Option<&AdCandidate> {
        self.candidates.iter().find(|c| c.slot_letter == letter)
    }

    pub fn candidate_mut(&mut self, letter: char) -> Option<&mut AdCandidate> {
        self.candidates.iter_mut().find(|c| c.slot_letter == letter)
    }

    pub fn needs_fetch(&self) -> bool {
        self.candidates.iter().any(|c| c.is_active && c.needs_fetch())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub slots: Vec<AdSlot>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, number: u32) -> Option<&AdSlot> {
        self.slots.iter().find(|s| s.number == number)
    }

    pub fn slot_mut(&mut self, number: u32) -> Option<&mut AdSlot> {
        self.slots.iter_mut().find(|s| s.number == number)
    }

    pub fn candidate(&self, id: SlotId) -> Option<&AdCandidate> {
        self.slot(id.number).and_then(|s| s.candidate(id.letter))
    }

    pub fn candidate_mut(&mut self, id: SlotId) -> Option<&mut AdCandidate> {
        self.slot_mut(id.number).and_then(|s| s.candidate_mut(id.letter))
    }

    /// File names every candidate currently claims in the image cache.
    /// Anything on disk outside this set is stale and may be removed.
    pub fn cache_file_names(&self) -> HashSet<String> {
        self.slots
            .iter()
            .flat_map(|s| s.candidates.iter())
            .map(|c| c.cache_file_name.clone())
            .collect()
    }

    /// Seeds every cursor with a random start so a fresh install does
    /// not always open on the same advert.
    pub fn randomize_cursors(&mut self) {
        let mut rng = rand::rng();
        for slot in &mut self.slots {
            let total = slot.candidates.len();
            if total > 0 {
                slot.cursor = rng.random_range(0..total as i64);
            }
        }
    }
}

/// Lowercased package names installed on the device, matched by
/// substring so store suffixes (`.amazon`, `.free`) still count.
#[derive(Debug, Clone, Default)]
pub struct InstalledSet {
    apps: Vec<String>,
}

impl InstalledSet {
    pub fn new<I, S>(apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            apps: apps
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, package: &str) -> bool {
        if package.is_empty() {
            return false;
        }
        let package = package.to_lowercase();
        self.apps.iter().any(|app| package.contains(app.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_displays_number_then_letter() {
        assert_eq!(SlotId::new(1, 'a').to_string(), "1a");
        assert_eq!(SlotId::new(12, 'c').to_string(), "12c");
    }

    #[test]
    fn installed_set_matches_substrings_case_insensitively() {
        let set = InstalledSet::new(["com.pickle.TowerDefense", "com.other.game"]);
        assert!(set.contains("com.pickle.towerdefense"));
        assert!(set.contains("com.pickle.towerdefense.amazon"));
        assert!(!set.contains("com.pickle.puzzle"));
        assert!(!set.contains(""));
    }
}
