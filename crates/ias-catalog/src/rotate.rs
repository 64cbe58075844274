use std::collections::HashSet;

use crate::model::{AdCandidate, AdSlot};

/// Per-slot rotation settings. `window` is how many *additional*
/// adverts beyond the first must be simultaneously distinct, e.g. a
/// backscreen showing four banners at once uses a window of 3.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub window: usize,
    /// When the pool cannot fill the window, wrap around and repeat
    /// instead of returning nothing.
    pub allow_duplicates: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self { window: 0, allow_duplicates: false }
    }
}

fn window_indices(slot: &AdSlot, allow_self: bool, needed: usize) -> Vec<usize> {
    let total = slot.candidates.len();
    if total == 0 {
        return Vec::new();
    }
    let start = slot.cursor + 1;

    let collect = |include_installed: bool| -> Vec<usize> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for step in 0..total {
            let idx = (start + step as i64).rem_euclid(total as i64) as usize;
            let c = &slot.candidates[idx];
            if !c.is_active || (c.is_self && !allow_self) {
                continue;
            }
            if c.is_installed && !include_installed {
                continue;
            }
            if seen.insert(c.package_name.as_str()) {
                out.push(idx);
            }
        }
        out
    };

    // Prefer adverts for apps the player does not have; re-admit
    // installed ones only when the window cannot be filled without them.
    let preferred = collect(false);
    if preferred.len() >= needed {
        preferred
    } else {
        collect(true)
    }
}

/// Ordered candidate indices forming the slot's visible rotation
/// window, starting just past the cursor.
pub fn selection_window(slot: &AdSlot, policy: &RotationPolicy) -> Vec<usize> {
    let allow_self = policy.window >= slot.candidates.len();
    window_indices(slot, allow_self, policy.window + 1)
}

/// Candidate to show at `offset` positions into the window. Offsets
/// past the pool of distinct adverts return `None` unless the policy
/// allows wrapping.
pub fn select_candidate<'a>(
    slot: &'a AdSlot,
    offset: usize,
    policy: &RotationPolicy,
) -> Option<&'a AdCandidate> {
    let allow_self = policy.window >= slot.candidates.len();
    let needed = if offset == 0 { 1 } else { policy.window + 1 };
    let window = window_indices(slot, allow_self, needed);
    if let Some(&idx) = window.get(offset) {
        return Some(&slot.candidates[idx]);
    }
    if policy.allow_duplicates && !window.is_empty() {
        return Some(&slot.candidates[window[offset % window.len()]]);
    }
    None
}

/// Records that the candidate with `letter` was actually displayed,
/// moving the cursor onto it. Committing the same letter twice is a
/// no-op, so a redraw of the same advert does not skip the rotation
/// ahead.
pub fn commit_shown(slot: &mut AdSlot, letter: char) {
    if let Some(idx) = slot.candidates.iter().position(|c| c.slot_letter == letter) {
        slot.cursor = idx as i64;
    }
}

/// Distinct active, non-self packages available to the slot. An offset
/// below this count is always satisfiable without duplicates.
pub fn unique_eligible_count(slot: &AdSlot) -> usize {
    slot.candidates
        .iter()
        .filter(|c| c.is_active && !c.is_self)
        .map(|c| c.package_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}
