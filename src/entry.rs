//! Relative potentiometer entry.
//!
//! The three physical knobs edit different parameters on different pages, so
//! a knob's absolute position almost never matches the value it is bound to.
//! Instead of jumping the parameter to the knob, each edit applies only the
//! knob's movement since it was last read:
//!
//! ```text
//! new = clamp(current + (raw - anchor[slot]), min, max)
//! anchor[slot] = raw
//! ```
//!
//! Anchors are kept per editable column, not per parameter. A column's anchor
//! is refreshed every cycle whatever it is bound to, so switching pages never
//! turns accumulated knob travel into a jump.
//!
//! All anchors start at zero. The first read after boot therefore moves the
//! bound parameter by the knob's absolute position once.

/// Size of the anchor table.
pub const ANCHOR_SLOTS: usize = 18;

/// Last-seen raw reading per logical knob slot. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EntryAnchors {
    last_raw: [u16; ANCHOR_SLOTS],
}

impl Default for EntryAnchors {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryAnchors {
    pub const fn new() -> Self {
        Self {
            last_raw: [0; ANCHOR_SLOTS],
        }
    }

    /// Apply the movement of `raw` since the last reading of `slot` to
    /// `current`, clamped to `[min, max]`, and remember `raw`.
    ///
    /// An out-of-range `slot` returns `current` clamped and records nothing
    /// (logged via `defmt` when that feature is enabled). Bounds given in the
    /// wrong order are swapped.
    ///
    /// # Examples
    ///
    /// ```
    /// use ff_voice::EntryAnchors;
    ///
    /// let mut anchors = EntryAnchors::new();
    /// anchors.set_anchor(0, 1500);
    /// assert_eq!(anchors.normalize(1600, 2000, 0, 1, 4096), 2100);
    /// assert_eq!(anchors.anchor(0), Some(1600));
    /// ```
    pub fn normalize(&mut self, raw: u16, current: u16, slot: usize, min: u16, max: u16) -> u16 {
        let (min, max) = (min.min(max), min.max(max));
        let Some(anchor) = self.last_raw.get_mut(slot) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("normalize: slot {} out of bounds", slot);
            return current.clamp(min, max);
        };

        let moved = current as i32 + (raw as i32 - *anchor as i32);
        *anchor = raw;
        moved.clamp(min as i32, max as i32) as u16
    }

    /// Last raw reading recorded for `slot`, or `None` if out of bounds.
    pub fn anchor(&self, slot: usize) -> Option<u16> {
        self.last_raw.get(slot).copied()
    }

    /// Overwrite the anchor of `slot`. Out-of-range slots are ignored.
    pub fn set_anchor(&mut self, slot: usize, raw: u16) {
        if let Some(anchor) = self.last_raw.get_mut(slot) {
            *anchor = raw;
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_edit_from_anchor() {
        let mut a = EntryAnchors::new();
        a.set_anchor(0, 1500);
        assert_eq!(a.normalize(1600, 2000, 0, 1, 4096), 2100);
        assert_eq!(a.anchor(0), Some(1600));
    }

    #[test]
    fn consecutive_reads_apply_raw_difference() {
        let mut a = EntryAnchors::new();
        a.set_anchor(2, 1000);
        let v1 = a.normalize(1200, 500, 2, 1, 4096);
        let v2 = a.normalize(1150, v1, 2, 1, 4096);
        assert_eq!(v1, 700);
        assert_eq!(v2 as i32 - v1 as i32, 1150 - 1200);
        assert_eq!(v2, 650);
    }

    #[test]
    fn first_read_after_boot_jumps_by_absolute_position() {
        let mut a = EntryAnchors::new();
        assert_eq!(a.normalize(300, 100, 4, 1, 4096), 400);
    }

    #[test]
    fn result_clamped_to_max() {
        let mut a = EntryAnchors::new();
        assert_eq!(a.normalize(4000, 3000, 1, 1, 4096), 4096);
        // Anchor still tracks the knob so later movement is relative.
        assert_eq!(a.anchor(1), Some(4000));
    }

    #[test]
    fn result_clamped_to_min() {
        let mut a = EntryAnchors::new();
        a.set_anchor(3, 4000);
        assert_eq!(a.normalize(0, 10, 3, 1, 4096), 1);
    }

    #[test]
    fn unmoved_knob_leaves_value_unchanged() {
        let mut a = EntryAnchors::new();
        a.set_anchor(5, 777);
        assert_eq!(a.normalize(777, 1234, 5, 1, 4096), 1234);
    }

    #[test]
    fn slots_are_independent() {
        let mut a = EntryAnchors::new();
        a.set_anchor(0, 100);
        a.set_anchor(1, 900);
        assert_eq!(a.normalize(200, 1000, 0, 1, 4096), 1100);
        assert_eq!(a.normalize(200, 1000, 1, 1, 4096), 300);
    }

    #[test]
    fn out_of_range_slot_is_noop() {
        let mut a = EntryAnchors::new();
        assert_eq!(a.normalize(4000, 5000, ANCHOR_SLOTS, 1, 4096), 4096);
        assert_eq!(a.anchor(ANCHOR_SLOTS), None);
        assert_eq!(a, EntryAnchors::new());
    }

    #[test]
    fn swapped_bounds_are_reordered() {
        let mut a = EntryAnchors::new();
        a.set_anchor(0, 1000);
        assert_eq!(a.normalize(100, 2000, 0, 4096, 1), 1100);
        assert_eq!(a.normalize(4000, 4000, 0, 4096, 1), 4096);
        assert_eq!(a.normalize(0, 0, ANCHOR_SLOTS, 4096, 1), 1);
    }

    #[test]
    fn stays_in_bounds_over_a_sweep() {
        let mut a = EntryAnchors::new();
        let mut value = 2048;
        for raw in (0..4096u16).step_by(97).chain((0..4096u16).rev().step_by(131)) {
            value = a.normalize(raw, value, 0, 1, 4096);
            assert!((1..=4096).contains(&value));
        }
    }
}
