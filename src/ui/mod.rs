//! Page/item navigation driven by three buttons and six knob columns.
//!
//! # Architecture
//!
//! The panel is organized into four **pages** of six **items** each. Button A
//! steps the page, button B steps the item, button C performs the item's
//! action (cycle an octave, waveform, CV source or filter type, or toggle a
//! sequencer flag). The knob columns edit whatever the current page binds to
//! them:
//!
//! ```text
//! Page 0 TUNE/ENV:   [Freq A] [Freq B] [Freq C]  [Attack] [Release] [Tempo]
//! Page 1 AMP/AM:     [Amp A]  [Amp B]  [Amp C]   [AM A]   [AM B]    [AM C]
//! Page 2 VCF/FM:     [------] [Q]      [Cutoff]  [FM A]   [FM B]    [FM C]
//! Page 3 SEQ:        [Step 1..6 of the selected half]
//! ```
//!
//! Before the first A press the panel shows a splash page (index `-1`) and
//! the knobs are not routed.
//!
//! Chords (two buttons down, at least one freshly pressed) trigger whole-patch
//! operations; see [`Gesture`].

mod buttons;
mod navigator;
mod view;

pub use buttons::{Button, ButtonLevels, ButtonState, Buttons, Gesture};
pub use navigator::{ColumnTarget, Command, Navigator};
pub use view::{Row, Screen};

/// Number of navigable pages (the splash page is not counted).
pub const PAGES: usize = 4;

/// Number of items per page.
pub const ITEMS: u8 = 6;

/// A UI page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Page {
    /// Boot screen, index `-1`.
    #[default]
    Splash,
    /// Oscillator pitch and envelope, index 0.
    Tune,
    /// Oscillator amplitude and AM, index 1.
    Amp,
    /// Filter and FM, index 2.
    Filter,
    /// Step sequencer, index 3.
    Sequence,
}

impl Page {
    /// Page index as shown to the display: `-1` for splash, then `0..=3`.
    pub fn index(self) -> i8 {
        match self {
            Page::Splash => -1,
            Page::Tune => 0,
            Page::Amp => 1,
            Page::Filter => 2,
            Page::Sequence => 3,
        }
    }

    /// Page for an index. Any negative index is the splash page; indices
    /// past the last page wrap.
    pub fn from_index(index: i8) -> Self {
        if index < 0 {
            return Page::Splash;
        }
        match index as usize % PAGES {
            0 => Page::Tune,
            1 => Page::Amp,
            2 => Page::Filter,
            _ => Page::Sequence,
        }
    }

    /// `(page + 1) mod 4`; the splash page advances to page 0.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Header labels of the upper and lower half of a parameter page.
    pub fn headings(self) -> [&'static str; 2] {
        match self {
            Page::Tune => ["TUNE", "ENVELOPE"],
            Page::Amp => ["AMP", "AM"],
            Page::Filter => ["VCF", "FM"],
            Page::Sequence => ["SEQ", ""],
            Page::Splash => ["", ""],
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splash_advances_to_first_page() {
        assert_eq!(Page::Splash.next(), Page::Tune);
    }

    #[test]
    fn pages_wrap_after_sequence() {
        assert_eq!(Page::Sequence.next(), Page::Tune);
        assert_eq!(Page::Tune.next().next().next().next(), Page::Tune);
    }

    #[test]
    fn index_round_trip() {
        for page in [Page::Splash, Page::Tune, Page::Amp, Page::Filter, Page::Sequence] {
            assert_eq!(Page::from_index(page.index()), page);
        }
        assert_eq!(Page::from_index(-7), Page::Splash);
        assert_eq!(Page::from_index(6), Page::Filter);
    }
}
