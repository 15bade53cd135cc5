//! Display snapshot handed to the display collaborator.
//!
//! [`Screen`] is plain data: page/item tagged labels and normalized `0..=1`
//! levels for the bar graphs. How it is drawn is up to the display side.
//! Two snapshots compare equal exactly when the rendered frame would be the
//! same, so the display can skip redundant flushes.

use crate::routing::CV_FM;
use crate::voice::{
    normalized, SeqHalf, Voice, ENTRY_AM, ENTRY_AMP, ENTRY_ATTACK, ENTRY_CUTOFF, ENTRY_FM,
    ENTRY_Q, OSCILLATORS, SEQ_STEPS,
};

use super::{Navigator, Page};

/// Labels of the fixed envelope rows on the tune page.
const ENVELOPE_LABELS: [&str; 3] = ["ATK", "RLS", "BPM"];

/// One labelled parameter line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Row {
    pub label: &'static str,
    /// Bar level `0.0..=1.0`; `None` draws no bar.
    pub level: Option<f32>,
    /// Drawn highlighted when the row is the selected item.
    pub selected: bool,
}

/// Everything the display needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Boot splash (page `-1`).
    Splash,
    /// Shown while a preset is being written; the panel is frozen.
    Saving,
    /// Pages 0–2: two headed groups of three rows.
    Params {
        page: Page,
        item: u8,
        headings: [&'static str; 2],
        rows: [Row; 6],
    },
    /// Page 3.
    Sequence {
        item: u8,
        levels: [f32; SEQ_STEPS],
        /// Step currently playing.
        current: u8,
        half: SeqHalf,
        seq_on: bool,
        env_on: bool,
    },
}

impl Screen {
    /// Snapshot the current page.
    pub fn build(nav: &Navigator, voice: &Voice) -> Self {
        let item = nav.item();
        let page = nav.page();
        let row = |index: usize, label: &'static str, level: Option<f32>, selected: bool| Row {
            label,
            level,
            selected: selected && index == item as usize,
        };

        match page {
            Page::Splash => Screen::Splash,
            Page::Tune => Screen::Params {
                page,
                item,
                headings: page.headings(),
                rows: core::array::from_fn(|i| {
                    if i < OSCILLATORS {
                        let osc = &voice.oscillators[i];
                        Row {
                            label: osc.octave_label(),
                            level: Some(normalized(osc.freq)),
                            selected: i == (item as usize) % OSCILLATORS,
                        }
                    } else {
                        row(
                            i,
                            ENVELOPE_LABELS[i - 3],
                            Some(voice.entry_level(ENTRY_ATTACK + i - 3)),
                            false,
                        )
                    }
                }),
            },
            Page::Amp => Screen::Params {
                page,
                item,
                headings: page.headings(),
                rows: core::array::from_fn(|i| {
                    if i < OSCILLATORS {
                        row(
                            i,
                            voice.oscillators[i].waveform.label(),
                            Some(voice.entry_level(ENTRY_AMP + i)),
                            true,
                        )
                    } else {
                        row(
                            i,
                            voice.cv[i - 3].source.label(),
                            Some(voice.entry_level(ENTRY_AM + i - 3)),
                            true,
                        )
                    }
                }),
            },
            Page::Filter => Screen::Params {
                page,
                item,
                headings: page.headings(),
                rows: core::array::from_fn(|i| match i {
                    0 => row(i, voice.filter.kind.label(), None, true),
                    1 => row(i, voice.cv[3].source.label(), Some(voice.entry_level(ENTRY_Q)), true),
                    2 => row(
                        i,
                        voice.cv[4].source.label(),
                        Some(voice.entry_level(ENTRY_CUTOFF)),
                        true,
                    ),
                    _ => row(
                        i,
                        voice.cv[CV_FM + i - 3].source.label(),
                        Some(voice.entry_level(ENTRY_FM + i - 3)),
                        true,
                    ),
                }),
            },
            Page::Sequence => Screen::Sequence {
                item,
                levels: voice.sequencer.notes,
                current: voice.sequencer.current,
                half: nav.half(),
                seq_on: voice.sequencer.enabled,
                env_on: voice.envelope.enabled,
            },
        }
    }

    /// Page index this screen belongs to (`-1` for splash and saving).
    pub fn page_index(&self) -> i8 {
        match self {
            Screen::Splash | Screen::Saving => -1,
            Screen::Params { page, .. } => page.index(),
            Screen::Sequence { .. } => Page::Sequence.index(),
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Source;

    fn nav_at(page: Page, item: u8) -> Navigator {
        let mut nav = Navigator::new();
        nav.jump_to(page, item);
        nav
    }

    #[test]
    fn splash_screen() {
        assert_eq!(Screen::build(&Navigator::new(), &Voice::new()), Screen::Splash);
    }

    #[test]
    fn tune_screen_highlights_item_mod_3() {
        let voice = Voice::new();
        let Screen::Params { rows, headings, .. } = Screen::build(&nav_at(Page::Tune, 4), &voice)
        else {
            panic!("expected a parameter page");
        };
        assert_eq!(headings, ["TUNE", "ENVELOPE"]);
        assert!(rows[1].selected);
        assert!(!rows[4].selected);
        assert_eq!(rows[3].label, "ATK");
        assert_eq!(rows[0].level, Some(0.5));
    }

    #[test]
    fn amp_screen_shows_waveforms_and_sources() {
        let mut voice = Voice::new();
        voice.cv[1].source = Source::OscC;
        let Screen::Params { rows, .. } = Screen::build(&nav_at(Page::Amp, 4), &voice) else {
            panic!("expected a parameter page");
        };
        assert_eq!(rows[0].label, "SQR");
        assert_eq!(rows[4].label, "SCC");
        assert!(rows[4].selected);
        assert_eq!(rows.iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn filter_screen_has_no_bar_for_type() {
        let voice = Voice::new();
        let Screen::Params { rows, .. } = Screen::build(&nav_at(Page::Filter, 0), &voice) else {
            panic!("expected a parameter page");
        };
        assert_eq!(rows[0].label, "LPF");
        assert_eq!(rows[0].level, None);
        assert!(rows[0].selected);
        assert_eq!(rows[5].label, "SEQ");
    }

    #[test]
    fn sequence_screen_reports_half_and_flags() {
        let mut voice = Voice::new();
        voice.sequencer.current = 7;
        voice.envelope.enabled = false;
        let mut nav = nav_at(Page::Sequence, 2);
        nav.set_half(SeqHalf::B);
        match Screen::build(&nav, &voice) {
            Screen::Sequence { current, half, seq_on, env_on, .. } => {
                assert_eq!(current, 7);
                assert_eq!(half, SeqHalf::B);
                assert!(seq_on);
                assert!(!env_on);
            }
            other => panic!("unexpected screen {:?}", other),
        }
    }

    #[test]
    fn identical_state_gives_identical_screens() {
        let voice = Voice::new();
        let nav = nav_at(Page::Amp, 1);
        assert_eq!(Screen::build(&nav, &voice), Screen::build(&nav, &voice));
        assert_eq!(Screen::build(&nav, &voice).page_index(), 1);
    }
}
