use crate::config::{CODE_MAX, CODE_MIN};
use crate::entry::EntryAnchors;
use crate::routing::{CV_AM, CV_CUTOFF, CV_FM, CV_Q};
use crate::voice::{
    SeqHalf, Voice, ENTRY_AM, ENTRY_AMP, ENTRY_ATTACK, ENTRY_CUTOFF, ENTRY_FM, ENTRY_Q,
    OSCILLATORS, POT_COUNT,
};

use super::buttons::{ButtonLevels, Buttons, Gesture};
use super::{Page, ITEMS};

/// Whole-patch operation requested by a chord. Executed by the control plane,
/// which owns the random source and the flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    None,
    Randomize,
    Save,
    ShuffleSequence,
}

/// What a knob column edits on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColumnTarget {
    /// Frequency code of an oscillator.
    OscFreq(usize),
    /// A slot of the entry table.
    Entry(usize),
    /// A sequencer step code.
    Step(usize),
}

/// Page/item state machine.
///
/// Owns the button debounce state and the sequencer half being edited. None
/// of it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Navigator {
    page: Page,
    item: u8,
    half: SeqHalf,
    buttons: Buttons,
}

impl Navigator {
    /// Start on the splash page, item 0, editing half A.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn item(&self) -> u8 {
        self.item
    }

    /// Sequencer half the knobs edit on the sequence page.
    pub fn half(&self) -> SeqHalf {
        self.half
    }

    pub fn set_half(&mut self, half: SeqHalf) {
        self.half = half;
    }

    /// Jump to a page and item. `item` wraps modulo [`ITEMS`].
    pub fn jump_to(&mut self, page: Page, item: u8) {
        self.page = page;
        self.item = item % ITEMS;
    }

    // ── Buttons ──────────────────────────────────────────────────────

    /// Process one cycle of button levels.
    ///
    /// Single presses are applied immediately (page, item, or the item's
    /// action on `voice`). Chords are returned as a [`Command`] for the
    /// control plane to execute.
    pub fn handle_buttons(&mut self, levels: ButtonLevels, voice: &mut Voice) -> Command {
        match self.buttons.poll(levels) {
            Gesture::None => Command::None,
            Gesture::NextPage => {
                self.next_page();
                Command::None
            }
            Gesture::NextItem => {
                self.next_item();
                Command::None
            }
            Gesture::Action => {
                self.action(voice);
                Command::None
            }
            Gesture::Randomize => Command::Randomize,
            Gesture::Save => Command::Save,
            Gesture::ShuffleSequence => Command::ShuffleSequence,
        }
    }

    /// Button A: `page = (page + 1) mod 4`.
    pub fn next_page(&mut self) {
        self.page = self.page.next();
        #[cfg(feature = "defmt")]
        defmt::debug!("page -> {}", self.page.index());
    }

    /// Button B: `item = (item + 1) mod 6`.
    pub fn next_item(&mut self) {
        self.item = (self.item + 1) % ITEMS;
    }

    /// Button C: the current item's toggle or cycle.
    pub fn action(&mut self, voice: &mut Voice) {
        let item = self.item as usize;
        match self.page {
            Page::Splash => {}
            Page::Tune => voice.oscillators[item % OSCILLATORS].cycle_octave(),
            Page::Amp => {
                if item < OSCILLATORS {
                    let osc = &mut voice.oscillators[item];
                    osc.waveform = osc.waveform.next();
                } else {
                    let slot = &mut voice.cv[CV_AM + item - 3];
                    slot.source = slot.source.next();
                }
            }
            Page::Filter => match item {
                0 => voice.filter.kind = voice.filter.kind.next(),
                1 => voice.cv[CV_Q].source = voice.cv[CV_Q].source.next(),
                2 => voice.cv[CV_CUTOFF].source = voice.cv[CV_CUTOFF].source.next(),
                _ => {
                    let slot = &mut voice.cv[CV_FM + item - 3];
                    slot.source = slot.source.next();
                }
            },
            Page::Sequence => match item % 3 {
                0 => voice.sequencer.enabled = !voice.sequencer.enabled,
                1 => voice.envelope.enabled = !voice.envelope.enabled,
                _ => self.half = self.half.toggle(),
            },
        }
    }

    // ── Knobs ────────────────────────────────────────────────────────

    /// What knob column `column` edits on the current page, or `None` if the
    /// column is unbound there.
    pub fn column_target(&self, column: usize) -> Option<ColumnTarget> {
        if column >= POT_COUNT {
            return None;
        }
        match self.page {
            Page::Splash => None,
            Page::Tune => Some(if column < OSCILLATORS {
                ColumnTarget::OscFreq(column)
            } else {
                ColumnTarget::Entry(ENTRY_ATTACK + column - 3)
            }),
            Page::Amp => Some(if column < OSCILLATORS {
                ColumnTarget::Entry(ENTRY_AMP + column)
            } else {
                ColumnTarget::Entry(ENTRY_AM + column - 3)
            }),
            Page::Filter => match column {
                0 => None,
                1 => Some(ColumnTarget::Entry(ENTRY_Q)),
                2 => Some(ColumnTarget::Entry(ENTRY_CUTOFF)),
                _ => Some(ColumnTarget::Entry(ENTRY_FM + column - 3)),
            },
            Page::Sequence => Some(ColumnTarget::Step(self.half.offset() + column)),
        }
    }

    /// Apply the latest knob readings to whatever the current page binds.
    ///
    /// Each column's anchor is its index. A column that is unbound on a
    /// parameter page still has its anchor refreshed, so returning to a page
    /// where it is bound does not replay the travel. On the splash page
    /// nothing is read.
    pub fn route_knobs(&self, voice: &mut Voice, anchors: &mut EntryAnchors) {
        if self.page == Page::Splash {
            return;
        }

        for column in 0..POT_COUNT {
            let raw = voice.pots[column];
            let value = match self.column_target(column) {
                Some(ColumnTarget::OscFreq(osc)) => &mut voice.oscillators[osc].freq,
                Some(ColumnTarget::Entry(index)) => &mut voice.entries[index],
                Some(ColumnTarget::Step(step)) => &mut voice.sequencer.codes[step],
                None => {
                    anchors.set_anchor(column, raw);
                    continue;
                }
            };
            *value = anchors.normalize(raw, *value, column, CODE_MIN, CODE_MAX);
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
