//! Modulation routing.
//!
//! Every modulation destination (oscillator AM, oscillator FM, filter Q,
//! filter cutoff) reads from one of five live signals. Which one is chosen by
//! the source selector of its CV slot:
//!
//! ```text
//! CV slot   destination        selector -> Source
//! 0..=2     osc[slot].am       0 OscA  1 OscB  2 OscC
//! 3         filter.q           3 Sequencer
//! 4         filter.cutoff      4 Envelope
//! 5..=7     osc[slot-5].fm
//! ```
//!
//! A binding is a [`Source`] tag, never a reference into the signal storage.
//! The kernel looks the value up in the [`SignalBank`] at evaluation time, so
//! a loop (an oscillator modulated by itself, directly or through another
//! oscillator) is just data here. [`Routing::feedback_loops`] reports such
//! loops without changing anything.

use crate::voice::{CvSlot, CV_SLOTS, OSCILLATORS};

/// Number of live signals that can drive a modulation destination.
pub const SOURCE_COUNT: usize = 5;

/// CV slot feeding the filter resonance.
pub const CV_Q: usize = 3;
/// CV slot feeding the filter cutoff.
pub const CV_CUTOFF: usize = 4;
/// First CV slot of the oscillator AM group.
pub const CV_AM: usize = 0;
/// First CV slot of the oscillator FM group.
pub const CV_FM: usize = 5;

/// A live signal usable as a modulation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    #[default]
    OscA,
    OscB,
    OscC,
    Sequencer,
    Envelope,
}

impl Source {
    /// All sources in selector order.
    pub const ALL: [Source; SOURCE_COUNT] = [
        Source::OscA,
        Source::OscB,
        Source::OscC,
        Source::Sequencer,
        Source::Envelope,
    ];

    /// Three-letter display labels, indexed by selector.
    pub const LABELS: [&'static str; SOURCE_COUNT] = ["SCA", "SCB", "SCC", "SEQ", "ENV"];

    /// Map a selector to its source. Out-of-range selectors wrap, so a
    /// selector can never name a signal that does not exist.
    pub fn from_selector(selector: u8) -> Self {
        Self::ALL[selector as usize % SOURCE_COUNT]
    }

    /// The selector value (0–4) for this source.
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Index into [`SignalBank`] storage.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next source in selector order, wrapping after `Envelope`.
    pub fn next(self) -> Self {
        Self::from_selector(self.selector() + 1)
    }

    /// The oscillator index if this source is an oscillator output.
    pub fn oscillator(self) -> Option<usize> {
        match self {
            Source::OscA => Some(0),
            Source::OscB => Some(1),
            Source::OscC => Some(2),
            Source::Sequencer | Source::Envelope => None,
        }
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self.index()]
    }
}

/// Latest value of every modulation source.
///
/// Written only by the DSP kernel; the control core reads it for display and
/// the kernel reads it through [`Routing`] bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalBank {
    values: [f32; SOURCE_COUNT],
}

impl SignalBank {
    pub fn read(&self, source: Source) -> f32 {
        self.values[source.index()]
    }

    pub fn write(&mut self, source: Source, value: f32) {
        self.values[source.index()] = value;
    }
}

/// Resolved modulation wiring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Routing {
    /// Amplitude modulation source per oscillator.
    pub am: [Source; OSCILLATORS],
    /// Frequency modulation source per oscillator.
    pub fm: [Source; OSCILLATORS],
    /// Filter resonance modulation source.
    pub q: Source,
    /// Filter cutoff modulation source.
    pub cutoff: Source,
}

impl Routing {
    /// Rebind every destination from the CV slot selectors.
    ///
    /// Pure and idempotent: the result depends only on `cv`, so calling it
    /// every control cycle is safe whether or not anything changed.
    pub fn resolve(cv: &[CvSlot; CV_SLOTS]) -> Self {
        Self {
            am: core::array::from_fn(|i| cv[CV_AM + i].source),
            fm: core::array::from_fn(|i| cv[CV_FM + i].source),
            q: cv[CV_Q].source,
            cutoff: cv[CV_CUTOFF].source,
        }
    }

    /// Source bound to the destination fed by CV slot `slot`.
    ///
    /// Returns `None` if `slot >= CV_SLOTS`.
    pub fn source_for_slot(&self, slot: usize) -> Option<Source> {
        match slot {
            0..=2 => Some(self.am[slot - CV_AM]),
            CV_Q => Some(self.q),
            CV_CUTOFF => Some(self.cutoff),
            5..=7 => Some(self.fm[slot - CV_FM]),
            _ => None,
        }
    }

    /// Report which oscillators sit on a modulation loop.
    ///
    /// Oscillator `i` has an edge to oscillator `j` when its AM or FM is
    /// bound to `j`'s output. Entry `i` of the result is `true` when `i` can
    /// reach itself. The sequencer and envelope take no modulation inputs,
    /// so they never close a loop.
    pub fn feedback_loops(&self) -> [bool; OSCILLATORS] {
        // reach[i][j]: j reachable from i in one or more steps
        let mut reach = [[false; OSCILLATORS]; OSCILLATORS];
        for (i, row) in reach.iter_mut().enumerate() {
            for source in [self.am[i], self.fm[i]] {
                if let Some(j) = source.oscillator() {
                    row[j] = true;
                }
            }
        }

        // Warshall's transitive closure; three nodes.
        for k in 0..OSCILLATORS {
            for i in 0..OSCILLATORS {
                if reach[i][k] {
                    for j in 0..OSCILLATORS {
                        if reach[k][j] {
                            reach[i][j] = true;
                        }
                    }
                }
            }
        }

        core::array::from_fn(|i| reach[i][i])
    }

    /// `true` if any oscillator sits on a modulation loop.
    pub fn has_feedback(&self) -> bool {
        self.feedback_loops().iter().any(|&looped| looped)
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(selectors: [u8; CV_SLOTS]) -> [CvSlot; CV_SLOTS] {
        core::array::from_fn(|i| CvSlot {
            source: Source::from_selector(selectors[i]),
            amount: 0.5,
        })
    }

    // ── Source ───────────────────────────────────────────────────────

    #[test]
    fn selector_round_trip() {
        for (sel, source) in Source::ALL.iter().enumerate() {
            assert_eq!(Source::from_selector(sel as u8), *source);
            assert_eq!(source.selector(), sel as u8);
        }
    }

    #[test]
    fn out_of_range_selector_wraps() {
        assert_eq!(Source::from_selector(5), Source::OscA);
        assert_eq!(Source::from_selector(9), Source::Envelope);
    }

    #[test]
    fn next_cycles_through_five_sources() {
        let mut s = Source::OscA;
        for _ in 0..SOURCE_COUNT {
            s = s.next();
        }
        assert_eq!(s, Source::OscA);
        assert_eq!(Source::Envelope.next(), Source::OscA);
    }

    // ── resolve ──────────────────────────────────────────────────────

    #[test]
    fn resolve_binds_every_slot_to_its_selector() {
        let cv = slots([0, 1, 2, 3, 4, 4, 3, 2]);
        let routing = Routing::resolve(&cv);
        for slot in 0..CV_SLOTS {
            assert_eq!(routing.source_for_slot(slot), Some(cv[slot].source));
        }
    }

    #[test]
    fn sequencer_selector_binds_osc_a_am_to_sequencer() {
        let cv = slots([3, 0, 0, 0, 0, 0, 0, 0]);
        let routing = Routing::resolve(&cv);
        assert_eq!(routing.am[0], Source::Sequencer);
        assert!(routing.am[0].oscillator().is_none());
    }

    #[test]
    fn resolve_is_idempotent() {
        let cv = slots([4, 2, 0, 1, 3, 2, 2, 1]);
        let first = Routing::resolve(&cv);
        let second = Routing::resolve(&cv);
        assert_eq!(first, second);
    }

    #[test]
    fn source_for_slot_out_of_range() {
        let routing = Routing::default();
        assert!(routing.source_for_slot(CV_SLOTS).is_none());
    }

    #[test]
    fn signal_bank_reads_back_by_source() {
        let mut bank = SignalBank::default();
        bank.write(Source::Envelope, 0.25);
        bank.write(Source::OscB, -1.0);
        assert_eq!(bank.read(Source::Envelope), 0.25);
        assert_eq!(bank.read(Source::OscB), -1.0);
        assert_eq!(bank.read(Source::OscA), 0.0);
    }

    // ── feedback diagnostic ──────────────────────────────────────────

    #[test]
    fn no_loops_when_driven_by_sequencer_and_envelope() {
        let routing = Routing::resolve(&slots([3, 4, 3, 0, 0, 4, 3, 4]));
        assert_eq!(routing.feedback_loops(), [false; 3]);
        assert!(!routing.has_feedback());
    }

    #[test]
    fn self_modulation_is_a_loop() {
        // osc B AM <- osc B
        let routing = Routing::resolve(&slots([3, 1, 3, 0, 0, 3, 3, 3]));
        assert_eq!(routing.feedback_loops(), [false, true, false]);
    }

    #[test]
    fn mutual_modulation_through_am_and_fm() {
        // osc A AM <- osc C, osc C FM <- osc A
        let routing = Routing::resolve(&slots([2, 3, 3, 0, 0, 4, 4, 0]));
        assert_eq!(routing.feedback_loops(), [true, false, true]);
    }

    #[test]
    fn chain_without_return_edge_is_not_a_loop() {
        // A <- B <- C, C <- sequencer
        let routing = Routing::resolve(&slots([1, 2, 3, 0, 0, 3, 3, 3]));
        assert!(!routing.has_feedback());
    }
}
