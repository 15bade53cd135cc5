use crate::config::{CODE_MAX, CODE_MIN};
use crate::routing::{Routing, SignalBank, Source};

use super::parts::{CvSlot, Envelope, Filter, Oscillator, Sequencer};
use super::{
    normalized, PotReadings, CV_SLOTS, ENTRY_AMP, ENTRY_ATTACK, ENTRY_CV, ENTRY_RELEASE,
    ENTRY_SLOTS, ENTRY_TEMPO, ENVELOPE_SCALE, OSCILLATORS, POT_COUNT, SEQ_LENGTH_MAX,
    SEQ_LENGTH_MIN,
};

/// Complete live state of the voice.
///
/// Written only by the control plane. The DSP kernel reads it while rendering
/// and writes back only `outputs` and `sequencer.current`.
///
/// # Initialization
///
/// [`Voice::new()`] produces a playable mid-range patch: every entry at 2048,
/// AM/Q/cutoff driven by the envelope, FM driven by the sequencer. Derived
/// fields and routing are already consistent with the entry table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Voice {
    /// Raw knob codes; the source of truth for every derived level.
    pub entries: [u16; ENTRY_SLOTS],
    pub oscillators: [Oscillator; OSCILLATORS],
    pub cv: [CvSlot; CV_SLOTS],
    pub envelope: Envelope,
    pub sequencer: Sequencer,
    pub filter: Filter,
    /// Modulation wiring resolved from `cv`.
    pub routing: Routing,
    /// Latest raw knob readings, refreshed by the kernel.
    pub pots: PotReadings,
    /// Latest value of every modulation source, published by the kernel.
    pub outputs: SignalBank,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        let mut cv = [CvSlot::default(); CV_SLOTS];
        for slot in &mut cv[5..] {
            slot.source = Source::Sequencer;
        }

        let mut voice = Self {
            entries: [2048; ENTRY_SLOTS],
            oscillators: [Oscillator::default(); OSCILLATORS],
            cv,
            envelope: Envelope::default(),
            sequencer: Sequencer::default(),
            filter: Filter::default(),
            routing: Routing::default(),
            pots: [0; POT_COUNT],
            outputs: SignalBank::default(),
        };
        voice.derive();
        voice.resolve_routing();
        voice
    }

    // ── Derivation ───────────────────────────────────────────────────

    /// Recompute every derived value from the entry table, step codes and
    /// oscillator fields.
    ///
    /// Also re-clamps every raw value to its documented range, so state
    /// loaded from flash or produced by the randomizer can never carry an
    /// out-of-range code into the kernel.
    pub fn derive(&mut self) {
        for code in &mut self.entries {
            *code = (*code).clamp(CODE_MIN, CODE_MAX);
        }

        for (i, osc) in self.oscillators.iter_mut().enumerate() {
            osc.freq = osc.freq.clamp(CODE_MIN, CODE_MAX);
            osc.octave = osc.octave.min(Oscillator::OCTAVE_MAX);
            osc.amp = normalized(self.entries[ENTRY_AMP + i]);
        }

        for (i, slot) in self.cv.iter_mut().enumerate() {
            slot.amount = normalized(self.entries[ENTRY_CV + i]);
        }

        self.envelope.attack = self.entries[ENTRY_ATTACK] as u32 * ENVELOPE_SCALE;
        self.envelope.release = self.entries[ENTRY_RELEASE] as u32 * ENVELOPE_SCALE;

        let seq = &mut self.sequencer;
        seq.divisor = self.entries[ENTRY_TEMPO] / 32 + 1;
        seq.length = seq.length.clamp(SEQ_LENGTH_MIN, SEQ_LENGTH_MAX);
        for (code, note) in seq.codes.iter_mut().zip(seq.notes.iter_mut()) {
            *code = (*code).clamp(CODE_MIN, CODE_MAX);
            *note = normalized(*code);
        }
    }

    /// Rebind every modulation destination from the CV slot selectors.
    pub fn resolve_routing(&mut self) {
        self.routing = Routing::resolve(&self.cv);
    }

    // ── Display helpers ──────────────────────────────────────────────

    /// Normalized level of an entry, for bar-graph display.
    ///
    /// Returns `0.0` if `index` is out of bounds.
    pub fn entry_level(&self, index: usize) -> f32 {
        self.entries.get(index).copied().map_or(0.0, normalized)
    }

    /// Write a sequence of step levels (`0.0..=1.0`) as raw codes.
    pub fn set_pattern(&mut self, pattern: &[f32; super::SEQ_STEPS]) {
        for (code, level) in self.sequencer.codes.iter_mut().zip(pattern) {
            let scaled = (level.clamp(0.0, 1.0) * CODE_MAX as f32) as u16;
            *code = scaled.clamp(CODE_MIN, CODE_MAX);
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{ENTRY_CUTOFF, ENTRY_FM, ENTRY_Q, SEQ_STEPS};

    #[test]
    fn new_voice_is_consistent() {
        let v = Voice::new();
        assert!(v.entries.iter().all(|&c| (CODE_MIN..=CODE_MAX).contains(&c)));
        assert_eq!(v.routing, Routing::resolve(&v.cv));
        assert_eq!(v.cv[0].amount, 0.5);
        assert_eq!(v.routing.fm[0], Source::Sequencer);
        assert_eq!(v.routing.am[0], Source::Envelope);
    }

    #[test]
    fn derive_scales_entries() {
        let mut v = Voice::new();
        v.entries[ENTRY_ATTACK] = 100;
        v.entries[ENTRY_RELEASE] = 4096;
        v.entries[ENTRY_TEMPO] = 320;
        v.entries[ENTRY_AMP + 1] = 1024;
        v.entries[ENTRY_Q] = 4096;
        v.entries[ENTRY_CUTOFF] = 2048;
        v.entries[ENTRY_FM + 2] = 1024;
        v.derive();

        assert_eq!(v.envelope.attack, 3200);
        assert_eq!(v.envelope.release, 4096 * 32);
        assert_eq!(v.sequencer.divisor, 11);
        assert_eq!(v.oscillators[1].amp, 0.25);
        assert_eq!(v.cv[3].amount, 1.0);
        assert_eq!(v.cv[4].amount, 0.5);
        assert_eq!(v.cv[7].amount, 0.25);
    }

    #[test]
    fn derive_clamps_out_of_range_state() {
        let mut v = Voice::new();
        v.entries[0] = 0;
        v.entries[5] = 9000;
        v.oscillators[0].freq = 0;
        v.oscillators[2].octave = 7;
        v.sequencer.length = 40;
        v.sequencer.codes[3] = 0;
        v.derive();

        assert_eq!(v.entries[0], CODE_MIN);
        assert_eq!(v.entries[5], CODE_MAX);
        assert_eq!(v.oscillators[0].freq, CODE_MIN);
        assert_eq!(v.oscillators[2].octave, 2);
        assert_eq!(v.sequencer.length, SEQ_LENGTH_MAX);
        assert_eq!(v.sequencer.codes[3], CODE_MIN);
    }

    #[test]
    fn derive_updates_step_levels() {
        let mut v = Voice::new();
        v.sequencer.codes[7] = 1024;
        v.derive();
        assert_eq!(v.sequencer.notes[7], 0.25);
    }

    #[test]
    fn set_pattern_converts_levels_to_codes() {
        let mut v = Voice::new();
        let mut pattern = [0.5; SEQ_STEPS];
        pattern[0] = 0.0;
        pattern[1] = 1.0;
        pattern[2] = 2.0;
        v.set_pattern(&pattern);

        assert_eq!(v.sequencer.codes[0], CODE_MIN);
        assert_eq!(v.sequencer.codes[1], CODE_MAX);
        assert_eq!(v.sequencer.codes[2], CODE_MAX);
        assert_eq!(v.sequencer.codes[3], 2048);
    }

    #[test]
    fn entry_level_out_of_bounds_is_zero() {
        let v = Voice::new();
        assert_eq!(v.entry_level(ENTRY_SLOTS), 0.0);
        assert_eq!(v.entry_level(ENTRY_ATTACK), 0.5);
    }
}
