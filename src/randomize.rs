//! Patch randomization.
//!
//! [`randomize_patch`] replaces the whole patch in one control cycle: every
//! raw code, selector, waveform, octave, filter type and flag is redrawn
//! uniformly over its documented range, the sequencer gets a new pattern and
//! length, and the modulation wiring is re-resolved before returning so no
//! destination keeps pointing at a source chosen by the previous patch.
//!
//! The random source is one [`PatchRng`] per process, seeded once at boot
//! from ADC noise and never reseeded.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{CODE_MAX, CODE_MIN};
use crate::kernel::ControlKernel;
use crate::routing::{Source, CV_AM, CV_CUTOFF, CV_FM, CV_Q, SOURCE_COUNT};
use crate::ui::{Navigator, Page};
use crate::voice::{
    FilterType, SeqHalf, Voice, Waveform, ENTRY_AM, ENTRY_AMP, ENTRY_ATTACK, ENTRY_CUTOFF,
    ENTRY_FM, ENTRY_Q, ENTRY_RELEASE, ENTRY_TEMPO, OSCILLATORS, SEQ_LENGTH_MAX, SEQ_LENGTH_MIN,
    SEQ_STEPS,
};

/// Number of waveforms the randomizer picks from. Sample-and-hold is left
/// out; it is reachable only from the panel.
const RANDOM_WAVEFORMS: u8 = 5;

/// The process-wide pseudo-random source.
pub struct PatchRng {
    rng: SmallRng,
}

impl PatchRng {
    /// Seed from a noise reading (e.g. the ADC temperature channel).
    pub fn from_seed(seed: u64) -> Self {
        #[cfg(feature = "defmt")]
        defmt::info!("patch rng seeded with {=u64}", seed);
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[min, max]` (both inclusive).
    pub fn randint(&mut self, min: u16, max: u16) -> u16 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Uniform raw code in `[CODE_MIN, CODE_MAX]`.
    pub fn code(&mut self) -> u16 {
        self.randint(CODE_MIN, CODE_MAX)
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen()
    }

    /// Uniform level in `[0.0, 1.0)`.
    pub fn unit(&mut self) -> f32 {
        self.rng.gen()
    }

    fn source(&mut self) -> Source {
        Source::from_selector(self.randint(0, SOURCE_COUNT as u16 - 1) as u8)
    }
}

/// Replace the whole patch with a random one and return the panel to page 0,
/// item 0.
pub fn randomize_patch<K: ControlKernel>(
    voice: &mut Voice,
    nav: &mut Navigator,
    rng: &mut PatchRng,
    kernel: &mut K,
) {
    voice.sequencer.length = rng.randint(SEQ_LENGTH_MIN as u16, SEQ_LENGTH_MAX as u16) as u8;
    regenerate_pattern(voice, rng, kernel);

    for i in 0..OSCILLATORS {
        let osc = &mut voice.oscillators[i];
        osc.freq = rng.code();
        osc.octave = rng.randint(0, 2) as u8;
        osc.waveform = Waveform::from_index(rng.randint(0, RANDOM_WAVEFORMS as u16 - 1) as u8);

        voice.entries[ENTRY_AMP + i] = rng.code();
        voice.entries[ENTRY_FM + i] = rng.code();
        voice.entries[ENTRY_AM + i] = rng.code();

        voice.cv[CV_AM + i].source = rng.source();
        voice.cv[CV_FM + i].source = rng.source();
    }

    voice.entries[ENTRY_Q] = rng.code();
    voice.cv[CV_Q].source = rng.source();
    voice.entries[ENTRY_CUTOFF] = rng.code();
    voice.cv[CV_CUTOFF].source = rng.source();

    voice.entries[ENTRY_ATTACK] = rng.code();
    voice.entries[ENTRY_RELEASE] = rng.code();
    voice.entries[ENTRY_TEMPO] = rng.code();

    voice.filter.kind = FilterType::from_index(rng.randint(0, 4) as u8);

    voice.sequencer.enabled = rng.coin();
    voice.envelope.enabled = rng.coin();
    nav.set_half(if rng.coin() { SeqHalf::B } else { SeqHalf::A });

    voice.derive();
    voice.resolve_routing();

    nav.jump_to(Page::Tune, 0);

    #[cfg(feature = "defmt")]
    defmt::info!(
        "patch randomized: length={} feedback={}",
        voice.sequencer.length,
        voice.routing.has_feedback()
    );
}

/// Draw a new sequencer pattern only. Length, wiring and everything else
/// are untouched.
pub fn shuffle_sequence<K: ControlKernel>(voice: &mut Voice, rng: &mut PatchRng, kernel: &mut K) {
    regenerate_pattern(voice, rng, kernel);
    voice.derive();
}

fn regenerate_pattern<K: ControlKernel>(voice: &mut Voice, rng: &mut PatchRng, kernel: &mut K) {
    let mut pattern = [0.0; SEQ_STEPS];
    kernel.generate_pattern(rng, &mut pattern);
    voice.set_pattern(&pattern);
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Routing;
    use crate::voice::{CV_SLOTS, ENTRY_SLOTS};

    struct NullKernel;

    impl ControlKernel for NullKernel {
        fn refresh_parameters(&mut self, _voice: &mut Voice) {}
        fn tick_modulation_graph(&mut self, _voice: &mut Voice) {}
    }

    /// Kernel whose pattern generator writes a fixed ramp.
    struct RampKernel;

    impl ControlKernel for RampKernel {
        fn refresh_parameters(&mut self, _voice: &mut Voice) {}
        fn tick_modulation_graph(&mut self, _voice: &mut Voice) {}
        fn generate_pattern(&mut self, _rng: &mut PatchRng, steps: &mut [f32; SEQ_STEPS]) {
            for (i, s) in steps.iter_mut().enumerate() {
                *s = i as f32 / SEQ_STEPS as f32;
            }
        }
    }

    // ── PatchRng ─────────────────────────────────────────────────────

    #[test]
    fn randint_stays_in_range() {
        let mut rng = PatchRng::from_seed(7);
        for _ in 0..2000 {
            let v = rng.randint(2, 24);
            assert!((2..=24).contains(&v));
        }
    }

    #[test]
    fn randint_degenerate_range() {
        let mut rng = PatchRng::from_seed(7);
        assert_eq!(rng.randint(5, 5), 5);
        assert_eq!(rng.randint(9, 3), 9);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PatchRng::from_seed(1234);
        let mut b = PatchRng::from_seed(1234);
        for _ in 0..32 {
            assert_eq!(a.code(), b.code());
        }
    }

    // ── randomize_patch ──────────────────────────────────────────────

    #[test]
    fn randomized_patch_is_in_range_and_resolved() {
        for seed in 0..64 {
            let mut rng = PatchRng::from_seed(seed);
            let mut voice = Voice::new();
            let mut nav = Navigator::new();
            nav.jump_to(Page::Filter, 4);

            randomize_patch(&mut voice, &mut nav, &mut rng, &mut NullKernel);

            assert_eq!(nav.page(), Page::Tune);
            assert_eq!(nav.item(), 0);
            assert!((SEQ_LENGTH_MIN..=SEQ_LENGTH_MAX).contains(&voice.sequencer.length));
            for slot in 0..CV_SLOTS {
                assert!(voice.cv[slot].source.selector() <= 4);
            }
            for i in 0..ENTRY_SLOTS {
                assert!((CODE_MIN..=CODE_MAX).contains(&voice.entries[i]));
            }
            for osc in &voice.oscillators {
                assert!((CODE_MIN..=CODE_MAX).contains(&osc.freq));
                assert!(osc.octave <= 2);
                assert_ne!(osc.waveform, Waveform::SampleHold);
            }
            for code in &voice.sequencer.codes {
                assert!((CODE_MIN..=CODE_MAX).contains(code));
            }
            // No stale wiring.
            assert_eq!(voice.routing, Routing::resolve(&voice.cv));
            for slot in 0..CV_SLOTS {
                assert_eq!(voice.routing.source_for_slot(slot), Some(voice.cv[slot].source));
            }
        }
    }

    #[test]
    fn randomized_amounts_follow_entries() {
        let mut rng = PatchRng::from_seed(99);
        let mut voice = Voice::new();
        let mut nav = Navigator::new();
        randomize_patch(&mut voice, &mut nav, &mut rng, &mut NullKernel);
        for slot in 0..CV_SLOTS {
            let expected = voice.entries[crate::voice::ENTRY_CV + slot] as f32 / 4096.0;
            assert_eq!(voice.cv[slot].amount, expected);
        }
    }

    #[test]
    fn pattern_comes_from_kernel() {
        let mut rng = PatchRng::from_seed(3);
        let mut voice = Voice::new();
        let mut nav = Navigator::new();
        randomize_patch(&mut voice, &mut nav, &mut rng, &mut RampKernel);
        assert_eq!(voice.sequencer.codes[0], CODE_MIN);
        assert_eq!(voice.sequencer.codes[6], 2048);
    }

    #[test]
    fn shuffle_touches_only_the_pattern() {
        let mut rng = PatchRng::from_seed(5);
        let mut voice = Voice::new();
        let before = voice;
        shuffle_sequence(&mut voice, &mut rng, &mut RampKernel);

        assert_ne!(voice.sequencer.codes, before.sequencer.codes);
        assert_eq!(voice.sequencer.length, before.sequencer.length);
        assert_eq!(voice.entries, before.entries);
        assert_eq!(voice.cv, before.cv);
        assert_eq!(voice.routing, before.routing);
    }
}
