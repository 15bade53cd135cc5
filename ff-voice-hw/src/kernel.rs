//! Reference sample-rate kernel.
//!
//! Three phase-accumulator oscillators with AM/FM from the routed sources,
//! a Chamberlin state-variable filter, a step sequencer clocked from the
//! tempo divisor and an attack/release envelope retriggered on every step.
//! Every modulation source advances per sample and its latest value is
//! published in `voice.outputs` for the next block and the control core.

use ff_voice::routing::{Source, CV_AM, CV_CUTOFF, CV_FM, CV_Q};
use ff_voice::voice::{normalized, Envelope, FilterType, Oscillator, Waveform, OSCILLATORS, SEQ_STEPS};
use ff_voice::{AudioKernel, Voice};

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per tempo divisor unit.
const STEP_UNIT: u32 = 256;

/// Lowest oscillator frequency at octave 0, in Hz.
const BASE_HZ: f32 = 20.0;

/// Frequency span of the tune knob at octave 0, in Hz.
const SPAN_HZ: f32 = 980.0;

/// Headroom applied to the three-oscillator mix.
const MIX_GAIN: f32 = 0.8 / OSCILLATORS as f32;

// ── Envelope ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct AttackRelease {
    level: f32,
    attacking: bool,
}

impl AttackRelease {
    fn trigger(&mut self) {
        self.attacking = true;
    }

    fn next(&mut self, envelope: &Envelope) -> f32 {
        if self.attacking {
            self.level += 1.0 / envelope.attack.max(1) as f32;
            if self.level >= 1.0 {
                self.level = 1.0;
                self.attacking = false;
            }
        } else {
            self.level = (self.level - 1.0 / envelope.release.max(1) as f32).max(0.0);
        }
        self.level
    }
}

// ── Filter ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct StateVariable {
    low: f32,
    band: f32,
}

impl StateVariable {
    /// `cutoff` and `resonance` are both `0.0..=1.0`.
    fn process(&mut self, kind: FilterType, input: f32, cutoff: f32, resonance: f32) -> f32 {
        // Coefficient kept below 1 so the loop stays stable at full resonance.
        let f = cutoff.clamp(0.005, 1.0) * 0.9;
        let damp = (2.0 - 1.9 * resonance.clamp(0.0, 1.0)).max(0.1);

        self.low += f * self.band;
        let high = input - self.low - damp * self.band;
        self.band += f * high;

        match kind {
            FilterType::LowPass => self.low,
            FilterType::BandPass => self.band,
            FilterType::Notch => high + self.low,
            FilterType::Peak => self.low - high,
            FilterType::HighPass => high,
        }
    }
}

// ── Kernel ───────────────────────────────────────────────────────────────

/// The audio half of the DSP kernel.
pub struct BasicKernel {
    phase: [f32; OSCILLATORS],
    held: [f32; OSCILLATORS],
    noise: u32,
    clock: u32,
    envelope: AttackRelease,
    filter: StateVariable,
}

impl BasicKernel {
    pub fn new(noise_seed: u32) -> Self {
        let mut envelope = AttackRelease::default();
        envelope.trigger();
        Self {
            phase: [0.0; OSCILLATORS],
            held: [0.0; OSCILLATORS],
            // xorshift state must never be zero
            noise: noise_seed | 1,
            clock: 0,
            envelope,
            filter: StateVariable::default(),
        }
    }

    /// Uniform noise in `-1.0..1.0`.
    fn noise(&mut self) -> f32 {
        let mut x = self.noise;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise = x;
        (x >> 8) as f32 / (1u32 << 23) as f32 - 1.0
    }

    /// Count one sample on the sequencer clock; step and retrigger on expiry.
    fn clock_sequencer(&mut self, voice: &mut Voice) {
        self.clock += 1;
        if self.clock < u32::from(voice.sequencer.divisor.max(1)) * STEP_UNIT {
            return;
        }
        self.clock = 0;
        if voice.sequencer.enabled {
            let length = voice.sequencer.length.max(1);
            voice.sequencer.current = (voice.sequencer.current + 1) % length;
        }
        self.envelope.trigger();
    }

    /// Advance oscillator `index` by one sample and return its waveform value.
    fn oscillate(&mut self, index: usize, osc: &Oscillator, fm: f32) -> f32 {
        let nyquist = (SAMPLE_RATE / 2) as f32;
        let hz = (BASE_HZ + normalized(osc.freq) * SPAN_HZ)
            * f32::from(1u8 << osc.octave.min(Oscillator::OCTAVE_MAX))
            * (1.0 + fm);
        let step = hz.clamp(0.0, nyquist) / SAMPLE_RATE as f32;

        let mut phase = self.phase[index] + step;
        let wrapped = phase >= 1.0;
        if wrapped {
            phase -= 1.0;
        }
        self.phase[index] = phase;

        match osc.waveform {
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Ramp => 2.0 * phase - 1.0,
            Waveform::Saw => 1.0 - 2.0 * phase,
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Noise => self.noise(),
            Waveform::SampleHold => {
                if wrapped {
                    self.held[index] = self.noise();
                }
                self.held[index]
            }
        }
    }
}

impl AudioKernel for BasicKernel {
    fn fill_block(&mut self, voice: &mut Voice, block: &mut [i16]) {
        let routing = voice.routing;
        let cv = voice.cv;

        for sample in block.iter_mut() {
            self.clock_sequencer(voice);
            let step = voice.sequencer.current as usize % SEQ_STEPS;
            let env = self.envelope.next(&voice.envelope);
            voice.outputs.write(Source::Sequencer, voice.sequencer.notes[step]);
            voice.outputs.write(Source::Envelope, env);

            let mut mix = 0.0;
            for i in 0..OSCILLATORS {
                let osc = voice.oscillators[i];
                let fm = voice.outputs.read(routing.fm[i]) * cv[CV_FM + i].amount;
                let am = voice.outputs.read(routing.am[i]);
                let am_gain = 1.0 - cv[CV_AM + i].amount * (0.5 - 0.5 * am);

                let wave = self.oscillate(i, &osc, fm);
                voice.outputs.write(Source::ALL[i], wave);
                mix += wave * osc.amp * am_gain;
            }

            let cutoff = cv[CV_CUTOFF].amount * (0.5 + 0.5 * voice.outputs.read(routing.cutoff));
            let resonance = cv[CV_Q].amount * (0.5 + 0.5 * voice.outputs.read(routing.q));
            let mut out = self.filter.process(voice.filter.kind, mix * MIX_GAIN, cutoff, resonance);
            if voice.envelope.enabled {
                out *= env;
            }

            *sample = (out.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        }
    }
}
