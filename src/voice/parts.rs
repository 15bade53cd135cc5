use crate::routing::Source;

use super::{HALF_STEPS, SEQ_STEPS};

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Waveform {
    #[default]
    Square,
    Ramp,
    Saw,
    Triangle,
    Noise,
    SampleHold,
}

impl Waveform {
    pub const ALL: [Waveform; 6] = [
        Waveform::Square,
        Waveform::Ramp,
        Waveform::Saw,
        Waveform::Triangle,
        Waveform::Noise,
        Waveform::SampleHold,
    ];

    pub const LABELS: [&'static str; 6] = ["SQR", "RMP", "SAW", "TRI", "NSE", "SNH"];

    /// Waveform for a stored index; out-of-range values wrap.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[index as usize % Self::ALL.len()]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Next waveform, wrapping after sample-and-hold.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterType {
    #[default]
    LowPass,
    BandPass,
    Notch,
    Peak,
    HighPass,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::LowPass,
        FilterType::BandPass,
        FilterType::Notch,
        FilterType::Peak,
        FilterType::HighPass,
    ];

    pub const LABELS: [&'static str; 5] = ["LPF", "BPF", "NCH", "PCK", "HPF"];

    /// Filter type for a stored index; out-of-range values wrap.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[index as usize % Self::ALL.len()]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Next filter type, wrapping after high-pass.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

/// One oscillator's control-side parameters.
///
/// Modulation inputs are not stored here; they live in
/// [`Routing`](crate::routing::Routing) and are re-derived from the CV slots.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Oscillator {
    /// Frequency code in linear knob units, `1..=4096`.
    pub freq: u16,
    /// Octave, `0..=2`.
    pub octave: u8,
    pub waveform: Waveform,
    /// Output level `0.0..=1.0`, derived from the amplitude entry.
    pub amp: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            freq: 2048,
            octave: 0,
            waveform: Waveform::default(),
            amp: 0.5,
        }
    }
}

impl Oscillator {
    /// Highest octave setting.
    pub const OCTAVE_MAX: u8 = 2;

    pub const OCTAVE_LABELS: [&'static str; 3] = [" 0 ", " 1 ", " 2 "];

    /// Advance the octave `0 -> 1 -> 2 -> 0`.
    pub fn cycle_octave(&mut self) {
        self.octave = if self.octave >= Self::OCTAVE_MAX {
            0
        } else {
            self.octave + 1
        };
    }

    pub fn octave_label(&self) -> &'static str {
        Self::OCTAVE_LABELS[self.octave.min(Self::OCTAVE_MAX) as usize]
    }
}

/// A modulation destination's source selector and depth.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CvSlot {
    pub source: Source,
    /// Depth `0.0..=1.0`, always `code / 4096` of its entry.
    pub amount: f32,
}

impl Default for CvSlot {
    fn default() -> Self {
        Self {
            source: Source::Envelope,
            amount: 0.5,
        }
    }
}

/// Attack/release envelope. Its output (`feed`) is published in the
/// [`SignalBank`](crate::routing::SignalBank) under
/// [`Source::Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Envelope {
    /// Attack time in kernel units (`code * 32`).
    pub attack: u32,
    /// Release time in kernel units (`code * 32`).
    pub release: u32,
    pub enabled: bool,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 2048 * super::ENVELOPE_SCALE,
            release: 2048 * super::ENVELOPE_SCALE,
            enabled: true,
        }
    }
}

/// Which six-step half of the sequence the knobs edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeqHalf {
    #[default]
    A,
    B,
}

impl SeqHalf {
    pub fn toggle(self) -> Self {
        match self {
            SeqHalf::A => SeqHalf::B,
            SeqHalf::B => SeqHalf::A,
        }
    }

    /// First step index covered by this half.
    pub fn offset(self) -> usize {
        match self {
            SeqHalf::A => 0,
            SeqHalf::B => HALF_STEPS,
        }
    }
}

/// Step sequencer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sequencer {
    /// Raw step codes, `1..=4096`. The persisted form of the pattern.
    pub codes: [u16; SEQ_STEPS],
    /// Step levels `0.0..=1.0`, derived from `codes`.
    pub notes: [f32; SEQ_STEPS],
    /// Number of steps played, `2..=24`.
    pub length: u8,
    /// Kernel clock divisor, derived from the tempo entry.
    pub divisor: u16,
    /// Step currently playing. Advanced by the kernel.
    pub current: u8,
    pub enabled: bool,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self {
            codes: [2048; SEQ_STEPS],
            notes: [0.5; SEQ_STEPS],
            length: SEQ_STEPS as u8,
            divisor: 2048 / 32 + 1,
            current: 0,
            enabled: true,
        }
    }
}

/// Filter selection. Q and cutoff are driven by CV slots 3 and 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Filter {
    pub kind: FilterType,
}

// ── Unit Tests ───────────────────────────────────────────────────────
