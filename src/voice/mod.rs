//! Live synth state (the parameter store).
//!
//! [`Voice`] is the single block of state the control plane edits and the DSP
//! kernel reads. Knob-editable values are stored once, as raw codes in the
//! entry table; everything the kernel consumes (amplitudes, CV amounts,
//! envelope times, clock divisor, step levels) is derived from those codes by
//! [`Voice::derive()`].
//!
//! # Entry table
//!
//! ```text
//! idx  0      1       2      3..=5     6..=8      9   10      11..=13
//!      ATTACK RELEASE TEMPO  AMP A-C   AM A-C     Q   CUTOFF  FM A-C
//! ```
//!
//! Entries 6..=13 line up with CV slots 0..=7, so CV slot `i` takes its
//! amount from entry `ENTRY_CV + i`. Entries 14..=16 are reserved.
//!
//! Every entry stays in `[CODE_MIN, CODE_MAX]`.

mod parts;
mod store;

pub use parts::{CvSlot, Envelope, Filter, FilterType, Oscillator, SeqHalf, Sequencer, Waveform};
pub use store::Voice;

/// Number of oscillators.
pub const OSCILLATORS: usize = 3;

/// Number of CV (modulation) slots.
pub const CV_SLOTS: usize = 8;

/// Number of editable sequencer steps.
pub const SEQ_STEPS: usize = 12;

/// Steps per editable half ("A" = 0..6, "B" = 6..12).
pub const HALF_STEPS: usize = SEQ_STEPS / 2;

/// Shortest and longest sequence the kernel will play.
pub const SEQ_LENGTH_MIN: u8 = 2;
pub const SEQ_LENGTH_MAX: u8 = 24;

/// Size of the raw-code entry table.
pub const ENTRY_SLOTS: usize = 17;

/// Logical potentiometer readings refreshed by the kernel each cycle.
pub const POT_COUNT: usize = 6;

/// Raw knob readings, one per editable column.
pub type PotReadings = [u16; POT_COUNT];

/// Envelope attack code.
pub const ENTRY_ATTACK: usize = 0;
/// Envelope release code.
pub const ENTRY_RELEASE: usize = 1;
/// Sequencer tempo divisor code.
pub const ENTRY_TEMPO: usize = 2;
/// First of three oscillator amplitude codes.
pub const ENTRY_AMP: usize = 3;
/// First CV amount code; CV slot `i` reads `ENTRY_CV + i`.
pub const ENTRY_CV: usize = 6;
/// First of three AM amount codes.
pub const ENTRY_AM: usize = ENTRY_CV;
/// Filter resonance amount code.
pub const ENTRY_Q: usize = 9;
/// Filter cutoff amount code.
pub const ENTRY_CUTOFF: usize = 10;
/// First of three FM amount codes.
pub const ENTRY_FM: usize = 11;

/// Envelope codes are multiplied by this to get kernel time units.
pub const ENVELOPE_SCALE: u32 = 32;

/// Convert a raw code to the normalized `0.0..=1.0` range.
pub fn normalized(code: u16) -> f32 {
    code as f32 / crate::config::CODE_MAX as f32
}
