//! Seams to the collaborators this crate drives but does not implement.
//!
//! - [`ControlKernel`]: the control-rate half of the DSP kernel (knob
//!   refresh, modulation tick, sequence pattern generation). Called from
//!   the control plane.
//! - [`AudioKernel`]: the sample-rate half, filling one audio block. Called
//!   from the audio producer.
//! - [`FrontPanel`]: the three buttons.
//! - [`AudioSink`]: the audio output transport. `write` may wait for a free
//!   output buffer; that wait is one of only two places the producer blocks.

use crate::randomize::PatchRng;
use crate::ui::ButtonLevels;
use crate::voice::{Voice, SEQ_STEPS};

/// Control-rate entry points of the DSP kernel.
pub trait ControlKernel {
    /// Pull fresh raw knob readings into `voice.pots`.
    fn refresh_parameters(&mut self, voice: &mut Voice);

    /// Advance every oscillator, sequencer and envelope output by one
    /// control tick using the current wiring in `voice.routing`.
    fn tick_modulation_graph(&mut self, voice: &mut Voice);

    /// Fill `steps` with a new sequencer pattern, levels `0.0..=1.0`.
    ///
    /// The default draws every step uniformly from the patch random source.
    fn generate_pattern(&mut self, rng: &mut PatchRng, steps: &mut [f32; SEQ_STEPS]) {
        for step in steps.iter_mut() {
            *step = rng.unit();
        }
    }
}

/// Sample-rate entry point of the DSP kernel.
pub trait AudioKernel {
    /// Render one block of samples from `voice`.
    ///
    /// `voice` is the producer's private snapshot. The kernel may update
    /// `voice.outputs` and `voice.sequencer.current`; those two fields are
    /// published back to the shared state after the block.
    fn fill_block(&mut self, voice: &mut Voice, block: &mut [i16]);
}

/// Button hardware.
pub trait FrontPanel {
    /// Current level of each button.
    fn buttons(&mut self) -> ButtonLevels;
}

/// Audio output transport.
#[allow(async_fn_in_trait)]
pub trait AudioSink {
    /// Hand a finished block to the output. Waits while every output buffer
    /// is in use.
    async fn write(&mut self, block: &[i16]);
}
