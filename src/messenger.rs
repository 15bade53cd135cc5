//! The producer/consumer split between the two cores.
//!
//! The audio producer renders one block, publishes the kernel's outputs,
//! hands the block to the sink and posts one [`Tick`]. The control plane
//! waits for a tick, then drains every tick queued so far, running one full
//! cycle per tick. [`Tick`] carries nothing; it only paces the consumer.
//!
//! The queue is bounded at [`TICK_QUEUE_DEPTH`]. When it is full the
//! producer waits in `send`, so ticks are never dropped; a slow consumer
//! cycle (a flash save) stalls audio instead.
//!
//! [`Voice`] is shared behind [`SharedVoice`]. The control plane is its only
//! writer apart from the two kernel-produced fields the producer publishes
//! after each block (`outputs`, `sequencer.current`). The producer renders
//! from a private copy taken at the start of the block, so the lock is never
//! held across rendering or an await.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embedded_storage::nor_flash::NorFlash;

use crate::config::{SAMPLES_PER_BLOCK, TICK_QUEUE_DEPTH};
use crate::control::ControlPlane;
use crate::kernel::{AudioKernel, AudioSink, ControlKernel, FrontPanel};
use crate::preset::FlashGuard;
use crate::ui::Screen;
use crate::voice::Voice;

/// Pacing token, one per rendered audio block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick;

/// Bounded queue from the audio core to the control core.
pub type TickChannel<M> = Channel<M, Tick, TICK_QUEUE_DEPTH>;

/// Live voice state shared by both cores.
pub type SharedVoice<M> = Mutex<M, RefCell<Voice>>;

/// Latest display snapshot, published by the control plane.
pub type SharedScreen<M> = Mutex<M, Cell<Screen>>;

// ── Producer ─────────────────────────────────────────────────────────────

/// The audio core's loop body.
pub struct AudioProducer<K, S> {
    kernel: K,
    sink: S,
    block: [i16; SAMPLES_PER_BLOCK],
}

impl<K: AudioKernel, S: AudioSink> AudioProducer<K, S> {
    pub fn new(kernel: K, sink: S) -> Self {
        Self {
            kernel,
            sink,
            block: [0; SAMPLES_PER_BLOCK],
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Render and deliver one block, then post its tick.
    ///
    /// Waits only in the sink (no free output buffer) and in the tick
    /// queue (consumer behind by [`TICK_QUEUE_DEPTH`] blocks).
    pub async fn produce<M: RawMutex>(&mut self, voice: &SharedVoice<M>, ticks: &TickChannel<M>) {
        let mut snapshot = voice.lock(|v| *v.borrow());
        self.kernel.fill_block(&mut snapshot, &mut self.block);
        voice.lock(|v| {
            let mut v = v.borrow_mut();
            v.outputs = snapshot.outputs;
            v.sequencer.current = snapshot.sequencer.current;
        });

        self.sink.write(&self.block).await;
        ticks.send(Tick).await;
    }

    pub async fn run<M: RawMutex>(&mut self, voice: &SharedVoice<M>, ticks: &TickChannel<M>) -> ! {
        loop {
            self.produce(voice, ticks).await;
        }
    }
}

// ── Consumer ─────────────────────────────────────────────────────────────

impl<K, P, F, G> ControlPlane<K, P, F, G>
where
    K: ControlKernel,
    P: FrontPanel,
    F: NorFlash,
    G: FlashGuard,
{
    /// Wait for at least one tick, then run one cycle for it and for every
    /// other tick already queued. Returns the number of cycles run.
    ///
    /// The screen is published once, after the last cycle. A save also
    /// publishes [`Screen::Saving`] before it writes.
    pub async fn drain<M: RawMutex>(
        &mut self,
        ticks: &TickChannel<M>,
        voice: &SharedVoice<M>,
        screen: &SharedScreen<M>,
    ) -> usize {
        let Tick = ticks.receive().await;
        self.tick(voice, screen);
        let mut cycles = 1;
        while ticks.try_receive().is_ok() {
            self.tick(voice, screen);
            cycles += 1;
        }
        let snapshot = self.screen();
        screen.lock(|s| s.set(snapshot));
        cycles
    }

    /// The control core's event loop.
    pub async fn run<M: RawMutex>(
        &mut self,
        ticks: &TickChannel<M>,
        voice: &SharedVoice<M>,
        screen: &SharedScreen<M>,
    ) -> ! {
        loop {
            let _cycles = self.drain(ticks, voice, screen).await;
            #[cfg(feature = "defmt")]
            {
                if _cycles > 1 {
                    defmt::trace!("drained {} ticks", _cycles);
                }
            }
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
