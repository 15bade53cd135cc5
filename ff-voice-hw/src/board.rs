//! Board glue: the library's hardware seams bound to RP2350 peripherals.
//!
//! | Seam           | Hardware                                            |
//! |----------------|-----------------------------------------------------|
//! | `FrontPanel`   | buttons A/B/C on GP19/GP18/GP17, active high        |
//! | `ControlKernel`| six pots behind an analog mux, select GP20–22, ADC GP26 |
//! | `AudioSink`    | PIO0 I2S out, data GP2, bit clock GP0, LR clock GP1 |
//! | `FlashGuard`   | on-chip QSPI flash through `embassy_rp::flash`      |

use defmt::*;
use embassy_rp::adc::{self, Adc};
use embassy_rp::gpio::{Input, Level, Output};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio_programs::i2s::PioI2sOut;

use ff_voice::config::SAMPLES_PER_BLOCK;
use ff_voice::preset::FlashGuard;
use ff_voice::ui::ButtonLevels;
use ff_voice::{AudioSink, ControlKernel, FrontPanel, Voice};

/// Busy-wait after switching the mux, about 2 µs at 150 MHz.
const MUX_SETTLE_CYCLES: u32 = 300;

// ── Buttons ──────────────────────────────────────────────────────────────

pub struct Panel {
    a: Input<'static>,
    b: Input<'static>,
    c: Input<'static>,
}

impl Panel {
    pub fn new(a: Input<'static>, b: Input<'static>, c: Input<'static>) -> Self {
        Self { a, b, c }
    }
}

impl FrontPanel for Panel {
    fn buttons(&mut self) -> ButtonLevels {
        ButtonLevels {
            a: self.a.is_high(),
            b: self.b.is_high(),
            c: self.c.is_high(),
        }
    }
}

// ── Pots ─────────────────────────────────────────────────────────────────

/// The control half of the kernel: reads the pots.
///
/// Modulation sources are advanced per sample by
/// [`BasicKernel`](crate::kernel::BasicKernel), so the control tick has
/// nothing left to do.
pub struct PotMux {
    adc: Adc<'static, adc::Blocking>,
    common: adc::Channel<'static>,
    select: [Output<'static>; 3],
}

impl PotMux {
    pub fn new(adc: Adc<'static, adc::Blocking>, common: adc::Channel<'static>, select: [Output<'static>; 3]) -> Self {
        Self { adc, common, select }
    }
}

impl ControlKernel for PotMux {
    fn refresh_parameters(&mut self, voice: &mut Voice) {
        for (channel, pot) in voice.pots.iter_mut().enumerate() {
            for (bit, line) in self.select.iter_mut().enumerate() {
                line.set_level(Level::from((channel >> bit) & 1 == 1));
            }
            cortex_m::asm::delay(MUX_SETTLE_CYCLES);

            match self.adc.blocking_read(&mut self.common) {
                // 12-bit reading shifted into the 1..=4096 code range
                Ok(raw) => *pot = raw.min(4095) + 1,
                Err(_) => warn!("pot {} read failed, keeping last value", channel),
            }
        }
    }

    fn tick_modulation_graph(&mut self, _voice: &mut Voice) {}
}

/// Fold the low bits of repeated temperature-sensor readings into a seed.
pub fn noise_seed(adc: &mut Adc<'static, adc::Blocking>, sensor: &mut adc::Channel<'static>) -> u64 {
    let mut seed = 0u64;
    for _ in 0..16 {
        if let Ok(raw) = adc.blocking_read(sensor) {
            seed = seed.rotate_left(5) ^ u64::from(raw);
        }
    }
    seed
}

// ── Audio out ────────────────────────────────────────────────────────────

/// Mono blocks duplicated onto both I2S channels.
pub struct I2sSink {
    i2s: PioI2sOut<'static, PIO0, 0>,
    frames: [u32; SAMPLES_PER_BLOCK],
}

impl I2sSink {
    pub fn new(i2s: PioI2sOut<'static, PIO0, 0>) -> Self {
        Self {
            i2s,
            frames: [0; SAMPLES_PER_BLOCK],
        }
    }
}

impl AudioSink for I2sSink {
    async fn write(&mut self, block: &[i16]) {
        for (frame, &sample) in self.frames.iter_mut().zip(block) {
            let s = u32::from(sample as u16);
            *frame = (s << 16) | s;
        }
        self.i2s.write(&self.frames).await;
    }
}

// ── Flash ────────────────────────────────────────────────────────────────

/// Relies on the driver's own exclusion.
///
/// `embassy_rp::flash` pauses core 1 and masks interrupts around every erase
/// and program. An outer critical section would block the pause handshake,
/// so the sequence runs unwrapped.
pub struct DriverGuard;

impl FlashGuard for DriverGuard {
    fn exclusive<R>(&mut self, f: impl FnOnce() -> R) -> R {
        f()
    }
}
