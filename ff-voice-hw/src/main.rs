//! ff-voice-hw
//!
//! RP2350 firmware for the FF three-oscillator voice. Splits the library's
//! producer/consumer loop across the two cores:
//!
//! 1. Core 1 runs the [`AudioProducer`]: [`BasicKernel`] renders a block,
//!    the PIO I2S sink plays it, one tick is posted per block.
//! 2. Core 0 runs the [`ControlPlane`]: it loads the saved preset, then for
//!    every tick reads buttons and pots, updates the voice and publishes a
//!    [`Screen`](ff_voice::Screen) snapshot. Flash access must stay on this
//!    core; the flash driver pauses core 1 while it erases and programs.
//! 3. The OLED task, also on core 0, redraws the snapshot at 30 Hz.
//!
//! [`AudioProducer`]: ff_voice::AudioProducer
//! [`ControlPlane`]: ff_voice::ControlPlane
//! [`BasicKernel`]: kernel::BasicKernel

#![no_std]
#![no_main]

mod board;
mod display;
mod kernel;

use core::cell::{Cell, RefCell};

use defmt::*;
use embassy_executor::Executor;
use embassy_rp::adc::{self, Adc};
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::{DMA_CH0, FLASH, I2C0, PIN_0, PIN_1, PIN_2, PIO0};
use embassy_rp::pio::{self, Pio};
use embassy_rp::pio_programs::i2s::{PioI2sOut, PioI2sOutProgram};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ff_voice::{
    AudioProducer, ControlPlane, FlashLayout, PatchRng, PresetStore, Screen, SharedScreen, SharedVoice,
    TickChannel, Voice,
};

use board::{DriverGuard, I2sSink, Panel, PotMux};
use display::{display_update_task, DisplayConfig, OledDriver};
use kernel::{BasicKernel, SAMPLE_RATE};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

const FLASH_SIZE: usize = 2 * 1024 * 1024;
const OLED_ADDRESS: u8 = 0x3C;
const I2S_BIT_DEPTH: u32 = 16;

static mut CORE1_STACK: Stack<16384> = Stack::new();
static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

/// Live voice, written by the control plane and read by the audio core.
static VOICE: StaticCell<SharedVoice<CriticalSectionRawMutex>> = StaticCell::new();
static TICKS: TickChannel<CriticalSectionRawMutex> = Channel::new();
static SCREEN: SharedScreen<CriticalSectionRawMutex> = Mutex::new(Cell::new(Screen::Splash));

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

type OledI2c = I2c<'static, I2C0, i2c::Async>;
type VoiceFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;
type Plane = ControlPlane<PotMux, Panel, VoiceFlash, DriverGuard>;

/// Pins and channels the audio core takes for I2S.
struct AudioPins {
    pio: Peri<'static, PIO0>,
    dma: Peri<'static, DMA_CH0>,
    data: Peri<'static, PIN_2>,
    bit_clock: Peri<'static, PIN_0>,
    lr_clock: Peri<'static, PIN_1>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[embassy_executor::task]
async fn audio_task(pins: AudioPins, voice: &'static SharedVoice<CriticalSectionRawMutex>) {
    let Pio { mut common, sm0, .. } = Pio::new(pins.pio, Irqs);
    let program = PioI2sOutProgram::new(&mut common);
    let i2s = PioI2sOut::new(
        &mut common,
        sm0,
        pins.dma,
        pins.data,
        pins.bit_clock,
        pins.lr_clock,
        SAMPLE_RATE,
        I2S_BIT_DEPTH,
        &program,
    );
    info!("I2S running at {} Hz", SAMPLE_RATE);

    let mut producer = AudioProducer::new(BasicKernel::new(0x2545_F491), I2sSink::new(i2s));
    producer.run(voice, &TICKS).await
}

#[embassy_executor::task]
async fn control_task(mut plane: Plane, voice: &'static SharedVoice<CriticalSectionRawMutex>) {
    // Blank or unreadable flash keeps the default patch; already logged.
    let _ = plane.boot(voice);
    plane.run(&TICKS, voice, &SCREEN).await
}

#[embassy_executor::task]
async fn oled_task(driver: OledDriver<OledI2c>, config: DisplayConfig) {
    display_update_task(driver, &SCREEN, config).await;
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    info!("ff-voice-hw starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // I2S BCLK  → GP0    LRCLK → GP1    DIN → GP2
    // OLED SDA  → GP4    SCL   → GP5    (0x3C)
    // BUTTON C  → GP17   B     → GP18   A   → GP19   (active high)
    // MUX S0–S2 → GP20–GP22             POTS → GP26 (ADC0)
    // ———————————————————————————————————————————————————————————————————————

    let mut adc = Adc::new_blocking(p.ADC, adc::Config::default());
    let mut sensor = adc::Channel::new_temp_sensor(p.ADC_TEMP_SENSOR);
    let rng = PatchRng::from_seed(board::noise_seed(&mut adc, &mut sensor));

    let pots = PotMux::new(
        adc,
        adc::Channel::new_pin(p.PIN_26, Pull::None),
        [
            Output::new(p.PIN_20, Level::Low),
            Output::new(p.PIN_21, Level::Low),
            Output::new(p.PIN_22, Level::Low),
        ],
    );
    let panel = Panel::new(
        Input::new(p.PIN_19, Pull::Down),
        Input::new(p.PIN_18, Pull::Down),
        Input::new(p.PIN_17, Pull::Down),
    );
    let flash = VoiceFlash::new_blocking(p.FLASH);
    let store = PresetStore::with_guard(flash, FlashLayout::default(), DriverGuard);
    let plane = ControlPlane::new(pots, panel, store, rng);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c_config);
    let oled = OledDriver::new(i2c, OLED_ADDRESS);

    let voice: &'static SharedVoice<CriticalSectionRawMutex> =
        VOICE.init(Mutex::new(RefCell::new(Voice::new())));

    let audio = AudioPins {
        pio: p.PIO0,
        dma: p.DMA_CH0,
        data: p.PIN_2,
        bit_clock: p.PIN_0,
        lr_clock: p.PIN_1,
    };

    // —— Spawn ——————————————————————————————————————————————————————————————

    spawn_core1(
        p.CORE1,
        unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| spawner.spawn(unwrap!(audio_task(audio, voice))));
        },
    );

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| {
        spawner.spawn(unwrap!(control_task(plane, voice)));
        spawner.spawn(unwrap!(oled_task(oled, DisplayConfig::default())));
        info!("All tasks spawned");
    });
}
