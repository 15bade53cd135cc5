//! SSD1306 front-panel display.
//!
//! [`OledDriver`] owns the panel in async buffered graphics mode,
//! [`render_screen`] draws one [`Screen`] snapshot into the frame buffer,
//! and [`display_update_task`] polls the snapshot the control plane
//! publishes and flushes only frames that differ from the last one.

use core::fmt::Write;

use display_interface::DisplayError;
use display_interface_i2c::I2CInterface;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use embedded_hal_async::i2c::I2c;
use heapless::String;
use ssd1306::{mode::BufferedGraphicsModeAsync, prelude::*, I2CDisplayInterface, Ssd1306Async};

use ff_voice::ui::{Row, Screen, PAGES};
use ff_voice::voice::{SeqHalf, HALF_STEPS, SEQ_STEPS};
use ff_voice::SharedScreen;

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum OledError {
    /// Bus-level failure reported by the display interface.
    Display(DisplayError),
    InitializationFailed,
    NotInitialized,
}

impl From<DisplayError> for OledError {
    fn from(e: DisplayError) -> Self {
        OledError::Display(e)
    }
}

impl defmt::Format for OledError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            OledError::Display(_e) => defmt::write!(f, "Display interface error"),
            OledError::InitializationFailed => defmt::write!(f, "Initialization failed"),
            OledError::NotInitialized => defmt::write!(f, "Not initialized"),
        }
    }
}

// ── Driver ───────────────────────────────────────────────────────────────

type Display<I2C> =
    Ssd1306Async<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsModeAsync<DisplaySize128x64>>;

/// SSD1306 128×64 over I2C.
///
/// Construction sends nothing; call [`init`](Self::init) once before
/// drawing or flushing.
pub struct OledDriver<I2C> {
    display: Display<I2C>,
    initialized: bool,
}

impl<I2C: I2c> OledDriver<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let display = Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self {
            display,
            initialized: false,
        }
    }

    pub async fn init(&mut self) -> Result<(), OledError> {
        self.display
            .init()
            .await
            .map_err(|_| OledError::InitializationFailed)?;
        self.initialized = true;
        Ok(())
    }

    /// Clear the frame buffer. No bus traffic.
    pub fn clear_buffer(&mut self) {
        self.display.clear_buffer();
    }

    /// Push the frame buffer to the panel (about 20 ms at 400 kHz).
    pub async fn flush(&mut self) -> Result<(), OledError> {
        if !self.initialized {
            return Err(OledError::NotInitialized);
        }
        self.display.flush().await?;
        Ok(())
    }

    /// The frame buffer as an `embedded-graphics` draw target, once
    /// initialised.
    pub fn display_mut(&mut self) -> Option<&mut Display<I2C>> {
        if self.initialized {
            Some(&mut self.display)
        } else {
            None
        }
    }
}

// ── DisplayConfig ────────────────────────────────────────────────────────

/// Refresh rate and layout geometry.
///
/// Parameter pages are two 64 px columns, one per heading, each with three
/// rows of a label and a bar.
pub struct DisplayConfig {
    /// Poll rate in Hz. Default: 30.
    pub update_frequency_hz: u32,
    /// Width of one parameter group. Default: 64.
    pub column_width: i32,
    /// Height of the heading line. Default: 12.
    pub header_height: i32,
    /// Vertical pitch of parameter rows. Default: 12.
    pub row_height: i32,
    /// Bar offset from the left edge of its column. Default: 22.
    pub bar_x: i32,
    /// Full-scale bar width. Default: 38.
    pub bar_width: u32,
    /// Default: 6.
    pub bar_height: u32,
    /// Tallest sequence step bar. Default: 36.
    pub step_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            update_frequency_hz: 30,
            column_width: 64,
            header_height: 12,
            row_height: 12,
            bar_x: 22,
            bar_width: 38,
            bar_height: 6,
            step_height: 36,
        }
    }
}

impl DisplayConfig {
    pub fn update_period_ms(&self) -> u64 {
        1000 / self.update_frequency_hz.max(1) as u64
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

const FOOTER_Y: i32 = 54;

fn normal() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

fn inverted() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::Off)
        .background_color(BinaryColor::On)
        .build()
}

fn centered<D>(target: &mut D, text: &str, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let width = target.bounding_box().size.width as i32;
    let style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(width / 2, y), normal(), style).draw(target)?;
    Ok(())
}

fn draw_row<D>(target: &mut D, row: &Row, origin: Point, config: &DisplayConfig) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = if row.selected { inverted() } else { normal() };
    Text::with_baseline(row.label, origin, style, Baseline::Top).draw(target)?;

    if let Some(level) = row.level {
        let bar = origin + Point::new(config.bar_x, 2);
        Rectangle::new(bar, Size::new(config.bar_width, config.bar_height))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;
        let fill = (level.clamp(0.0, 1.0) * config.bar_width as f32) as u32;
        if fill > 0 {
            Rectangle::new(bar, Size::new(fill, config.bar_height))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(target)?;
        }
    }
    Ok(())
}

/// Draw `screen` into `target`. The caller clears the buffer first.
pub fn render_screen<D>(target: &mut D, screen: &Screen, config: &DisplayConfig) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    match screen {
        Screen::Splash => {
            centered(target, "FF   V. 1.0.A", 18)?;
            centered(target, "2022 UNMANNED", 34)?;
        }
        Screen::Saving => {
            centered(target, "SAVING", 27)?;
        }
        Screen::Params {
            page,
            headings,
            rows,
            ..
        } => {
            for (group, heading) in headings.iter().enumerate() {
                let x = group as i32 * config.column_width;
                Text::with_baseline(heading, Point::new(x, 0), normal(), Baseline::Top).draw(target)?;
                for (i, row) in rows[group * 3..group * 3 + 3].iter().enumerate() {
                    let y = config.header_height + i as i32 * config.row_height;
                    draw_row(target, row, Point::new(x, y), config)?;
                }
            }

            let mut footer: String<8> = String::new();
            let _ = write!(footer, "{}/{}", page.index() + 1, PAGES);
            Text::with_alignment(
                &footer,
                Point::new(127, FOOTER_Y + 8),
                normal(),
                Alignment::Right,
            )
            .draw(target)?;
        }
        Screen::Sequence {
            levels,
            current,
            half,
            seq_on,
            env_on,
            ..
        } => {
            let pitch = 128 / SEQ_STEPS as i32;
            let base = config.header_height + config.step_height as i32;
            let editing = half.offset()..half.offset() + HALF_STEPS;
            let playing = *current as usize % SEQ_STEPS;

            Text::with_baseline("SEQUENCE", Point::zero(), normal(), Baseline::Top).draw(target)?;

            for (step, level) in levels.iter().enumerate() {
                let x = step as i32 * pitch + 1;
                let h = ((level.clamp(0.0, 1.0) * config.step_height as f32) as u32).max(1);
                let style = if editing.contains(&step) {
                    PrimitiveStyle::with_fill(BinaryColor::On)
                } else {
                    PrimitiveStyle::with_stroke(BinaryColor::On, 1)
                };
                Rectangle::new(Point::new(x, base - h as i32), Size::new((pitch - 3) as u32, h))
                    .into_styled(style)
                    .draw(target)?;

                if step == playing {
                    Rectangle::new(Point::new(x, base + 2), Size::new((pitch - 3) as u32, 2))
                        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                        .draw(target)?;
                }
            }

            let mut footer: String<24> = String::new();
            let _ = write!(
                footer,
                "{} SEQ:{} ENV:{}",
                match half {
                    SeqHalf::A => "A",
                    SeqHalf::B => "B",
                },
                if *seq_on { "ON" } else { "OFF" },
                if *env_on { "ON" } else { "OFF" },
            );
            Text::with_baseline(&footer, Point::new(0, FOOTER_Y), normal(), Baseline::Top).draw(target)?;
        }
    }
    Ok(())
}

// ── Display update task ──────────────────────────────────────────────────

/// Periodic display loop. Wrap it in a concrete `#[embassy_executor::task]`.
///
/// 1. Initialise the panel; on failure log and return.
/// 2. Every period, copy the published [`Screen`] (lock held for the copy
///    only).
/// 3. Skip the frame when it equals the last one drawn.
/// 4. Clear, render, flush. Render and flush failures are logged and the
///    frame is retried next period.
pub async fn display_update_task<I2C: I2c>(
    mut driver: OledDriver<I2C>,
    screen: &'static SharedScreen<CriticalSectionRawMutex>,
    config: DisplayConfig,
) {
    if let Err(e) = driver.init().await {
        defmt::error!("OLED init failed: {}", e);
        return;
    }
    defmt::info!("OLED initialised");

    let period = Duration::from_millis(config.update_period_ms());
    let mut last: Option<Screen> = None;

    loop {
        Timer::after(period).await;

        let snapshot = screen.lock(|s| s.get());
        if last == Some(snapshot) {
            continue;
        }

        driver.clear_buffer();
        let Some(display) = driver.display_mut() else {
            continue;
        };
        if render_screen(display, &snapshot, &config).is_err() {
            defmt::error!("Render failed");
            continue;
        }

        if let Err(e) = driver.flush().await {
            defmt::error!("Flush failed: {}", e);
            continue;
        }

        last = Some(snapshot);
    }
}
