//! Flash persistence of the preset record.
//!
//! # Region layout
//!
//! ```text
//! target_offset
//! │ reserved page │ record (RECORD_LEN bytes, 0xFF padded to whole pages) │
//! └───────────────┴────── record_offset = target_offset + page_size
//! ```
//!
//! Save erases `sector_count` whole sectors from `target_offset`, then
//! programs the padded record at `record_offset`. The reserved page is left
//! erased.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::config::FlashLayout;
use crate::voice::Voice;

use super::{Preset, PresetError, RECORD_LEN};

/// Bytes handed to a single program call.
const PROGRAM_CHUNK: usize = 256;

/// Holds everything else off while a multi-step flash sequence runs.
///
/// Erase and program share the bus the CPU fetches code from, so nothing
/// may run between the start of an erase and the end of the matching
/// program that could touch flash.
pub trait FlashGuard {
    fn exclusive<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

/// Runs the whole sequence inside one `critical_section::with`.
///
/// Use this unless the flash driver already masks interrupts and parks the
/// other core around each operation. Nesting this guard around such a
/// driver deadlocks the core-parking handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalSectionGuard;

impl FlashGuard for CriticalSectionGuard {
    fn exclusive<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_| f())
    }
}

/// The single preset slot in on-chip flash.
pub struct PresetStore<F, G = CriticalSectionGuard> {
    flash: F,
    layout: FlashLayout,
    guard: G,
}

impl<F: NorFlash> PresetStore<F> {
    pub fn new(flash: F, layout: FlashLayout) -> Self {
        Self::with_guard(flash, layout, CriticalSectionGuard)
    }
}

impl<F: NorFlash, G: FlashGuard> PresetStore<F, G> {
    pub fn with_guard(flash: F, layout: FlashLayout, guard: G) -> Self {
        Self {
            flash,
            layout,
            guard,
        }
    }

    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Number of erase sectors one save clears.
    pub fn sectors_per_save(&self) -> usize {
        self.layout.sector_count(RECORD_LEN, F::ERASE_SIZE)
    }

    /// Erase the region and program `preset` into it.
    ///
    /// Blocks for the full erase/program time (tens of milliseconds). The
    /// caller must not hold the shared voice lock.
    ///
    /// # Errors
    ///
    /// [`PresetError::Flash`] if the driver rejects the erase or a program
    /// call. The region is left partially written in that case and the next
    /// load reports it as blank or corrupt.
    pub fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
        let record = preset.serialize();
        let layout = self.layout;
        let erase_from = layout.target_offset;
        let erase_to = erase_from + (self.sectors_per_save() * F::ERASE_SIZE) as u32;
        let padded = layout.record_pages(RECORD_LEN) * layout.page_size;
        let flash = &mut self.flash;

        self.guard.exclusive(|| -> Result<(), PresetError> {
            flash.erase(erase_from, erase_to).map_err(PresetError::flash)?;

            let mut chunk = [0xFF; PROGRAM_CHUNK];
            let mut written = 0;
            while written < padded {
                let len = (padded - written).min(PROGRAM_CHUNK);
                chunk.fill(0xFF);
                if written < RECORD_LEN {
                    let n = (RECORD_LEN - written).min(len);
                    chunk[..n].copy_from_slice(&record[written..written + n]);
                }
                flash
                    .write(layout.record_offset() + written as u32, &chunk[..len])
                    .map_err(PresetError::flash)?;
                written += len;
            }
            Ok(())
        })
    }

    /// Read and decode the stored record without touching live state.
    ///
    /// # Errors
    ///
    /// [`PresetError::Flash`] on a read failure, otherwise whatever
    /// [`Preset::deserialize`] reports.
    pub fn read(&mut self) -> Result<Preset, PresetError> {
        let mut buf = [0u8; RECORD_LEN];
        let offset = self.layout.record_offset();
        let flash = &mut self.flash;
        self.guard
            .exclusive(|| flash.read(offset, &mut buf))
            .map_err(PresetError::flash)?;
        Preset::deserialize(&buf)
    }

    /// Read the stored record into `voice`, re-deriving and re-resolving it.
    ///
    /// On error `voice` is untouched.
    pub fn load(&mut self, voice: &mut Voice) -> Result<(), PresetError> {
        let preset = self.read()?;
        preset.apply_to(voice);
        Ok(())
    }

    /// Give the flash driver back.
    pub fn release(self) -> F {
        self.flash
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
