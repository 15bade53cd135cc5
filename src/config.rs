//! Compile-time configuration for the control core.
//!
//! Everything tunable lives either in [`FlashLayout`] or in the constants
//! below. There is no runtime configuration store; the only persisted state
//! is the preset record described by [`FlashLayout`].

/// Samples rendered per audio block. One [`Tick`](crate::messenger::Tick)
/// is posted per block.
pub const SAMPLES_PER_BLOCK: usize = 512;

/// Depth of the pacing-token queue between the two cores. Matches the
/// inter-core FIFO the voice was designed around.
pub const TICK_QUEUE_DEPTH: usize = 8;

/// Upper bound of every knob-editable raw code (and the normalizing divisor).
pub const CODE_MAX: u16 = 4096;

/// Lower bound of every knob-editable raw code.
pub const CODE_MIN: u16 = 1;

/// Where the single preset record lives in on-chip flash.
///
/// [`FlashLayout::default()`] is the factory layout: 512 KiB into
/// flash (below the application's used space on a 2 MiB part) with 256-byte
/// program pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashLayout {
    /// Offset of the preset region from the start of flash. Must be
    /// sector-aligned.
    pub target_offset: u32,
    /// Flash program-page size in bytes.
    pub page_size: usize,
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self {
            target_offset: 512 * 1024,
            page_size: 256,
        }
    }
}

impl FlashLayout {
    /// Offset at which the record itself starts. The first program page of
    /// the region is reserved.
    pub fn record_offset(&self) -> u32 {
        self.target_offset + self.page_size as u32
    }

    /// Number of program pages needed for a record of `len` bytes.
    ///
    /// Formula: `len / page_size + 1`, so an exact multiple still gets a
    /// spare page.
    pub fn record_pages(&self, len: usize) -> usize {
        len / self.page_size + 1
    }

    /// Number of erase sectors needed to cover the reserved page plus a
    /// record of `len` bytes.
    ///
    /// Formula: `((1 + record_pages) * page_size) / sector_size + 1`.
    pub fn sector_count(&self, len: usize, sector_size: usize) -> usize {
        ((1 + self.record_pages(len)) * self.page_size) / sector_size + 1
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
