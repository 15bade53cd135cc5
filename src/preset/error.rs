//! Error types for preset persistence.

use core::fmt;

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Errors that can occur when saving or loading the preset record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetError {
    /// The flash primitive reported an erase, program or read failure.
    Flash(NorFlashErrorKind),

    /// The record region reads as erased flash; nothing has been saved yet.
    Blank,

    /// The record carries a format version this firmware cannot read.
    UnsupportedVersion(u8),

    /// Magic mismatch, or a field outside its documented range.
    Corrupt,
}

impl PresetError {
    /// Wrap any flash driver's error. Use with `map_err`.
    pub fn flash<E: NorFlashError>(error: E) -> Self {
        PresetError::Flash(error.kind())
    }
}

fn kind_name(kind: NorFlashErrorKind) -> &'static str {
    match kind {
        NorFlashErrorKind::NotAligned => "not aligned",
        NorFlashErrorKind::OutOfBounds => "out of bounds",
        _ => "other",
    }
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PresetError::Flash(kind) => write!(f, "Flash error: {}", kind_name(*kind)),
            PresetError::Blank => write!(f, "No preset saved"),
            PresetError::UnsupportedVersion(v) => write!(f, "Unsupported preset version {}", v),
            PresetError::Corrupt => write!(f, "Corrupt preset record"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PresetError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            PresetError::Flash(kind) => defmt::write!(f, "Flash error: {=str}", kind_name(*kind)),
            PresetError::Blank => defmt::write!(f, "No preset saved"),
            PresetError::UnsupportedVersion(v) => {
                defmt::write!(f, "Unsupported preset version {=u8}", v)
            }
            PresetError::Corrupt => defmt::write!(f, "Corrupt preset record"),
        }
    }
}
