//! Preset snapshot and its flash record.
//!
//! A [`Preset`] is the persistable subset of [`Voice`]: everything a patch
//! is made of, nothing the kernel produces. It is serialized over an
//! explicit field list, never by reinterpreting memory:
//!
//! ```text
//! off  len  field
//!   0    2  magic "FF"
//!   2    1  format version (1)
//!   3    8  CV source selectors          u8 x 8
//!  11   32  CV amounts                   f32 LE x 8
//!  43   34  entry table                  u16 LE x 17
//!  77   24  sequencer step codes         u16 LE x 12
//! 101    1  sequence length
//! 102    6  oscillator frequency codes   u16 LE x 3
//! 108    3  oscillator octaves
//! 111    3  oscillator waveforms
//! 114    1  filter type
//! 115    1  sequencer enabled (0/1)
//! 116    1  envelope enabled (0/1)
//! ```
//!
//! [`PresetStore`] handles the flash side.

mod error;
mod flash;

pub use error::PresetError;
pub use flash::{CriticalSectionGuard, FlashGuard, PresetStore};

#[cfg(test)]
pub(crate) use flash::tests::MemFlash;

use crate::config::{CODE_MAX, CODE_MIN};
use crate::routing::{Source, SOURCE_COUNT};
use crate::voice::{
    FilterType, Oscillator, Voice, Waveform, CV_SLOTS, ENTRY_SLOTS, OSCILLATORS, SEQ_LENGTH_MAX,
    SEQ_LENGTH_MIN, SEQ_STEPS,
};

/// Leading bytes of every record.
pub const MAGIC: [u8; 2] = *b"FF";

/// Format version written by this firmware.
pub const VERSION: u8 = 1;

/// Serialized record length in bytes.
pub const RECORD_LEN: usize = 3
    + CV_SLOTS
    + CV_SLOTS * 4
    + ENTRY_SLOTS * 2
    + SEQ_STEPS * 2
    + 1
    + OSCILLATORS * 2
    + OSCILLATORS
    + OSCILLATORS
    + 3;

/// Flat snapshot of one patch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Preset {
    pub sources: [Source; CV_SLOTS],
    pub amounts: [f32; CV_SLOTS],
    pub entries: [u16; ENTRY_SLOTS],
    pub steps: [u16; SEQ_STEPS],
    pub length: u8,
    pub freqs: [u16; OSCILLATORS],
    pub octaves: [u8; OSCILLATORS],
    pub waveforms: [Waveform; OSCILLATORS],
    pub filter: FilterType,
    pub seq_enabled: bool,
    pub env_enabled: bool,
}

impl Preset {
    /// Copy the persistable part of the live state.
    pub fn from_voice(voice: &Voice) -> Self {
        Self {
            sources: voice.cv.map(|slot| slot.source),
            amounts: voice.cv.map(|slot| slot.amount),
            entries: voice.entries,
            steps: voice.sequencer.codes,
            length: voice.sequencer.length,
            freqs: voice.oscillators.map(|osc| osc.freq),
            octaves: voice.oscillators.map(|osc| osc.octave),
            waveforms: voice.oscillators.map(|osc| osc.waveform),
            filter: voice.filter.kind,
            seq_enabled: voice.sequencer.enabled,
            env_enabled: voice.envelope.enabled,
        }
    }

    /// Copy into live state, then re-derive every dependent value and
    /// re-resolve the modulation wiring.
    pub fn apply_to(&self, voice: &mut Voice) {
        for (i, slot) in voice.cv.iter_mut().enumerate() {
            slot.source = self.sources[i];
            slot.amount = self.amounts[i];
        }
        voice.entries = self.entries;
        voice.sequencer.codes = self.steps;
        voice.sequencer.length = self.length;
        for (i, osc) in voice.oscillators.iter_mut().enumerate() {
            osc.freq = self.freqs[i];
            osc.octave = self.octaves[i];
            osc.waveform = self.waveforms[i];
        }
        voice.filter.kind = self.filter;
        voice.sequencer.enabled = self.seq_enabled;
        voice.envelope.enabled = self.env_enabled;

        voice.derive();
        voice.resolve_routing();
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Encode into the on-flash record format.
    pub fn serialize(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        let mut w = Writer { buf: &mut buf, pos: 0 };

        w.bytes(&MAGIC);
        w.u8(VERSION);
        for source in &self.sources {
            w.u8(source.selector());
        }
        for &amount in &self.amounts {
            w.bytes(&amount.to_le_bytes());
        }
        for &code in self.entries.iter().chain(&self.steps) {
            w.u16(code);
        }
        w.u8(self.length);
        for &freq in &self.freqs {
            w.u16(freq);
        }
        w.bytes(&self.octaves);
        for waveform in &self.waveforms {
            w.u8(waveform.index());
        }
        w.u8(self.filter.index());
        w.u8(self.seq_enabled as u8);
        w.u8(self.env_enabled as u8);

        buf
    }

    /// Decode a record, rejecting anything this firmware did not write.
    ///
    /// # Errors
    ///
    /// - [`PresetError::Blank`] if the header reads as erased flash.
    /// - [`PresetError::UnsupportedVersion`] for an unknown version byte.
    /// - [`PresetError::Corrupt`] for a short buffer, bad magic, or any
    ///   field outside its documented range.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, PresetError> {
        if bytes.len() < RECORD_LEN {
            return Err(PresetError::Corrupt);
        }
        if bytes[..3].iter().all(|&b| b == 0xFF) {
            return Err(PresetError::Blank);
        }
        if bytes[..2] != MAGIC {
            return Err(PresetError::Corrupt);
        }
        if bytes[2] != VERSION {
            return Err(PresetError::UnsupportedVersion(bytes[2]));
        }

        let mut r = Reader { buf: bytes, pos: 3 };

        let mut sources = [Source::default(); CV_SLOTS];
        for source in &mut sources {
            let selector = r.u8();
            if selector as usize >= SOURCE_COUNT {
                return Err(PresetError::Corrupt);
            }
            *source = Source::from_selector(selector);
        }

        let mut amounts = [0.0; CV_SLOTS];
        for amount in &mut amounts {
            *amount = r.f32();
            if !(0.0..=1.0).contains(amount) {
                return Err(PresetError::Corrupt);
            }
        }

        let mut entries = [0; ENTRY_SLOTS];
        for code in &mut entries {
            *code = r.code()?;
        }
        let mut steps = [0; SEQ_STEPS];
        for code in &mut steps {
            *code = r.code()?;
        }

        let length = r.u8();
        if !(SEQ_LENGTH_MIN..=SEQ_LENGTH_MAX).contains(&length) {
            return Err(PresetError::Corrupt);
        }

        let mut freqs = [0; OSCILLATORS];
        for freq in &mut freqs {
            *freq = r.code()?;
        }
        let mut octaves = [0; OSCILLATORS];
        for octave in &mut octaves {
            *octave = r.u8();
            if *octave > Oscillator::OCTAVE_MAX {
                return Err(PresetError::Corrupt);
            }
        }
        let mut waveforms = [Waveform::default(); OSCILLATORS];
        for waveform in &mut waveforms {
            *waveform = r.indexed(Waveform::ALL.len(), Waveform::from_index)?;
        }

        let filter = r.indexed(FilterType::ALL.len(), FilterType::from_index)?;
        let seq_enabled = r.flag()?;
        let env_enabled = r.flag()?;

        Ok(Self {
            sources,
            amounts,
            entries,
            steps,
            length,
            freqs,
            octaves,
            waveforms,
            filter,
            seq_enabled,
            env_enabled,
        })
    }
}

/// Cursor over a record buffer sized by [`RECORD_LEN`].
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn bytes(&mut self, data: &[u8]) {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u8(&mut self, value: u8) {
        self.bytes(&[value]);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }
}

/// Read cursor. Callers check the length against [`RECORD_LEN`] first.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    /// A raw code, which must lie in `[CODE_MIN, CODE_MAX]`.
    fn code(&mut self) -> Result<u16, PresetError> {
        let code = u16::from_le_bytes(self.take());
        if (CODE_MIN..=CODE_MAX).contains(&code) {
            Ok(code)
        } else {
            Err(PresetError::Corrupt)
        }
    }

    fn indexed<T>(&mut self, count: usize, from: fn(u8) -> T) -> Result<T, PresetError> {
        let index = self.u8();
        if (index as usize) < count {
            Ok(from(index))
        } else {
            Err(PresetError::Corrupt)
        }
    }

    fn flag(&mut self) -> Result<bool, PresetError> {
        match self.u8() {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(PresetError::Corrupt),
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
