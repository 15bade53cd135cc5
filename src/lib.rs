//! Control and routing core for the FF three-oscillator synth voice.
//!
//! The voice runs on two cores. Core A renders audio blocks through the DSP
//! kernel and posts one payload-less [`Tick`](messenger::Tick) per block.
//! Core B drains those ticks and, for each one, runs a full control-plane
//! cycle: buttons, knobs, parameter derivation, modulation routing, optional
//! randomization or preset save, then the kernel's refresh and modulation
//! tick.
//!
//! ```text
//!  core A (audio)                         core B (control plane)
//!  ┌──────────────────┐   Tick queue     ┌───────────────────────────────┐
//!  │ AudioKernel      │ ───────────────▶ │ ControlPlane::cycle           │
//!  │  fill_block()    │   (bounded,      │  Navigator → EntryAnchors     │
//!  │ AudioSink.write()│    blocking)     │  Voice::derive → Routing      │
//!  └──────────────────┘                  │  randomize / PresetStore      │
//!           ▲                            └───────────────────────────────┘
//!           └──────── SharedVoice (single writer: core B) ────────┘
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`**: structured logging and `defmt::Format` derives.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod entry;
pub mod kernel;
pub mod messenger;
pub mod preset;
pub mod randomize;
pub mod routing;
pub mod ui;
pub mod voice;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use config::FlashLayout;
pub use control::ControlPlane;
pub use entry::EntryAnchors;
pub use kernel::{AudioKernel, AudioSink, ControlKernel, FrontPanel};
pub use messenger::{AudioProducer, SharedScreen, SharedVoice, Tick, TickChannel};
pub use preset::{Preset, PresetError, PresetStore};
pub use randomize::PatchRng;
pub use routing::{Routing, SignalBank, Source};
pub use ui::{Navigator, Page, Screen};
pub use voice::Voice;
