//! One control-plane cycle.
//!
//! [`ControlPlane`] owns everything the consumer side needs that is not
//! part of the shared [`Voice`]: the navigator, the entry anchors, the
//! random source, the kernel's control half, the button hardware and the
//! preset store. [`ControlPlane::cycle`] is the whole per-token pass;
//! [`ControlPlane::tick`] wraps it with the shared-state lock and runs any
//! requested save after the lock is released.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_storage::nor_flash::NorFlash;

use crate::entry::EntryAnchors;
use crate::kernel::{ControlKernel, FrontPanel};
use crate::messenger::{SharedScreen, SharedVoice};
use crate::preset::{FlashGuard, Preset, PresetError, PresetStore};
use crate::randomize::{randomize_patch, shuffle_sequence, PatchRng};
use crate::ui::{Command, Navigator, Page, Screen};
use crate::voice::{Voice, OSCILLATORS};

/// Consumer-side state and collaborators.
pub struct ControlPlane<K, P, F, G> {
    nav: Navigator,
    anchors: EntryAnchors,
    rng: PatchRng,
    kernel: K,
    panel: P,
    store: PresetStore<F, G>,
    loops: [bool; OSCILLATORS],
    screen: Screen,
}

impl<K, P, F, G> ControlPlane<K, P, F, G>
where
    K: ControlKernel,
    P: FrontPanel,
    F: NorFlash,
    G: FlashGuard,
{
    pub fn new(kernel: K, panel: P, store: PresetStore<F, G>, rng: PatchRng) -> Self {
        Self {
            nav: Navigator::new(),
            anchors: EntryAnchors::new(),
            rng,
            kernel,
            panel,
            store,
            loops: [false; OSCILLATORS],
            screen: Screen::Splash,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    /// Snapshot for the display, as of the end of the last cycle.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    // ── Boot ─────────────────────────────────────────────────────────

    /// Load the saved preset into `voice`, if there is one.
    ///
    /// A blank, unknown-version or corrupt record leaves the default patch
    /// in place. Flash is read outside the shared-state lock.
    pub fn boot<M: RawMutex>(&mut self, voice: &SharedVoice<M>) -> Result<(), PresetError> {
        let result = self.store.read();
        match result {
            Ok(preset) => {
                voice.lock(|v| preset.apply_to(&mut v.borrow_mut()));
                #[cfg(feature = "defmt")]
                defmt::info!("preset loaded");
            }
            Err(PresetError::Blank) => {
                #[cfg(feature = "defmt")]
                defmt::info!("no preset saved, using default patch");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("preset not loaded: {}", _e);
            }
        }
        voice.lock(|v| self.track_feedback(&v.borrow()));
        result.map(|_| ())
    }

    // ── Per-token pass ───────────────────────────────────────────────

    /// Run one cycle against the shared state, then save if asked to.
    ///
    /// A save publishes [`Screen::Saving`] to `screen` before the flash is
    /// touched, since the write holds up the display for its duration.
    pub fn tick<M: RawMutex>(&mut self, voice: &SharedVoice<M>, screen: &SharedScreen<M>) {
        let pending = voice.lock(|v: &RefCell<Voice>| self.cycle(&mut v.borrow_mut()));
        if let Some(preset) = pending {
            screen.lock(|s| s.set(Screen::Saving));
            // Already logged; the patch stays live either way.
            let _ = self.save(&preset);
        }
    }

    /// One control-plane cycle on `voice`.
    ///
    /// Buttons, knob routing, derivation and routing, then any chord
    /// command, then the kernel's refresh and modulation tick. Returns the
    /// snapshot to persist when the save chord fired; the caller writes it
    /// once it no longer holds `voice`.
    pub fn cycle(&mut self, voice: &mut Voice) -> Option<Preset> {
        let command = self.nav.handle_buttons(self.panel.buttons(), voice);

        self.nav.route_knobs(voice, &mut self.anchors);
        voice.derive();
        voice.resolve_routing();

        let mut pending = None;
        match command {
            Command::None => {}
            Command::Randomize => {
                randomize_patch(voice, &mut self.nav, &mut self.rng, &mut self.kernel);
            }
            Command::ShuffleSequence => {
                shuffle_sequence(voice, &mut self.rng, &mut self.kernel);
                self.nav.jump_to(Page::Sequence, self.nav.item());
            }
            Command::Save => pending = Some(Preset::from_voice(voice)),
        }

        self.track_feedback(voice);

        self.kernel.refresh_parameters(voice);
        self.kernel.tick_modulation_graph(voice);

        self.screen = if pending.is_some() {
            Screen::Saving
        } else {
            Screen::build(&self.nav, voice)
        };
        pending
    }

    /// Persist `preset`. Failures are logged, never fatal.
    pub fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
        #[cfg(feature = "defmt")]
        defmt::info!("saving preset ({} sectors)", self.store.sectors_per_save());

        let result = self.store.save(preset);
        match result {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("preset saved");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("preset save failed: {}", _e);
            }
        }
        result
    }

    fn track_feedback(&mut self, voice: &Voice) {
        let loops = voice.routing.feedback_loops();
        if loops != self.loops {
            #[cfg(feature = "defmt")]
            {
                if loops.iter().any(|&l| l) {
                    defmt::warn!("modulation feedback loop through oscillators {}", loops);
                } else {
                    defmt::info!("modulation feedback cleared");
                }
            }
            self.loops = loops;
        }
    }

    /// Oscillators currently on a modulation cycle, as last observed.
    pub fn feedback_loops(&self) -> [bool; OSCILLATORS] {
        self.loops
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::preset::{CriticalSectionGuard, MemFlash};
    use crate::routing::Source;
    use crate::ui::ButtonLevels;
    use crate::FlashLayout;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use core::cell::Cell;
    use embassy_sync::blocking_mutex::Mutex;

    /// Kernel that counts calls and leaves the pots where the test put them.
    #[derive(Default)]
    pub(crate) struct CountingKernel {
        pub refreshes: usize,
        pub ticks: usize,
    }

    impl ControlKernel for CountingKernel {
        fn refresh_parameters(&mut self, _voice: &mut Voice) {
            self.refreshes += 1;
        }

        fn tick_modulation_graph(&mut self, _voice: &mut Voice) {
            self.ticks += 1;
        }
    }

    /// Buttons held at whatever the test sets.
    #[derive(Default)]
    pub(crate) struct HeldPanel {
        pub levels: ButtonLevels,
    }

    impl FrontPanel for HeldPanel {
        fn buttons(&mut self) -> ButtonLevels {
            self.levels
        }
    }

    /// Records the published screen at the moment the flash is entered.
    pub(crate) struct ScreenWatch<'a> {
        pub screen: &'a SharedScreen<NoopRawMutex>,
        pub seen: &'a Cell<Option<Screen>>,
    }

    impl FlashGuard for ScreenWatch<'_> {
        fn exclusive<R>(&mut self, f: impl FnOnce() -> R) -> R {
            self.seen.set(Some(self.screen.lock(|s| s.get())));
            f()
        }
    }

    pub(crate) type TestPlane =
        ControlPlane<CountingKernel, HeldPanel, MemFlash, CriticalSectionGuard>;

    pub(crate) fn plane() -> TestPlane {
        let layout = FlashLayout {
            target_offset: 4096,
            page_size: 256,
        };
        ControlPlane::new(
            CountingKernel::default(),
            HeldPanel::default(),
            PresetStore::new(MemFlash::new(), layout),
            PatchRng::from_seed(42),
        )
    }

    fn press(plane: &mut TestPlane, voice: &mut Voice, levels: ButtonLevels) -> Option<Preset> {
        plane.panel_mut().levels = levels;
        let pending = plane.cycle(voice);
        plane.panel_mut().levels = ButtonLevels::default();
        plane.cycle(voice);
        pending
    }

    const A: ButtonLevels = ButtonLevels { a: true, b: false, c: false };
    const AB: ButtonLevels = ButtonLevels { a: true, b: true, c: false };
    const AC: ButtonLevels = ButtonLevels { a: true, b: false, c: true };
    const BC: ButtonLevels = ButtonLevels { a: false, b: true, c: true };

    // ── Cycle ────────────────────────────────────────────────────────

    #[test]
    fn every_cycle_refreshes_and_ticks_the_kernel() {
        let mut plane = plane();
        let mut voice = Voice::new();
        for _ in 0..3 {
            plane.cycle(&mut voice);
        }
        assert_eq!(plane.kernel().refreshes, 3);
        assert_eq!(plane.kernel().ticks, 3);
    }

    #[test]
    fn splash_until_first_a_press() {
        let mut plane = plane();
        let mut voice = Voice::new();
        plane.cycle(&mut voice);
        assert_eq!(plane.screen(), Screen::Splash);

        press(&mut plane, &mut voice, A);
        assert_eq!(plane.navigator().page(), Page::Tune);
        assert_eq!(plane.screen().page_index(), 0);
    }

    #[test]
    fn selector_edits_are_resolved_in_the_same_cycle() {
        let mut plane = plane();
        let mut voice = Voice::new();
        voice.cv[0].source = Source::Sequencer;
        plane.cycle(&mut voice);
        assert_eq!(voice.routing.am[0], Source::Sequencer);
    }

    #[test]
    fn knob_edits_flow_into_derived_values() {
        let mut plane = plane();
        let mut voice = Voice::new();
        press(&mut plane, &mut voice, A); // splash -> tune
        press(&mut plane, &mut voice, A); // tune -> amp

        // Column 0 on the amp page edits oscillator A's amplitude.
        voice.pots[0] = 1024;
        plane.cycle(&mut voice);
        assert_eq!(voice.entries[crate::voice::ENTRY_AMP], 2048 + 1024);
        assert_eq!(voice.oscillators[0].amp, 0.75);
    }

    // ── Chords ───────────────────────────────────────────────────────

    #[test]
    fn randomize_chord_resets_navigation() {
        let mut plane = plane();
        let mut voice = Voice::new();
        for _ in 0..4 {
            press(&mut plane, &mut voice, A);
        }
        assert_eq!(plane.navigator().page(), Page::Sequence);

        let before = voice;
        press(&mut plane, &mut voice, BC);
        assert_eq!(plane.navigator().page(), Page::Tune);
        assert_eq!(plane.navigator().item(), 0);
        assert_ne!(voice.entries, before.entries);
        assert_eq!(voice.routing, crate::routing::Routing::resolve(&voice.cv));
    }

    #[test]
    fn shuffle_chord_jumps_to_sequence_page() {
        let mut plane = plane();
        let mut voice = Voice::new();
        press(&mut plane, &mut voice, A);
        let before = voice;
        press(&mut plane, &mut voice, AB);
        assert_eq!(plane.navigator().page(), Page::Sequence);
        assert_ne!(voice.sequencer.codes, before.sequencer.codes);
        assert_eq!(voice.entries, before.entries);
    }

    #[test]
    fn save_chord_returns_snapshot_and_shows_saving() {
        let mut plane = plane();
        let mut voice = Voice::new();
        plane.panel_mut().levels = AC;
        let pending = plane.cycle(&mut voice);
        assert_eq!(pending, Some(Preset::from_voice(&voice)));
        assert_eq!(plane.screen(), Screen::Saving);
    }

    // ── Shared state ─────────────────────────────────────────────────

    #[test]
    fn tick_saves_and_boot_restores() {
        let shared: SharedVoice<NoopRawMutex> = Mutex::new(RefCell::new(Voice::new()));
        let screen: SharedScreen<NoopRawMutex> = Mutex::new(Cell::new(Screen::Splash));
        let mut plane = plane();

        shared.lock(|v| {
            let mut v = v.borrow_mut();
            v.sequencer.length = 5;
            v.cv[6].source = Source::OscB;
        });
        plane.panel_mut().levels = AC;
        plane.tick(&shared, &screen);
        let saved = shared.lock(|v| *v.borrow());

        // Fresh plane over the same flash, fresh voice.
        let store = plane.store;
        let mut rebooted = ControlPlane::new(
            CountingKernel::default(),
            HeldPanel::default(),
            store,
            PatchRng::from_seed(1),
        );
        let restored: SharedVoice<NoopRawMutex> = Mutex::new(RefCell::new(Voice::new()));
        assert_eq!(rebooted.boot(&restored), Ok(()));

        let restored = restored.lock(|v| *v.borrow());
        assert_eq!(restored.sequencer.length, 5);
        assert_eq!(restored.routing.fm[1], Source::OscB);
        assert_eq!(Preset::from_voice(&restored), Preset::from_voice(&saved));
    }

    #[test]
    fn saving_screen_is_published_before_flash_is_touched() {
        let shared: SharedVoice<NoopRawMutex> = Mutex::new(RefCell::new(Voice::new()));
        let screen: SharedScreen<NoopRawMutex> = Mutex::new(Cell::new(Screen::Splash));
        let seen = Cell::new(None);
        let layout = FlashLayout {
            target_offset: 4096,
            page_size: 256,
        };
        let guard = ScreenWatch {
            screen: &screen,
            seen: &seen,
        };
        let mut plane = ControlPlane::new(
            CountingKernel::default(),
            HeldPanel { levels: AC },
            PresetStore::with_guard(MemFlash::new(), layout, guard),
            PatchRng::from_seed(7),
        );

        plane.tick(&shared, &screen);
        assert_eq!(seen.get(), Some(Screen::Saving));
        assert_eq!(screen.lock(|s| s.get()), Screen::Saving);
    }

    #[test]
    fn boot_on_blank_flash_keeps_default_patch() {
        let shared: SharedVoice<NoopRawMutex> = Mutex::new(RefCell::new(Voice::new()));
        let mut plane = plane();
        assert_eq!(plane.boot(&shared), Err(PresetError::Blank));
        assert_eq!(shared.lock(|v| *v.borrow()), Voice::new());
    }

    #[test]
    fn feedback_loops_are_tracked() {
        let mut plane = plane();
        let mut voice = Voice::new();
        // A modulates B and B modulates A through AM.
        voice.cv[0].source = Source::OscB;
        voice.cv[1].source = Source::OscA;
        plane.cycle(&mut voice);
        assert_eq!(plane.feedback_loops(), [true, true, false]);

        voice.cv[1].source = Source::Envelope;
        plane.cycle(&mut voice);
        assert_eq!(plane.feedback_loops(), [false, false, false]);
    }
}
