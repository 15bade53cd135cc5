/// Debounce state of one button.
///
/// A physical press moves `Idle -> Pending` on the first cycle the button
/// reads down; the navigator consumes it (`Pending -> Consumed`) in that same
/// cycle. The button only returns to `Idle` once released, so holding it
/// produces exactly one press however many cycles it stays down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    #[default]
    Idle,
    Pending,
    Consumed,
}

/// One debounced button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Button {
    state: ButtonState,
}

impl Button {
    /// Feed this cycle's level. Returns `true` exactly once per press.
    pub fn update(&mut self, down: bool) -> bool {
        if !down {
            self.state = ButtonState::Idle;
            return false;
        }
        if self.state == ButtonState::Idle {
            self.state = ButtonState::Pending;
        }
        if self.state == ButtonState::Pending {
            self.state = ButtonState::Consumed;
            return true;
        }
        false
    }

    /// `true` while the button is held, whether or not the press was consumed.
    pub fn is_down(&self) -> bool {
        self.state != ButtonState::Idle
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }
}

/// Raw button levels read once per control cycle (`true` = pressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLevels {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

/// What the buttons asked for this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    None,
    /// A pressed alone.
    NextPage,
    /// B pressed alone.
    NextItem,
    /// C pressed alone.
    Action,
    /// B + C chord: randomize the whole patch.
    Randomize,
    /// A + C chord: save the patch to flash.
    Save,
    /// A + B chord: regenerate the sequencer pattern only.
    ShuffleSequence,
}

/// The three panel buttons and chord detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons {
    pub a: Button,
    pub b: Button,
    pub c: Button,
}

impl Buttons {
    /// Debounce one cycle of levels and classify the result.
    ///
    /// A chord fires when both of its buttons are down and at least one of
    /// them was pressed this cycle. When chords overlap, B+C wins over A+C,
    /// which wins over A+B. A cycle that fires a chord reports no single
    /// press.
    pub fn poll(&mut self, levels: ButtonLevels) -> Gesture {
        let pressed_a = self.a.update(levels.a);
        let pressed_b = self.b.update(levels.b);
        let pressed_c = self.c.update(levels.c);

        let (down_a, down_b, down_c) = (self.a.is_down(), self.b.is_down(), self.c.is_down());

        if down_b && down_c && (pressed_b || pressed_c) {
            Gesture::Randomize
        } else if down_a && down_c && (pressed_a || pressed_c) {
            Gesture::Save
        } else if down_a && down_b && (pressed_a || pressed_b) {
            Gesture::ShuffleSequence
        } else if pressed_a {
            Gesture::NextPage
        } else if pressed_b {
            Gesture::NextItem
        } else if pressed_c {
            Gesture::Action
        } else {
            Gesture::None
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
