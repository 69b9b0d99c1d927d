/// Edge-triggered state: tracks a value and fires a hook only when it changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<T> {
    state: T,
}

impl<T: Copy + PartialEq> Transition<T> {
    pub const fn new(initial: T) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> T {
        self.state
    }

    /// Move to `next`, calling `on_transition(previous, next)` if the state changed.
    ///
    /// Returns true if a transition happened.
    pub fn update(&mut self, next: T, on_transition: impl FnOnce(T, T)) -> bool {
        if next == self.state {
            return false;
        }

        let previous = self.state;
        self.state = next;
        on_transition(previous, next);
        true
    }
}
