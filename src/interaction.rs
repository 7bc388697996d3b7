use std::time::Duration;

use tracing::trace;

pub const ROTATION_INTERVAL: Duration = Duration::from_millis(400);

/// Cycles through a popup's related images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationTimer {
    interval: Duration,
    elapsed: Duration,
    index: usize,
    len: usize,
}

impl RotationTimer {
    /// `None` when there is nothing to rotate through.
    pub fn new(len: usize, interval: Duration) -> Option<Self> {
        (len > 1 && !interval.is_zero()).then_some(Self {
            interval,
            elapsed: Duration::ZERO,
            index: 0,
            len,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Time left until the next step, for scheduling a repaint.
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.elapsed)
    }

    /// Advances by `dt`; returns the new index when at least one step fired.
    pub fn advance(&mut self, dt: Duration) -> Option<usize> {
        self.elapsed += dt;
        let mut stepped = false;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.index = (self.index + 1) % self.len;
            stepped = true;
        }
        stepped.then_some(self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Hovering {
        target: usize,
    },
    PopupOpen {
        target: usize,
        rotation: Option<RotationTimer>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    PointerEnter(usize),
    /// `onto_popup` keeps an open popup alive while the pointer moves into it.
    PointerLeave { onto_popup: bool },
    Click(usize),
    ClickBackground,
    ClosePopup,
}

/// Per-view hover/popup state machine. Leaving `PopupOpen` always drops its
/// rotation timer, whichever event caused it.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    state: InteractionState,
}

impl Interaction {
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Applies one event; returns whether the state changed.
    pub fn handle(&mut self, event: InteractionEvent) -> bool {
        use InteractionEvent as Event;
        use InteractionState as State;

        let next = match (&self.state, event) {
            (State::Idle | State::Hovering { .. }, Event::PointerEnter(target)) => {
                State::Hovering { target }
            }
            (State::Hovering { .. }, Event::PointerLeave { .. } | Event::ClickBackground) => {
                State::Idle
            }
            (State::Idle | State::Hovering { .. }, Event::Click(target)) => State::PopupOpen {
                target,
                rotation: None,
            },
            (State::PopupOpen { target, .. }, Event::Click(clicked)) if *target != clicked => {
                State::PopupOpen {
                    target: clicked,
                    rotation: None,
                }
            }
            (State::PopupOpen { .. }, Event::PointerLeave { onto_popup: false })
            | (State::PopupOpen { .. }, Event::ClickBackground | Event::ClosePopup) => State::Idle,
            _ => return false,
        };

        if next == self.state {
            return false;
        }
        trace!(from = ?self.state, to = ?next, "interaction transition");
        self.state = next;
        true
    }

    /// The entity to highlight, if any.
    pub fn highlighted(&self) -> Option<usize> {
        match self.state {
            InteractionState::Idle => None,
            InteractionState::Hovering { target } | InteractionState::PopupOpen { target, .. } => {
                Some(target)
            }
        }
    }

    pub fn popup_target(&self) -> Option<usize> {
        match self.state {
            InteractionState::PopupOpen { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_popup_open(&self) -> bool {
        matches!(self.state, InteractionState::PopupOpen { .. })
    }

    pub fn rotation(&self) -> Option<&RotationTimer> {
        match &self.state {
            InteractionState::PopupOpen { rotation, .. } => rotation.as_ref(),
            _ => None,
        }
    }

    /// Starts cycling `len` related images in the open popup. Returns false
    /// when no popup is open or there is nothing to cycle.
    pub fn start_rotation(&mut self, len: usize, interval: Duration) -> bool {
        match &mut self.state {
            InteractionState::PopupOpen { rotation, .. } => {
                *rotation = RotationTimer::new(len, interval);
                rotation.is_some()
            }
            _ => false,
        }
    }

    /// Advances any running timer; returns the rotated index when it moved.
    pub fn advance_timers(&mut self, dt: Duration) -> Option<usize> {
        match &mut self.state {
            InteractionState::PopupOpen {
                rotation: Some(timer),
                ..
            } => timer.advance(dt),
            _ => None,
        }
    }

    /// Teardown: back to idle with every timer dropped.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_with_rotation(target: usize, len: usize) -> Interaction {
        let mut interaction = Interaction::default();
        interaction.handle(InteractionEvent::Click(target));
        assert!(interaction.start_rotation(len, ROTATION_INTERVAL));
        interaction
    }

    #[test]
    fn hover_and_leave() {
        let mut interaction = Interaction::default();
        assert!(interaction.handle(InteractionEvent::PointerEnter(3)));
        assert_eq!(interaction.highlighted(), Some(3));
        assert!(!interaction.handle(InteractionEvent::PointerEnter(3)));
        assert!(interaction.handle(InteractionEvent::PointerLeave { onto_popup: false }));
        assert_eq!(interaction.state(), &InteractionState::Idle);
    }

    #[test]
    fn popup_survives_pointer_moving_onto_it() {
        let mut interaction = Interaction::default();
        interaction.handle(InteractionEvent::PointerEnter(1));
        interaction.handle(InteractionEvent::Click(1));
        assert!(!interaction.handle(InteractionEvent::PointerLeave { onto_popup: true }));
        assert!(!interaction.handle(InteractionEvent::PointerEnter(2)));
        assert_eq!(interaction.popup_target(), Some(1));
        assert_eq!(interaction.highlighted(), Some(1));
    }

    #[test]
    fn every_popup_exit_clears_the_timer() {
        for exit in [
            InteractionEvent::PointerLeave { onto_popup: false },
            InteractionEvent::ClickBackground,
            InteractionEvent::ClosePopup,
        ] {
            let mut interaction = open_with_rotation(4, 3);
            assert!(interaction.rotation().is_some());
            assert!(interaction.handle(exit));
            assert!(interaction.rotation().is_none());
            assert_eq!(interaction.advance_timers(Duration::from_secs(5)), None);
        }

        let mut interaction = open_with_rotation(4, 3);
        assert!(interaction.handle(InteractionEvent::Click(5)));
        assert_eq!(interaction.popup_target(), Some(5));
        assert!(interaction.rotation().is_none());

        let mut interaction = open_with_rotation(4, 3);
        interaction.reset();
        assert!(interaction.rotation().is_none());
        assert!(!interaction.is_popup_open());
    }

    #[test]
    fn clicking_the_open_target_again_keeps_the_timer() {
        let mut interaction = open_with_rotation(4, 3);
        assert!(!interaction.handle(InteractionEvent::Click(4)));
        assert!(interaction.rotation().is_some());
    }

    #[test]
    fn rotation_wraps_around() {
        let mut interaction = open_with_rotation(0, 3);
        assert_eq!(interaction.advance_timers(Duration::from_millis(399)), None);
        assert_eq!(interaction.advance_timers(Duration::from_millis(1)), Some(1));
        assert_eq!(interaction.advance_timers(Duration::from_millis(800)), Some(0));
        assert_eq!(interaction.rotation().map(RotationTimer::index), Some(0));
    }

    #[test]
    fn single_image_does_not_rotate() {
        let mut interaction = Interaction::default();
        interaction.handle(InteractionEvent::Click(0));
        assert!(!interaction.start_rotation(1, ROTATION_INTERVAL));
        assert!(!Interaction::default().start_rotation(5, ROTATION_INTERVAL));
    }
}
