//! Control widgets
//!
//! Each widget owns a normalized value domain and notifies subscribers when the value
//! changes:
//!
//! - [`joystick::JoyStick`] - 2D stick vector, each axis in [-100, 100]
//! - [`slider::Slider`] - 1D value in [-100, 100] with optional spring mode
//! - [`button::Button`] - momentary, level-triggered boolean
//! - [`toggle_button::ToggleButton`] - latched, edge-triggered boolean
//!
//! Notification is composed, not inherited: every widget embeds a [`Notifier`] over
//! its own value type and exposes it through the [`Widget`] trait. The object-safe
//! [`Control`] trait is what the control board and the session manager hold on to.

pub mod button;
pub mod joystick;
pub mod slider;
pub mod toggle_button;

use std::fmt::Debug;

use crate::input::{Element, MoveListener, PointerEvent};

pub use button::Button;
pub use joystick::{JoyStick, StickVector};
pub use slider::{Orientation, Slider, SliderOptions};
pub use toggle_button::ToggleButton;

/// Magnitude of the normalized value range shared by all axis widgets
pub const AXIS_RANGE: i32 = 100;

/// Rounds a normalized fraction to the integer axis range, clamped to [-100, 100]
pub fn normalize_axis(fraction: f32) -> i32 {
    let scaled = (fraction * AXIS_RANGE as f32).round();
    if scaled.is_nan() {
        return 0;
    }
    (scaled as i32).clamp(-AXIS_RANGE, AXIS_RANGE)
}

pub fn clamp_axis(value: i32) -> i32 {
    value.clamp(-AXIS_RANGE, AXIS_RANGE)
}

type Subscriber<T> = Box<dyn FnMut(&T)>;

/// Observer list for one widget value.
///
/// Remembers the last pushed value so [`Notifier::notify`] can suppress repeats,
/// while [`Notifier::force`] always reaches every subscriber.
pub struct Notifier<T> {
    subscribers: Vec<Subscriber<T>>,
    last: Option<T>,
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            last: None,
        }
    }
}

impl<T: Clone + PartialEq> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a resting value; a first `notify` of the same value is suppressed
    pub fn with_last(value: T) -> Self {
        Self {
            subscribers: Vec::new(),
            last: Some(value),
        }
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&T) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Pushes `value` only if it differs from the last pushed value
    pub fn notify(&mut self, value: T) -> bool {
        if self.last.as_ref() == Some(&value) {
            return false;
        }
        self.force(value);
        true
    }

    /// Pushes `value` unconditionally
    pub fn force(&mut self, value: T) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&value);
        }
        self.last = Some(value);
    }
}

/// Widget-specific half of the control interface, typed over the widget's value
pub trait Widget: Control {
    type Value: Clone + PartialEq + Debug + 'static;

    /// Current normalized value
    fn value(&self) -> Self::Value;

    fn on_change(&mut self) -> &mut Notifier<Self::Value>;

    fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&Self::Value) + 'static,
        Self: Sized,
    {
        self.on_change().subscribe(subscriber);
    }
}

/// Object-safe interface every on-screen control implements
pub trait Control {
    fn element(&self) -> &Element;

    /// Whether the control wants debounced move events
    fn tracks_movement(&self) -> bool;

    /// Handles a raw press, move or release event
    fn handle_pointer(&mut self, event: &PointerEvent);

    /// Pushes the current value to every subscriber regardless of change
    fn force_update(&mut self);
}

impl<C: Control> MoveListener for C {
    fn on_move(&mut self, event: &PointerEvent) {
        self.handle_pointer(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn notify_suppresses_repeats_but_force_does_not() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = Notifier::new();
        let sink = seen.clone();
        notifier.subscribe(move |value: &i32| sink.borrow_mut().push(*value));

        assert!(notifier.notify(5));
        assert!(!notifier.notify(5));
        notifier.force(5);
        assert!(notifier.notify(6));

        assert_eq!(*seen.borrow(), vec![5, 5, 6]);
        assert_eq!(notifier.last(), Some(&6));
    }

    #[test]
    fn seeded_notifier_suppresses_its_resting_value() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = Notifier::with_last(0);
        let sink = seen.clone();
        notifier.subscribe(move |value: &i32| sink.borrow_mut().push(*value));

        assert!(!notifier.notify(0));
        assert!(notifier.notify(3));
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn normalize_rounds_half_away_from_zero_and_clamps() {
        assert_eq!(normalize_axis(0.125), 13);
        assert_eq!(normalize_axis(-0.125), -13);
        assert_eq!(normalize_axis(0.5), 50);
        assert_eq!(normalize_axis(1.7), 100);
        assert_eq!(normalize_axis(-3.0), -100);
        assert_eq!(normalize_axis(f32::NAN), 0);
        assert_eq!(clamp_axis(250), 100);
    }
}
