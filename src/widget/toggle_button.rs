use tracing::trace;

use super::{Control, Notifier, Widget};
use crate::input::{Element, PointerEvent};

/// Latched button that flips on every press edge.
///
/// Has no gesture surface: releases and moves are ignored outright, so a press that
/// ends outside the element still toggles exactly once.
pub struct ToggleButton {
    element: Element,
    is_active: bool,

    // Seeded state not yet pushed to subscribers
    needs_sync: bool,

    on_change: Notifier<bool>,
}

impl ToggleButton {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            is_active: false,
            needs_sync: false,
            on_change: Notifier::new(),
        }
    }

    /// Starts from a previously stored state; the first subscriber is synchronized
    /// with it immediately.
    pub fn seeded(element: Element, is_active: bool) -> Self {
        Self {
            element,
            is_active,
            needs_sync: true,
            on_change: Notifier::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn toggle(&mut self) {
        self.is_active = !self.is_active;
        trace!("Toggle button is now {}", self.is_active);
        self.on_change.force(self.is_active);
    }
}

impl Control for ToggleButton {
    fn element(&self) -> &Element {
        &self.element
    }

    fn tracks_movement(&self) -> bool {
        false
    }

    // The host only routes presses that landed inside the element
    fn handle_pointer(&mut self, event: &PointerEvent) {
        if event.is_press() {
            self.toggle();
        }
    }

    fn force_update(&mut self) {
        self.on_change.force(self.is_active);
    }
}

impl Widget for ToggleButton {
    type Value = bool;

    fn value(&self) -> bool {
        self.is_active
    }

    fn on_change(&mut self) -> &mut Notifier<bool> {
        &mut self.on_change
    }

    fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&bool) + 'static,
        Self: Sized,
    {
        self.on_change.subscribe(subscriber);
        if self.needs_sync {
            self.needs_sync = false;
            self.on_change.force(self.is_active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Bounds, Point, Touch};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl FnMut(&bool) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &bool| sink.borrow_mut().push(*value))
    }

    fn element() -> Element {
        Element::new(Bounds::new(0.0, 0.0, 40.0, 40.0))
    }

    #[test]
    fn flips_on_press_only() {
        let mut toggle = ToggleButton::new(element());
        let (seen, subscriber) = recorder();
        toggle.subscribe(subscriber);

        toggle.handle_pointer(&PointerEvent::MouseDown(Point::new(5.0, 5.0)));
        toggle.handle_pointer(&PointerEvent::MouseMove(Point::new(90.0, 5.0)));
        toggle.handle_pointer(&PointerEvent::MouseUp(Point::new(90.0, 5.0)));
        assert!(toggle.value());

        toggle.handle_pointer(&PointerEvent::TouchStart(vec![Touch::new(
            4,
            Point::new(5.0, 5.0),
        )]));
        toggle.handle_pointer(&PointerEvent::TouchEnd(vec![Touch::new(
            4,
            Point::new(5.0, 5.0),
        )]));
        assert!(!toggle.value());

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn seeded_state_syncs_first_subscriber() {
        let mut toggle = ToggleButton::seeded(element(), true);
        let (first, subscriber) = recorder();
        toggle.subscribe(subscriber);
        let (second, subscriber) = recorder();
        toggle.subscribe(subscriber);

        assert_eq!(*first.borrow(), vec![true]);
        assert!(second.borrow().is_empty());

        toggle.force_update();
        assert_eq!(*first.borrow(), vec![true, true]);
        assert_eq!(*second.borrow(), vec![true]);
    }

    #[test]
    fn unseeded_toggle_does_not_notify_on_subscribe() {
        let mut toggle = ToggleButton::new(element());
        let (seen, subscriber) = recorder();
        toggle.subscribe(subscriber);
        assert!(seen.borrow().is_empty());
    }
}
