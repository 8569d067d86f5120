use tracing::trace;

use super::{Control, Notifier, Widget};
use crate::input::{Element, GestureHandler, GestureSurface, Point, PointerEvent};

// Momentary button, true exactly while the surface is pressed
pub struct Button {
    surface: GestureSurface,
    is_pressed: bool,
    on_change: Notifier<bool>,
}

impl Button {
    pub fn new(element: Element) -> Self {
        Self {
            surface: GestureSurface::new(element, false),
            is_pressed: false,
            on_change: Notifier::new(),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    fn set_pressed(&mut self, is_pressed: bool) {
        trace!("Button pressed: {}", is_pressed);
        self.is_pressed = is_pressed;
        self.on_change.force(is_pressed);
    }
}

impl GestureHandler for Button {
    fn on_press(&mut self, _point: Point) {
        self.set_pressed(true);
    }

    fn on_release(&mut self, _point: Point) {
        self.set_pressed(false);
    }
}

impl Control for Button {
    fn element(&self) -> &Element {
        self.surface.element()
    }

    fn tracks_movement(&self) -> bool {
        self.surface.tracks_movement()
    }

    fn handle_pointer(&mut self, event: &PointerEvent) {
        if let Some(gesture) = self.surface.translate(event) {
            self.dispatch(gesture);
        }
    }

    fn force_update(&mut self) {
        self.on_change.force(self.is_pressed);
    }
}

impl Widget for Button {
    type Value = bool;

    fn value(&self) -> bool {
        self.is_pressed
    }

    fn on_change(&mut self) -> &mut Notifier<bool> {
        &mut self.on_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Bounds, Touch};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn button() -> (Button, Rc<RefCell<Vec<bool>>>) {
        let mut button = Button::new(Element::new(Bounds::new(0.0, 0.0, 50.0, 50.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        button.subscribe(move |value| sink.borrow_mut().push(*value));
        (button, seen)
    }

    #[test]
    fn level_follows_press_and_release() {
        let (mut button, seen) = button();

        button.handle_pointer(&PointerEvent::MouseDown(Point::new(10.0, 10.0)));
        assert!(button.value());
        button.handle_pointer(&PointerEvent::MouseMove(Point::new(80.0, 10.0)));
        assert!(button.value());
        // Released outside the element
        button.handle_pointer(&PointerEvent::MouseUp(Point::new(80.0, 10.0)));
        assert!(!button.value());

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn force_update_repeats_current_level() {
        let (mut button, seen) = button();

        button.force_update();
        button.handle_pointer(&PointerEvent::TouchStart(vec![Touch::new(
            1,
            Point::new(5.0, 5.0),
        )]));
        button.force_update();
        assert_eq!(*seen.borrow(), vec![false, true, true]);
    }

    #[test]
    fn foreign_touch_end_does_not_release() {
        let (mut button, _) = button();

        button.handle_pointer(&PointerEvent::TouchStart(vec![Touch::new(
            1,
            Point::new(5.0, 5.0),
        )]));
        button.handle_pointer(&PointerEvent::TouchEnd(vec![Touch::new(
            2,
            Point::new(5.0, 5.0),
        )]));
        assert!(button.value());
    }
}
