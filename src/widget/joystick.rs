use tracing::trace;

use super::{normalize_axis, Control, Notifier, Widget};
use crate::input::{Element, GestureHandler, GestureSurface, Point, PointerEvent};

// Knob radius as a fraction of the half-extent of the smaller element side
const KNOB_RATIO: f32 = 0.25;

// Normalized stick deflection, each axis in [-100, 100], y positive up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StickVector {
    pub x: i32,
    pub y: i32,
}

impl StickVector {
    pub const CENTER: StickVector = StickVector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// 2D analog stick
pub struct JoyStick {
    surface: GestureSurface,

    // Knob position relative to the element, None while resting at the center
    position: Option<Point>,

    knob_radius: Option<f32>,

    pub auto_return_to_center: bool,

    on_change: Notifier<StickVector>,
}

impl JoyStick {
    pub fn new(element: Element) -> Self {
        Self {
            surface: GestureSurface::new(element, true),
            position: None,
            knob_radius: None,
            auto_return_to_center: true,
            on_change: Notifier::with_last(StickVector::CENTER),
        }
    }

    // Fixes the knob radius instead of deriving it from the element size
    pub fn with_knob_radius(mut self, radius: f32) -> Self {
        self.knob_radius = Some(radius.max(0.0));
        self
    }

    pub fn with_auto_return(mut self, auto_return_to_center: bool) -> Self {
        self.auto_return_to_center = auto_return_to_center;
        self
    }

    pub fn knob_radius(&self) -> f32 {
        match self.knob_radius {
            Some(radius) => radius,
            None => {
                let element = self.surface.element();
                (element.width().min(element.height()) / 2.0 * KNOB_RATIO).ceil()
            }
        }
    }

    pub fn center(&self) -> Point {
        let element = self.surface.element();
        Point::new(element.width() / 2.0, element.height() / 2.0)
    }

    // Current knob position relative to the element
    pub fn position(&self) -> Point {
        self.position.unwrap_or_else(|| self.center())
    }

    pub fn is_pressed(&self) -> bool {
        self.surface.is_pressed()
    }

    // Keeps the whole knob inside the element
    fn restrict(&self, point: Point) -> Point {
        let element = self.surface.element();
        let knob = self.knob_radius();
        Point::new(
            point.x.max(knob).min(element.width() - knob),
            point.y.max(knob).min(element.height() - knob),
        )
    }

    fn normalized(&self) -> StickVector {
        let element = self.surface.element();
        let knob = self.knob_radius();
        let offset = self.position() - self.center();

        let axis = |delta: f32, extent: f32| {
            let range = extent / 2.0 - knob;
            if range <= 0.0 {
                return 0;
            }
            normalize_axis(delta / range)
        };

        // Screen y grows downwards, stick y grows upwards
        StickVector::new(
            axis(offset.x, element.width()),
            -axis(offset.y, element.height()),
        )
    }

    fn move_knob(&mut self, point: Point) {
        self.position = Some(self.restrict(point));
        let value = self.normalized();
        if self.on_change.notify(value) {
            trace!("Joystick moved to {:?}", value);
        }
    }
}

impl GestureHandler for JoyStick {
    fn on_press(&mut self, point: Point) {
        self.move_knob(point);
    }

    fn on_move(&mut self, point: Point) {
        self.move_knob(point);
    }

    fn on_release(&mut self, point: Point) {
        self.position = if self.auto_return_to_center {
            None
        } else {
            Some(self.restrict(point))
        };
        let value = self.normalized();
        self.on_change.force(value);
    }
}

impl Control for JoyStick {
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
        let value = self.normalized();
        self.on_change.force(value);
    }
}

impl Widget for JoyStick {
    type Value = StickVector;

    fn value(&self) -> StickVector {
        self.normalized()
    }

    fn on_change(&mut self) -> &mut Notifier<StickVector> {
        &mut self.on_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Bounds, Touch};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stick() -> (JoyStick, Rc<RefCell<Vec<StickVector>>>) {
        let element = Element::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let mut stick = JoyStick::new(element).with_knob_radius(12.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        stick.subscribe(move |value| sink.borrow_mut().push(*value));
        (stick, seen)
    }

    #[test]
    fn press_move_release_scenario() {
        let (mut stick, seen) = stick();

        stick.handle_pointer(&PointerEvent::MouseDown(Point::new(50.0, 50.0)));
        assert_eq!(stick.value(), StickVector::CENTER);

        stick.handle_pointer(&PointerEvent::MouseMove(Point::new(88.0, 50.0)));
        assert_eq!(stick.value(), StickVector::new(100, 0));

        stick.handle_pointer(&PointerEvent::MouseUp(Point::new(88.0, 50.0)));
        assert_eq!(stick.value(), StickVector::CENTER);

        // Press at the center is not a change; the release always notifies
        assert_eq!(
            *seen.borrow(),
            vec![StickVector::new(100, 0), StickVector::CENTER]
        );
    }

    #[test]
    fn y_axis_is_inverted() {
        let (mut stick, _) = stick();

        stick.handle_pointer(&PointerEvent::MouseDown(Point::new(50.0, 31.0)));
        assert_eq!(stick.value(), StickVector::new(0, 50));

        stick.handle_pointer(&PointerEvent::MouseMove(Point::new(50.0, 69.0)));
        assert_eq!(stick.value(), StickVector::new(0, -50));
    }

    #[test]
    fn knob_stays_inside_element_and_values_stay_in_range() {
        let (mut stick, seen) = stick();

        stick.handle_pointer(&PointerEvent::MouseDown(Point::new(50.0, 50.0)));
        for (x, y) in [(-500.0, -500.0), (1000.0, 3.0), (7.0, 900.0), (99.0, 1.0)] {
            stick.handle_pointer(&PointerEvent::MouseMove(Point::new(x, y)));
            let position = stick.position();
            assert!(position.x >= 12.0 && position.x <= 88.0);
            assert!(position.y >= 12.0 && position.y <= 88.0);
        }

        for value in seen.borrow().iter() {
            assert!((-100..=100).contains(&value.x));
            assert!((-100..=100).contains(&value.y));
        }
        assert_eq!(stick.value(), StickVector::new(100, 100));
    }

    #[test]
    fn release_recenters_from_any_position() {
        for (x, y) in [(0.0, 0.0), (99.0, 99.0), (20.0, 80.0)] {
            let (mut stick, _) = stick();
            stick.handle_pointer(&PointerEvent::TouchStart(vec![Touch::new(
                3,
                Point::new(x, y),
            )]));
            stick.handle_pointer(&PointerEvent::TouchEnd(vec![Touch::new(
                3,
                Point::new(x, y),
            )]));
            assert_eq!(stick.value(), StickVector::CENTER);
        }
    }

    #[test]
    fn release_without_auto_return_keeps_deflection() {
        let (stick, _) = stick();
        let mut stick = stick.with_auto_return(false);

        stick.handle_pointer(&PointerEvent::MouseDown(Point::new(88.0, 50.0)));
        stick.handle_pointer(&PointerEvent::MouseUp(Point::new(88.0, 50.0)));
        assert_eq!(stick.value(), StickVector::new(100, 0));
    }

    #[test]
    fn force_update_pushes_unchanged_value() {
        let (mut stick, seen) = stick();

        stick.force_update();
        stick.force_update();
        assert_eq!(*seen.borrow(), vec![StickVector::CENTER, StickVector::CENTER]);
    }

    #[test]
    fn derived_knob_radius_follows_element_size() {
        let element = Element::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let stick = JoyStick::new(element.clone());
        assert_eq!(stick.knob_radius(), 13.0);

        element.set_bounds(Bounds::new(0.0, 0.0, 200.0, 160.0));
        assert_eq!(stick.knob_radius(), 20.0);
        assert_eq!(stick.center(), Point::new(100.0, 80.0));
    }
}
