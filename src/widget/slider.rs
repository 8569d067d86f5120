use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{clamp_axis, normalize_axis, Control, Notifier, Widget};
use crate::input::{Element, GestureHandler, GestureSurface, Point, PointerEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliderOptions {
    pub orientation: Orientation,

    /// Starting value, 0 if unset
    pub initial: Option<i32>,

    /// Rest point for spring mode, the starting value if unset
    pub spring: Option<i32>,
}

/// 1D axis control in [-100, 100].
///
/// With spring mode active the slider snaps back to its rest point on release.
pub struct Slider {
    surface: GestureSurface,
    orientation: Orientation,
    value: i32,
    spring_value: i32,
    spring_mode: bool,
    on_change: Notifier<i32>,
}

impl Slider {
    pub fn new(element: Element, options: SliderOptions) -> Self {
        let value = clamp_axis(options.initial.unwrap_or(0));
        let spring_value = options.spring.map(clamp_axis).unwrap_or(value);

        Self {
            surface: GestureSurface::new(element, true),
            orientation: options.orientation,
            value,
            spring_value,
            spring_mode: false,
            on_change: Notifier::with_last(value),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn spring_value(&self) -> i32 {
        self.spring_value
    }

    pub fn is_spring_mode(&self) -> bool {
        self.spring_mode
    }

    pub fn is_pressed(&self) -> bool {
        self.surface.is_pressed()
    }

    /// Enabling spring mode snaps to the rest point immediately
    pub fn set_spring_mode(&mut self, spring_mode: bool) {
        debug!("Slider spring mode set to {}", spring_mode);
        self.spring_mode = spring_mode;
        if spring_mode {
            self.activate_spring();
        }
    }

    fn activate_spring(&mut self) {
        self.value = self.spring_value;
        self.on_change.force(self.value);
    }

    // Projects the point onto the long axis, element span maps to [-1, 1]
    fn normalized(&self, point: Point) -> i32 {
        let element = self.surface.element();
        let fraction = match self.orientation {
            Orientation::Horizontal => {
                let half = element.width() / 2.0;
                (point.x - half) / half
            }
            // Up is positive
            Orientation::Vertical => {
                let half = element.height() / 2.0;
                -(point.y - half) / half
            }
        };
        normalize_axis(fraction)
    }

    fn track(&mut self, point: Point) {
        self.value = self.normalized(point);
        if self.on_change.notify(self.value) {
            trace!("Slider moved to {}", self.value);
        }
    }
}

impl GestureHandler for Slider {
    fn on_press(&mut self, point: Point) {
        self.track(point);
    }

    fn on_move(&mut self, point: Point) {
        self.track(point);
    }

    fn on_release(&mut self, point: Point) {
        self.value = self.normalized(point);
        if self.spring_mode {
            self.activate_spring();
        }
    }
}

impl Control for Slider {
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
        self.on_change.force(self.value);
    }
}

impl Widget for Slider {
    type Value = i32;

    fn value(&self) -> i32 {
        self.value
    }

    fn on_change(&mut self) -> &mut Notifier<i32> {
        &mut self.on_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Bounds;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn slider(
        bounds: Bounds,
        options: SliderOptions,
    ) -> (Slider, Rc<RefCell<Vec<i32>>>) {
        let mut slider = Slider::new(Element::new(bounds), options);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        slider.subscribe(move |value| sink.borrow_mut().push(*value));
        (slider, seen)
    }

    fn horizontal() -> (Slider, Rc<RefCell<Vec<i32>>>) {
        slider(Bounds::new(0.0, 0.0, 200.0, 40.0), SliderOptions::default())
    }

    #[test]
    fn horizontal_press_maps_to_axis_value() {
        let (mut slider, seen) = horizontal();

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        assert_eq!(slider.value(), 50);
        assert_eq!(*seen.borrow(), vec![50]);
    }

    #[test]
    fn vertical_slider_is_positive_upwards() {
        let options = SliderOptions {
            orientation: Orientation::Vertical,
            ..Default::default()
        };
        let (mut slider, _) = slider(Bounds::new(0.0, 0.0, 40.0, 200.0), options);

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(20.0, 50.0)));
        assert_eq!(slider.value(), 50);
        slider.handle_pointer(&PointerEvent::MouseMove(Point::new(20.0, 200.0)));
        assert_eq!(slider.value(), -100);
    }

    #[test]
    fn values_are_clamped_to_range() {
        let (mut slider, seen) = horizontal();

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(100.0, 20.0)));
        for x in [-400.0, 1000.0, 3.0, 199.0] {
            slider.handle_pointer(&PointerEvent::MouseMove(Point::new(x, 20.0)));
            assert!((-100..=100).contains(&slider.value()));
        }
        assert!(seen.borrow().iter().all(|v| (-100..=100).contains(v)));
    }

    #[test]
    fn press_at_current_value_does_not_notify() {
        let options = SliderOptions {
            initial: Some(50),
            ..Default::default()
        };
        let (mut slider, seen) = slider(Bounds::new(0.0, 0.0, 200.0, 40.0), options);

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        assert_eq!(slider.value(), 50);
        assert!(seen.borrow().is_empty());

        slider.handle_pointer(&PointerEvent::MouseMove(Point::new(100.0, 20.0)));
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn unchanged_moves_do_not_notify() {
        let (mut slider, seen) = horizontal();

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        slider.handle_pointer(&PointerEvent::MouseMove(Point::new(150.2, 25.0)));
        slider.handle_pointer(&PointerEvent::MouseMove(Point::new(160.0, 25.0)));
        assert_eq!(*seen.borrow(), vec![50, 60]);
    }

    #[test]
    fn release_without_spring_keeps_position_silently() {
        let (mut slider, seen) = horizontal();

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        slider.handle_pointer(&PointerEvent::MouseUp(Point::new(170.0, 20.0)));
        assert_eq!(slider.value(), 70);
        assert_eq!(*seen.borrow(), vec![50]);
    }

    #[test]
    fn spring_mode_snaps_on_enable_and_release() {
        let options = SliderOptions {
            initial: Some(20),
            spring: Some(-10),
            ..Default::default()
        };
        let (mut slider, seen) = slider(Bounds::new(0.0, 0.0, 200.0, 40.0), options);
        assert_eq!(slider.value(), 20);

        slider.set_spring_mode(true);
        assert_eq!(slider.value(), -10);

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        slider.handle_pointer(&PointerEvent::MouseUp(Point::new(150.0, 20.0)));
        assert_eq!(slider.value(), -10);

        assert_eq!(*seen.borrow(), vec![-10, 50, -10]);
    }

    #[test]
    fn disabling_spring_mode_has_no_immediate_effect() {
        let (mut slider, seen) = horizontal();

        slider.handle_pointer(&PointerEvent::MouseDown(Point::new(150.0, 20.0)));
        slider.set_spring_mode(false);
        assert_eq!(slider.value(), 50);
        assert_eq!(*seen.borrow(), vec![50]);
    }

    #[test]
    fn spring_defaults_to_initial_value() {
        let options = SliderOptions {
            initial: Some(250),
            ..Default::default()
        };
        let slider = Slider::new(Element::default(), options);
        assert_eq!(slider.value(), 100);
        assert_eq!(slider.spring_value(), 100);
    }
}
