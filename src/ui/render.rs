use eframe::egui::{
    Align2, Color32, CornerRadius, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2,
};

use crate::input::Bounds;
use crate::layout::{ControlView, PlacedControl};
use crate::widget::{JoyStick, Orientation, Slider, Widget, AXIS_RANGE};

const OUTLINE: Color32 = Color32::from_rgb(90, 90, 100);
const KNOB: Color32 = Color32::from_rgb(70, 130, 200);
const KNOB_PRESSED: Color32 = Color32::from_rgb(110, 170, 240);
const ACTIVE: Color32 = Color32::from_rgb(60, 150, 90);
const SPRING_MARKER: Color32 = Color32::from_rgb(200, 160, 60);
const LABEL: Color32 = Color32::from_gray(220);

pub fn paint_control(painter: &Painter, control: &PlacedControl) {
    let rect = to_rect(control.element.bounds());
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return;
    }

    match &control.view {
        ControlView::Joystick(stick) => paint_joystick(painter, rect, &stick.borrow()),
        ControlView::Slider(slider) => paint_slider(painter, rect, &slider.borrow()),
        ControlView::Button { widget, label } => {
            paint_button(painter, rect, widget.borrow().value(), label)
        }
        ControlView::Toggle { widget, label } => {
            paint_button(painter, rect, widget.borrow().value(), label)
        }
    }
}

fn paint_joystick(painter: &Painter, rect: Rect, stick: &JoyStick) {
    painter.rect_stroke(
        rect,
        CornerRadius::same(8),
        Stroke::new(2.0, OUTLINE),
        StrokeKind::Inside,
    );

    let center = rect.center();
    painter.line_segment(
        [Pos2::new(rect.left(), center.y), Pos2::new(rect.right(), center.y)],
        Stroke::new(1.0, OUTLINE),
    );
    painter.line_segment(
        [Pos2::new(center.x, rect.top()), Pos2::new(center.x, rect.bottom())],
        Stroke::new(1.0, OUTLINE),
    );

    let position = stick.position();
    let knob = rect.min + Vec2::new(position.x, position.y);
    let color = if stick.is_pressed() { KNOB_PRESSED } else { KNOB };
    painter.circle_filled(knob, stick.knob_radius(), color);
}

fn paint_slider(painter: &Painter, rect: Rect, slider: &Slider) {
    painter.rect_stroke(
        rect,
        CornerRadius::same(4),
        Stroke::new(2.0, OUTLINE),
        StrokeKind::Inside,
    );

    let handle = |value: i32| -> [Pos2; 2] {
        // [-100, 100] onto [0, 1] along the long axis
        let fraction = (value + AXIS_RANGE) as f32 / (2 * AXIS_RANGE) as f32;
        match slider.orientation() {
            Orientation::Horizontal => {
                let x = rect.left() + fraction * rect.width();
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())]
            }
            Orientation::Vertical => {
                let y = rect.bottom() - fraction * rect.height();
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)]
            }
        }
    };

    if slider.is_spring_mode() {
        painter.line_segment(handle(slider.spring_value()), Stroke::new(1.0, SPRING_MARKER));
    }

    let color = if slider.is_pressed() { KNOB_PRESSED } else { KNOB };
    painter.line_segment(handle(slider.value()), Stroke::new(6.0, color));
}

fn paint_button(painter: &Painter, rect: Rect, active: bool, label: &str) {
    if active {
        painter.rect_filled(rect, CornerRadius::same(6), ACTIVE);
    }
    painter.rect_stroke(
        rect,
        CornerRadius::same(6),
        Stroke::new(2.0, OUTLINE),
        StrokeKind::Inside,
    );

    let size = (rect.height() * 0.4).clamp(10.0, 32.0);
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        label,
        FontId::proportional(size),
        LABEL,
    );
}

pub fn to_rect(bounds: Bounds) -> Rect {
    Rect::from_min_size(
        Pos2::new(bounds.left, bounds.top),
        Vec2::new(bounds.width, bounds.height),
    )
}

pub fn to_bounds(rect: Rect) -> Bounds {
    Bounds::new(rect.left(), rect.top(), rect.width(), rect.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_and_rects_agree() {
        let bounds = Bounds::new(10.0, 20.0, 300.0, 150.0);
        let rect = to_rect(bounds);
        assert_eq!(rect.min, Pos2::new(10.0, 20.0));
        assert_eq!(rect.max, Pos2::new(310.0, 170.0));
        assert_eq!(to_bounds(rect), bounds);
    }
}
