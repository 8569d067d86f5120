use std::collections::HashSet;

use eframe::egui::{self, PointerButton, Pos2, TouchPhase};
use tracing::trace;

use crate::input::{Point, PointerEvent, Touch, TouchId};

// Turns one frame of raw egui input into page events for the control board.
//
// egui mirrors the first finger as a simulated mouse, so pointer events are ignored in
// any frame that carries touch input and while a finger is down. The one exception is
// the release of a press that came from a real mouse.
#[derive(Debug, Default)]
pub struct EventTranslator {
    active_touches: HashSet<TouchId>,
    mouse_down: bool,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_touching(&self) -> bool {
        !self.active_touches.is_empty()
    }

    pub fn translate_frame(&mut self, events: &[egui::Event]) -> Vec<PointerEvent> {
        let has_touch = events
            .iter()
            .any(|event| matches!(event, egui::Event::Touch { .. }));
        let ignore_pointer = has_touch || self.is_touching();

        let mut out = Vec::new();
        let mut batch = TouchBatch::default();

        for event in events {
            match event {
                egui::Event::Touch { id, phase, pos, .. } => {
                    let touch = Touch::new(id.0, point(*pos));
                    match phase {
                        TouchPhase::Start => {
                            self.active_touches.insert(touch.id);
                        }
                        TouchPhase::End | TouchPhase::Cancel => {
                            self.active_touches.remove(&touch.id);
                        }
                        TouchPhase::Move => {}
                    }
                    batch.push(*phase, touch, &mut out);
                }
                // A real mouse press must still see its release during touch input
                egui::Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: false,
                    ..
                } if ignore_pointer && self.mouse_down => {
                    batch.flush(&mut out);
                    self.mouse_down = false;
                    out.push(PointerEvent::MouseUp(point(*pos)));
                }
                egui::Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } if !ignore_pointer => {
                    batch.flush(&mut out);
                    self.mouse_down = *pressed;
                    out.push(if *pressed {
                        PointerEvent::MouseDown(point(*pos))
                    } else {
                        PointerEvent::MouseUp(point(*pos))
                    });
                }
                egui::Event::PointerMoved(pos) if !ignore_pointer && self.mouse_down => {
                    batch.flush(&mut out);
                    out.push(PointerEvent::MouseMove(point(*pos)));
                }
                _ => {}
            }
        }
        batch.flush(&mut out);

        if !out.is_empty() {
            trace!("Translated {} raw events into {}", events.len(), out.len());
        }
        out
    }
}

// Consecutive touches of the same phase become one multi-touch event
#[derive(Default)]
struct TouchBatch {
    phase: Option<TouchPhase>,
    touches: Vec<Touch>,
}

impl TouchBatch {
    fn push(&mut self, phase: TouchPhase, touch: Touch, out: &mut Vec<PointerEvent>) {
        let phase = match phase {
            TouchPhase::Cancel => TouchPhase::End,
            phase => phase,
        };
        if self.phase != Some(phase) {
            self.flush(out);
            self.phase = Some(phase);
        }
        self.touches.push(touch);
    }

    fn flush(&mut self, out: &mut Vec<PointerEvent>) {
        let Some(phase) = self.phase.take() else {
            return;
        };
        let touches = std::mem::take(&mut self.touches);
        out.push(match phase {
            TouchPhase::Start => PointerEvent::TouchStart(touches),
            TouchPhase::Move => PointerEvent::TouchMove(touches),
            TouchPhase::End | TouchPhase::Cancel => PointerEvent::TouchEnd(touches),
        });
    }
}

fn point(pos: Pos2) -> Point {
    Point::new(pos.x, pos.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{Modifiers, TouchDeviceId};

    fn button(x: f32, y: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: Pos2::new(x, y),
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    fn touch(id: u64, phase: TouchPhase, x: f32, y: f32) -> egui::Event {
        egui::Event::Touch {
            device_id: TouchDeviceId(0),
            id: egui::TouchId(id),
            phase,
            pos: Pos2::new(x, y),
            force: None,
        }
    }

    #[test]
    fn mouse_moves_only_while_pressed() {
        let mut translator = EventTranslator::new();

        let idle = translator.translate_frame(&[egui::Event::PointerMoved(Pos2::new(1.0, 1.0))]);
        assert!(idle.is_empty());

        let events = translator.translate_frame(&[
            button(10.0, 10.0, true),
            egui::Event::PointerMoved(Pos2::new(12.0, 10.0)),
        ]);
        assert_eq!(
            events,
            vec![
                PointerEvent::MouseDown(Point::new(10.0, 10.0)),
                PointerEvent::MouseMove(Point::new(12.0, 10.0)),
            ]
        );

        let events = translator.translate_frame(&[
            button(12.0, 10.0, false),
            egui::Event::PointerMoved(Pos2::new(20.0, 10.0)),
        ]);
        assert_eq!(events, vec![PointerEvent::MouseUp(Point::new(12.0, 10.0))]);
    }

    #[test]
    fn secondary_button_is_ignored() {
        let mut translator = EventTranslator::new();
        let events = translator.translate_frame(&[egui::Event::PointerButton {
            pos: Pos2::new(1.0, 1.0),
            button: PointerButton::Secondary,
            pressed: true,
            modifiers: Modifiers::default(),
        }]);
        assert!(events.is_empty());
    }

    #[test]
    fn simulated_mouse_is_dropped_during_touch() {
        let mut translator = EventTranslator::new();

        let events = translator.translate_frame(&[
            touch(7, TouchPhase::Start, 5.0, 5.0),
            egui::Event::PointerMoved(Pos2::new(5.0, 5.0)),
            button(5.0, 5.0, true),
        ]);
        assert_eq!(
            events,
            vec![PointerEvent::TouchStart(vec![Touch::new(
                7,
                Point::new(5.0, 5.0)
            )])]
        );
        assert!(translator.is_touching());

        // Finger still down, mirrored pointer events without touch input are dropped
        let events = translator.translate_frame(&[egui::Event::PointerMoved(Pos2::new(6.0, 5.0))]);
        assert!(events.is_empty());

        let events = translator.translate_frame(&[
            touch(7, TouchPhase::End, 6.0, 5.0),
            button(6.0, 5.0, false),
        ]);
        assert_eq!(
            events,
            vec![PointerEvent::TouchEnd(vec![Touch::new(
                7,
                Point::new(6.0, 5.0)
            )])]
        );
        assert!(!translator.is_touching());
    }

    #[test]
    fn mouse_release_during_touch_still_ends_the_press() {
        let mut translator = EventTranslator::new();

        let events = translator.translate_frame(&[button(1.0, 1.0, true)]);
        assert_eq!(events, vec![PointerEvent::MouseDown(Point::new(1.0, 1.0))]);

        let events = translator.translate_frame(&[
            touch(4, TouchPhase::Start, 50.0, 50.0),
            button(2.0, 2.0, false),
        ]);
        assert_eq!(
            events,
            vec![
                PointerEvent::TouchStart(vec![Touch::new(4, Point::new(50.0, 50.0))]),
                PointerEvent::MouseUp(Point::new(2.0, 2.0)),
            ]
        );

        let events = translator.translate_frame(&[touch(4, TouchPhase::End, 50.0, 50.0)]);
        assert_eq!(
            events,
            vec![PointerEvent::TouchEnd(vec![Touch::new(4, Point::new(50.0, 50.0))])]
        );

        // Mouse is up again, a bare move is not a drag
        let events = translator.translate_frame(&[egui::Event::PointerMoved(Pos2::new(9.0, 9.0))]);
        assert!(events.is_empty());
    }

    #[test]
    fn same_phase_touches_are_grouped() {
        let mut translator = EventTranslator::new();

        let events = translator.translate_frame(&[
            touch(1, TouchPhase::Start, 1.0, 1.0),
            touch(2, TouchPhase::Start, 50.0, 1.0),
            touch(1, TouchPhase::Move, 2.0, 1.0),
            touch(2, TouchPhase::Cancel, 50.0, 1.0),
        ]);
        assert_eq!(
            events,
            vec![
                PointerEvent::TouchStart(vec![
                    Touch::new(1, Point::new(1.0, 1.0)),
                    Touch::new(2, Point::new(50.0, 1.0)),
                ]),
                PointerEvent::TouchMove(vec![Touch::new(1, Point::new(2.0, 1.0))]),
                PointerEvent::TouchEnd(vec![Touch::new(2, Point::new(50.0, 1.0))]),
            ]
        );
        assert!(translator.is_touching());
    }
}
