//! Gesture surface - per-element press/move/release translation
//!
//! Aggregates mouse and touch events down into press, move and release gestures.
//! This works around behavior of raw pointer events that would otherwise leak into
//! the widgets:
//!
//! 1. Release events that happen after the pointer left the element still end the
//!    gesture, because the host delivers release events to every surface.
//! 2. A second finger landing anywhere on the page can not hijack a gesture, because
//!    touch moves and releases only count when they carry an identifier the surface
//!    took ownership of at press time.

use std::collections::HashSet;
use tracing::trace;

use super::{Element, Point, PointerEvent, Touch, TouchId};

/// One step of a gesture in element-relative coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Press(Point),
    Move(Point),
    Release(Point),
}

/// Callbacks invoked for each gesture step.
///
/// Every method defaults to a no-op so implementors only override what they need.
pub trait GestureHandler {
    fn on_press(&mut self, _point: Point) {}

    fn on_move(&mut self, _point: Point) {}

    fn on_release(&mut self, _point: Point) {}

    /// Routes a translated gesture to the matching callback
    fn dispatch(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Press(point) => self.on_press(point),
            Gesture::Move(point) => self.on_move(point),
            Gesture::Release(point) => self.on_release(point),
        }
    }
}

/// Gesture state of one on-screen element
#[derive(Debug, Clone)]
pub struct GestureSurface {
    element: Element,
    track_movement: bool,
    is_pressed: bool,

    /// Touches owned by the current gesture; empty for mouse gestures
    active_touch_ids: HashSet<TouchId>,
}

impl GestureSurface {
    pub fn new(element: Element, track_movement: bool) -> Self {
        Self {
            element,
            track_movement,
            is_pressed: false,
            active_touch_ids: HashSet::new(),
        }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn tracks_movement(&self) -> bool {
        self.track_movement
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    pub fn active_touch_ids(&self) -> &HashSet<TouchId> {
        &self.active_touch_ids
    }

    /// Translates a raw event into a gesture step, or `None` if the event does not
    /// belong to this surface's gesture.
    pub fn translate(&mut self, event: &PointerEvent) -> Option<Gesture> {
        match event {
            PointerEvent::MouseDown(page) => self.press(*page, None),
            PointerEvent::TouchStart(touches) => {
                let first = touches.first()?;
                self.press(first.page, Some(touches.as_slice()))
            }
            PointerEvent::MouseMove(page) => {
                if !self.track_movement || !self.is_pressed {
                    return None;
                }
                Some(Gesture::Move(self.locate(*page)))
            }
            PointerEvent::TouchMove(touches) => {
                if !self.track_movement || !self.is_pressed {
                    return None;
                }
                let touch = self.owned_touch(touches)?;
                Some(Gesture::Move(self.locate(touch.page)))
            }
            PointerEvent::MouseUp(page) => {
                if !self.is_pressed {
                    return None;
                }
                Some(self.release(*page))
            }
            PointerEvent::TouchEnd(touches) => {
                if !self.is_pressed {
                    return None;
                }
                let touch = self.owned_touch(touches)?;
                Some(self.release(touch.page))
            }
        }
    }

    fn press(&mut self, page: Point, touches: Option<&[Touch]>) -> Option<Gesture> {
        if self.is_pressed {
            trace!("Surface already pressed, ignoring additional press");
            return None;
        }

        self.is_pressed = true;
        self.active_touch_ids.clear();
        if let Some(touches) = touches {
            self.active_touch_ids
                .extend(touches.iter().map(|touch| touch.id));
        }
        Some(Gesture::Press(self.locate(page)))
    }

    fn release(&mut self, page: Point) -> Gesture {
        self.is_pressed = false;
        self.active_touch_ids.clear();
        Gesture::Release(self.locate(page))
    }

    fn owned_touch<'a>(&self, touches: &'a [Touch]) -> Option<&'a Touch> {
        touches
            .iter()
            .find(|touch| self.active_touch_ids.contains(&touch.id))
    }

    // Element offsets are re-read on every event so moved or resized elements work
    fn locate(&self, page: Point) -> Point {
        self.element.relative(page)
    }
}
