//! Pointer input subsystem
//!
//! Unifies mouse and multi-touch input into one gesture model per on-screen element:
//!
//! 1. [`debounce`] - page-wide rate limiting of raw move events
//! 2. [`surface`] - per-element press/move/release translation with touch ownership
//!
//! # Architecture
//!
//! ```text
//! Raw events ──► ControlBoard ──(down/up)──────────────► GestureSurface ──► Widget
//!                     │                                        ▲
//!                     └──(move)──► DebouncedBroadcaster ───────┘
//! ```
//!
//! All coordinates entering this module are page coordinates; surfaces convert them to
//! element-relative points using the element's bounds at the time of the event.

pub mod debounce;
pub mod surface;

use std::cell::Cell;
use std::ops::Sub;
use std::rc::Rc;

pub use debounce::{DebouncedBroadcaster, MoveListener};
pub use surface::{Gesture, GestureHandler, GestureSurface};

/// 2D point in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Page-space rectangle of an element
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn offset(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x < self.left + self.width
            && point.y >= self.top
            && point.y < self.top + self.height
    }
}

/// Handle to an on-screen element.
///
/// The host owns the geometry and may move or resize the element at any time; every
/// clone observes the same bounds.
#[derive(Debug, Clone, Default)]
pub struct Element {
    bounds: Rc<Cell<Bounds>>,
}

impl Element {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds: Rc::new(Cell::new(bounds)),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds.get()
    }

    pub fn set_bounds(&self, bounds: Bounds) {
        self.bounds.set(bounds);
    }

    pub fn width(&self) -> f32 {
        self.bounds.get().width
    }

    pub fn height(&self) -> f32 {
        self.bounds.get().height
    }

    pub fn contains(&self, page: Point) -> bool {
        self.bounds.get().contains(page)
    }

    /// Converts a page coordinate into a coordinate relative to the element's top-left
    pub fn relative(&self, page: Point) -> Point {
        page - self.bounds.get().offset()
    }
}

/// Stable identifier of one finger for the duration of its contact
pub type TouchId = u64;

/// One contact point of a touch event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: TouchId,
    pub page: Point,
}

impl Touch {
    pub const fn new(id: TouchId, page: Point) -> Self {
        Self { id, page }
    }
}

/// Raw pointer event in page coordinates.
///
/// Touch variants carry the touches that changed in this event, mirroring the
/// `changedTouches` list of the DOM touch model.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    MouseDown(Point),
    MouseMove(Point),
    MouseUp(Point),
    TouchStart(Vec<Touch>),
    TouchMove(Vec<Touch>),
    TouchEnd(Vec<Touch>),
}

impl PointerEvent {
    /// Press events are routed only to the element under the pointer
    pub fn is_press(&self) -> bool {
        matches!(self, PointerEvent::MouseDown(_) | PointerEvent::TouchStart(_))
    }

    /// Move events pass through the debounced broadcaster
    pub fn is_move(&self) -> bool {
        matches!(self, PointerEvent::MouseMove(_) | PointerEvent::TouchMove(_))
    }

    /// Release events are delivered to every element
    pub fn is_release(&self) -> bool {
        matches!(self, PointerEvent::MouseUp(_) | PointerEvent::TouchEnd(_))
    }
}
