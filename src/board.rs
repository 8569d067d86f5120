use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::input::{DebouncedBroadcaster, MoveListener, PointerEvent, Touch};
use crate::widget::Control;

// Routes raw page events to the attached controls.
//
// Presses only reach controls under the pointer (per touch for touch-start), releases
// reach every control, and moves go through the single debounced broadcaster.
pub struct ControlBoard {
    broadcaster: DebouncedBroadcaster,
    controls: Vec<Rc<RefCell<dyn Control>>>,
}

impl ControlBoard {
    pub fn new(broadcaster: DebouncedBroadcaster) -> Self {
        Self {
            broadcaster,
            controls: Vec::new(),
        }
    }

    pub fn attach<C>(&mut self, control: &Rc<RefCell<C>>)
    where
        C: Control + 'static,
    {
        if control.borrow().tracks_movement() {
            let listener: Rc<RefCell<dyn MoveListener>> = control.clone();
            self.broadcaster.subscribe(Rc::downgrade(&listener));
        }
        self.controls.push(control.clone());
        debug!("Attached control, {} on board", self.controls.len());
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn broadcaster(&self) -> &DebouncedBroadcaster {
        &self.broadcaster
    }

    pub fn tick_period(&self) -> Duration {
        self.broadcaster.tick_period()
    }

    pub fn poll(&mut self, now: Instant) {
        self.broadcaster.poll(now);
    }

    pub fn dispatch(&mut self, event: &PointerEvent) {
        match event {
            PointerEvent::MouseDown(page) => {
                for control in &self.controls {
                    let hit = control.borrow().element().contains(*page);
                    if hit {
                        deliver(control, event);
                    }
                }
            }
            PointerEvent::TouchStart(touches) => {
                for control in &self.controls {
                    let inside: Vec<Touch> = {
                        let control = control.borrow();
                        touches
                            .iter()
                            .filter(|touch| control.element().contains(touch.page))
                            .copied()
                            .collect()
                    };
                    if !inside.is_empty() {
                        deliver(control, &PointerEvent::TouchStart(inside));
                    }
                }
            }
            PointerEvent::MouseMove(_) | PointerEvent::TouchMove(_) => {
                self.broadcaster.dispatch(event);
            }
            PointerEvent::MouseUp(_) | PointerEvent::TouchEnd(_) => {
                for control in &self.controls {
                    deliver(control, event);
                }
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.broadcaster.shutdown();
    }
}

fn deliver(control: &Rc<RefCell<dyn Control>>, event: &PointerEvent) {
    match control.try_borrow_mut() {
        Ok(mut control) => control.handle_pointer(event),
        Err(_) => warn!("Control busy, dropping {:?}", event),
    }
}
