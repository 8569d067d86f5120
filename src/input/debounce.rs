use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::PointerEvent;
use crate::timer::Ticker;

// Receives the move events that survived debouncing
pub trait MoveListener {
    fn on_move(&mut self, event: &PointerEvent);
}

// Page-wide fan-out of raw move events.
//
// Raw mouse/touch moves can arrive at well over 1000/s. At most one move is forwarded
// per tick; everything else until the next tick is dropped. Press and release events
// never pass through here.
pub struct DebouncedBroadcaster {
    ticker: Ticker,

    // Set once a move has been forwarded in the current tick
    is_debounced: bool,

    is_stopped: bool,

    listeners: Vec<Weak<RefCell<dyn MoveListener>>>,

    forwarded: u64,
    dropped: u64,
}

impl DebouncedBroadcaster {
    pub const DEFAULT_RATE_HZ: u32 = 60;

    pub fn new(rate_hz: u32, now: Instant) -> Self {
        debug!("Creating debounced broadcaster at {} Hz", rate_hz);
        Self {
            ticker: Ticker::with_rate(rate_hz, now),
            is_debounced: false,
            is_stopped: false,
            listeners: Vec::new(),
            forwarded: 0,
            dropped: 0,
        }
    }

    pub fn subscribe(&mut self, listener: Weak<RefCell<dyn MoveListener>>) {
        self.listeners.push(listener);
        debug!("Move listener subscribed, {} total", self.listeners.len());
    }

    pub fn unsubscribe(&mut self, listener: &Rc<RefCell<dyn MoveListener>>) {
        let target = Rc::downgrade(listener);
        self.listeners.retain(|l| !Weak::ptr_eq(l, &target));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    // Drives the debounce tick, returns true when the tick cleared the flag
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_stopped {
            return false;
        }
        if self.ticker.poll(now) {
            self.is_debounced = false;
            return true;
        }
        false
    }

    // Forwards a move to every live listener unless one was already forwarded this tick
    pub fn dispatch(&mut self, event: &PointerEvent) -> bool {
        if self.is_stopped || !event.is_move() {
            return false;
        }

        if self.is_debounced {
            self.dropped += 1;
            trace!("Move debounced ({} dropped so far)", self.dropped);
            return false;
        }
        self.is_debounced = true;
        self.forwarded += 1;

        self.listeners.retain(|l| l.strong_count() > 0);
        let live: Vec<_> = self.listeners.iter().filter_map(Weak::upgrade).collect();
        for listener in live {
            match listener.try_borrow_mut() {
                Ok(mut listener) => listener.on_move(event),
                Err(_) => warn!("Move listener is busy, skipping forwarded move"),
            }
        }
        true
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn tick_period(&self) -> std::time::Duration {
        self.ticker.period()
    }

    // Cancels the tick; nothing is forwarded afterwards
    pub fn shutdown(&mut self) {
        debug!(
            "Shutting down broadcaster: {} forwarded, {} dropped",
            self.forwarded, self.dropped
        );
        self.is_stopped = true;
        self.listeners.clear();
    }
}
