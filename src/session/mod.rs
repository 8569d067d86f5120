//! Session manager
//!
//! Owns the connection lifecycle, the control id registries and the wakelock toggle,
//! and turns widget change notifications into protocol frames.
//!
//! # Connection lifecycle
//!
//! ```text
//!            start()              Opened
//!  Idle ──────────────► Connecting ──────► Open
//!   ▲                       │               │
//!   │ start()               │ Closed        │ Closed
//!   └──────── Closed ◄──────┴───────────────┘
//! ```
//!
//! Every other (state, event) pair is a no-op, so `start()` while Connecting or Open
//! never opens a second link.
//!
//! # Send discipline
//!
//! Frames are sent only while Open. Anything produced in another state is dropped on
//! the spot; nothing is queued or replayed.

pub mod link;
pub mod wakelock;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, trace, warn};

use crate::protocol::{wire_value, AcquireStatus, Axis, DeviceInfo, Reply, Request};
use crate::timer::Ticker;
use crate::widget::{Control, JoyStick, Notifier, Slider, Widget};

use link::{Connector, LinkEvent, LinkHandle};
use wakelock::{WakeLock, WakeLockState, WakeLockToggle, WakeLockUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEvent {
    Start,
    Opened,
    Closed,
}

impl ConnectionState {
    // Transition table, None for events that are not legal in the current state
    fn next(self, event: ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::Idle | S::Closed, E::Start) => Some(S::Connecting),
            (S::Connecting, E::Opened) => Some(S::Open),
            (S::Connecting | S::Open, E::Closed) => Some(S::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "disconnected"),
        }
    }
}

/// Duplicate id claimed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdConflict {
    Axis(Axis),
    Button(u8),
}

impl fmt::Display for IdConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdConflict::Axis(axis) => write!(f, "{} is already bound to another control", axis),
            IdConflict::Button(id) => write!(f, "Button {} is already bound to another control", id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub url: String,
    pub device_id: u8,
    pub heartbeat_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/websocket".to_string(),
            device_id: 1,
            heartbeat_interval: Duration::from_millis(1000),
        }
    }
}

// Connection state and handle, shared with the widget subscriptions
struct Link {
    state: ConnectionState,
    handle: Option<LinkHandle>,
}

impl Link {
    fn send(&self, request: Request) {
        let handle = match (&self.handle, self.state) {
            (Some(handle), ConnectionState::Open) => handle,
            _ => {
                trace!("Dropping {:?}, link is {}", request, self.state);
                return;
            }
        };

        let packet = request.encode();
        trace!("Sending {:?} as {:02x?}", request, packet.as_bytes());
        if let Err(e) = handle.send(packet.to_vec()) {
            debug!("Dropping {:?}: {}", request, e);
        }
    }
}

pub struct SessionManager {
    settings: SessionSettings,
    connector: Box<dyn Connector>,
    link: Rc<RefCell<Link>>,
    heartbeat: Option<Ticker>,

    controls: Vec<Rc<RefCell<dyn Control>>>,
    claimed_axes: HashSet<Axis>,
    claimed_buttons: HashSet<u8>,

    wakelock: WakeLockToggle,
    device_info: Option<DeviceInfo>,

    on_connection: Notifier<ConnectionState>,
    on_wakelock: Notifier<bool>,
    on_alert: Notifier<String>,
}

impl SessionManager {
    pub fn new(
        settings: SessionSettings,
        connector: Box<dyn Connector>,
        wakelock: Box<dyn WakeLock>,
    ) -> Self {
        debug!(
            "Creating session for device {} at {}",
            settings.device_id, settings.url
        );
        Self {
            settings,
            connector,
            link: Rc::new(RefCell::new(Link {
                state: ConnectionState::Idle,
                handle: None,
            })),
            heartbeat: None,
            controls: Vec::new(),
            claimed_axes: HashSet::new(),
            claimed_buttons: HashSet::new(),
            wakelock: WakeLockToggle::new(wakelock),
            device_info: None,
            on_connection: Notifier::new(),
            on_wakelock: Notifier::new(),
            on_alert: Notifier::new(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.link.borrow().state
    }

    pub fn wakelock_state(&self) -> WakeLockState {
        self.wakelock.state()
    }

    pub fn wakelock_supported(&self) -> bool {
        self.wakelock.is_supported()
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn on_connection(&mut self) -> &mut Notifier<ConnectionState> {
        &mut self.on_connection
    }

    pub fn on_wakelock(&mut self) -> &mut Notifier<bool> {
        &mut self.on_wakelock
    }

    pub fn on_alert(&mut self) -> &mut Notifier<String> {
        &mut self.on_alert
    }

    /// Binds a joystick to two axes; conflicts are reported and registration proceeds
    #[must_use]
    pub fn add_joystick(
        &mut self,
        joystick: &Rc<RefCell<JoyStick>>,
        axis_x: Axis,
        axis_y: Axis,
    ) -> Vec<IdConflict> {
        let conflicts: Vec<_> = [axis_x, axis_y]
            .into_iter()
            .filter_map(|axis| self.claim_axis(axis))
            .collect();

        let link = self.link.clone();
        joystick.borrow_mut().subscribe(move |value| {
            let link = link.borrow();
            link.send(Request::SetAxis {
                axis: axis_x,
                value: wire_value(value.x),
            });
            link.send(Request::SetAxis {
                axis: axis_y,
                value: wire_value(value.y),
            });
        });

        self.controls.push(joystick.clone());
        debug!("Registered joystick on {} / {}", axis_x, axis_y);
        conflicts
    }

    #[must_use]
    pub fn add_slider(&mut self, slider: &Rc<RefCell<Slider>>, axis: Axis) -> Vec<IdConflict> {
        let conflicts: Vec<_> = self.claim_axis(axis).into_iter().collect();

        let link = self.link.clone();
        slider.borrow_mut().subscribe(move |value| {
            link.borrow().send(Request::SetAxis {
                axis,
                value: wire_value(*value),
            });
        });

        self.controls.push(slider.clone());
        debug!("Registered slider on {}", axis);
        conflicts
    }

    /// Binds any boolean widget (momentary or latched) to a button id
    #[must_use]
    pub fn add_button<W>(&mut self, button: &Rc<RefCell<W>>, button_id: u8) -> Vec<IdConflict>
    where
        W: Widget<Value = bool> + 'static,
    {
        let conflicts: Vec<_> = self.claim_button(button_id).into_iter().collect();

        let link = self.link.clone();
        button.borrow_mut().subscribe(move |pressed| {
            link.borrow().send(Request::SetButton {
                button_id,
                pressed: *pressed,
            });
        });

        self.controls.push(button.clone());
        debug!("Registered button {}", button_id);
        conflicts
    }

    fn claim_axis(&mut self, axis: Axis) -> Option<IdConflict> {
        if self.claimed_axes.insert(axis) {
            return None;
        }
        let conflict = IdConflict::Axis(axis);
        warn!("{}", conflict);
        Some(conflict)
    }

    fn claim_button(&mut self, button_id: u8) -> Option<IdConflict> {
        if self.claimed_buttons.insert(button_id) {
            return None;
        }
        let conflict = IdConflict::Button(button_id);
        warn!("{}", conflict);
        Some(conflict)
    }

    /// Opens the link unless one is already connecting or open
    pub fn start(&mut self) {
        if !self.apply(ConnectionEvent::Start) {
            debug!("Start ignored, link is {}", self.connection_state());
            return;
        }

        let handle = self.connector.connect(&self.settings.url);
        self.link.borrow_mut().handle = Some(handle);
    }

    /// Resets the remote device, or connects first if there is no open link
    pub fn reset_device(&mut self) {
        if self.connection_state() != ConnectionState::Open {
            self.start();
            return;
        }
        info!("Resetting device {}", self.settings.device_id);
        self.send(Request::Reset);
        self.force_update_all();
    }

    pub fn request_device_info(&mut self) {
        self.send(Request::GetDevInfo);
    }

    pub fn toggle_wakelock(&mut self) {
        if let Some(update) = self.wakelock.toggle() {
            self.publish_wakelock(update);
        }
    }

    /// Drains link events and drives the heartbeat and pending wakelock operations
    pub fn poll(&mut self, now: Instant) {
        while let Some(event) = self.next_link_event() {
            match event {
                LinkEvent::Opened => self.on_opened(now),
                LinkEvent::Message(bytes) => self.on_reply(&bytes),
                LinkEvent::Closed(reason) => self.on_closed(&reason),
            }
        }

        let beat = self
            .heartbeat
            .as_mut()
            .is_some_and(|heartbeat| heartbeat.poll(now));
        if beat {
            trace!("Heartbeat");
            self.send(self.acquire_request());
        }

        if let Some(update) = self.wakelock.poll() {
            self.publish_wakelock(update);
        }
    }

    /// Time until the next heartbeat, if one is running
    pub fn next_heartbeat(&self, now: Instant) -> Option<Duration> {
        self.heartbeat.as_ref().map(|heartbeat| heartbeat.remaining(now))
    }

    pub fn shutdown(&mut self) {
        info!("Shutting down session");
        self.heartbeat = None;
        let mut link = self.link.borrow_mut();
        if let Some(handle) = link.handle.take() {
            handle.close();
        }
    }

    fn next_link_event(&mut self) -> Option<LinkEvent> {
        let mut link = self.link.borrow_mut();
        let handle = link.handle.as_mut()?;
        match handle.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(LinkEvent::Closed("link dropped".to_string())),
        }
    }

    // Applies a lifecycle event, returns false if it was not legal
    fn apply(&mut self, event: ConnectionEvent) -> bool {
        let current = self.connection_state();
        let Some(next) = current.next(event) else {
            return false;
        };

        debug!("Connection {} -> {} on {:?}", current, next, event);
        self.link.borrow_mut().state = next;
        self.on_connection.notify(next);
        true
    }

    fn on_opened(&mut self, now: Instant) {
        if !self.apply(ConnectionEvent::Opened) {
            return;
        }
        info!("Connected to {}", self.settings.url);

        self.send(self.acquire_request());
        self.send(Request::Reset);
        self.force_update_all();
        self.heartbeat = Some(Ticker::new(self.settings.heartbeat_interval, now));
    }

    fn on_closed(&mut self, reason: &str) {
        self.apply(ConnectionEvent::Closed);
        info!("Disconnected: {}", reason);

        self.heartbeat = None;
        self.link.borrow_mut().handle = None;
    }

    fn on_reply(&mut self, bytes: &[u8]) {
        let reply = match Reply::decode(bytes) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Discarding reply {:02x?}: {}", bytes, e);
                return;
            }
        };

        match reply {
            // Every heartbeat is answered with AlreadyAcquired
            Reply::Acquire {
                status: AcquireStatus::Success | AcquireStatus::AlreadyAcquired,
                device_id,
            } => {
                trace!("Device {} acquired", device_id);
            }
            Reply::Acquire { status, device_id } => {
                warn!("Failed to acquire device {}: {}", device_id, status);
                self.alert(format!("Failed to acquire device {}: {}", device_id, status));
            }
            Reply::Invalid(error) => {
                warn!("Request rejected: {}", error);
                self.alert(format!("Request rejected: {}", error));
            }
            Reply::DeviceInfo(info) => {
                info!("Device info: {}", info);
                self.device_info = Some(info);
            }
            other if other.is_failure() => warn!("Request failed: {:?}", other),
            other => trace!("Reply: {:?}", other),
        }
    }

    fn acquire_request(&self) -> Request {
        Request::AcquireDevice {
            device_id: self.settings.device_id,
        }
    }

    fn send(&self, request: Request) {
        self.link.borrow().send(request);
    }

    fn force_update_all(&mut self) {
        for control in &self.controls {
            match control.try_borrow_mut() {
                Ok(mut control) => control.force_update(),
                Err(_) => warn!("Control busy, skipping forced update"),
            }
        }
    }

    fn publish_wakelock(&mut self, update: WakeLockUpdate) {
        match update {
            WakeLockUpdate::Changed(held) => self.on_wakelock.force(held),
            WakeLockUpdate::Failed { held, reason } => {
                self.on_wakelock.force(held);
                self.alert(reason);
            }
        }
    }

    fn alert(&mut self, message: String) {
        self.on_alert.force(message);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut link) = self.link.try_borrow_mut() {
            link.handle = None;
        }
    }
}
