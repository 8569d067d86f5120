//! # WebController User Interface Module
//!
//! This module hosts the touch control surface inside an eframe window. It is the
//! only place where egui types meet the rest of the crate: raw input is translated
//! into page events, control geometry is laid out from the configured rectangles,
//! and every control is painted from its widget state each frame.
//!
//! ## Layout
//!
//! The window is split into two panels:
//! - **Top Panel**: status bar with the connection LED, device actions, the screen
//!   wakelock toggle, and the most recent alert
//! - **Central Panel**: the control area, where each configured control occupies a
//!   rectangle given in fractions of the panel
//!
//! The control area is re-measured every frame, so resizing the window or switching
//! to fullscreen moves every element before the frame's input is dispatched.
//!
//! ## Frame Processing
//!
//! One frame runs in a fixed order:
//! 1. `raw_input_hook` translates the frame's raw events and queues them
//! 2. the board's debounce ticker is polled, opening the next move window
//! 3. the control area is arranged, queued events are dispatched to the board and
//!    the controls are painted
//! 4. the session drains link events, sends heartbeats and settles the wakelock
//! 5. pending alerts are shown and the next repaint is scheduled
//!
//! Widgets push their changes to the session synchronously during step 3, so a frame
//! that moves a control also produces its protocol frame in that same frame.
//!
//! ## Alerts
//!
//! Session alerts and configuration problems are queued with a local timestamp and
//! shown one at a time in a modal dialog. The newest alert also stays visible in the
//! status bar after its dialog is dismissed.

pub mod events;
pub mod render;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Button, Color32, Layout as EguiLayout, RichText, Sense};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::board::ControlBoard;
use crate::config::AppConfig;
use crate::input::{DebouncedBroadcaster, PointerEvent};
use crate::layout::Layout;
use crate::session::link::WebSocketConnector;
use crate::session::wakelock::UnsupportedWakeLock;
use crate::session::{ConnectionState, SessionManager};

use self::events::EventTranslator;
use self::render::{paint_control, to_bounds};

/// Upper bound between two frames while nothing else is scheduled
const MAX_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Alert queued for display
#[derive(Debug, Clone)]
pub struct Alert {
    /// Local wall clock time the alert was raised, `HH:MM:SS`
    pub at: String,
    pub message: String,
}

impl Alert {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: chrono::Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }
}

/// Host application for the control surface.
///
/// Owns the session, the control board and the laid-out controls, and drives all of
/// them from the egui frame loop. Everything here runs on the UI thread; the only
/// work on the tokio runtime is the WebSocket link task spawned by the connector.
///
/// ## Shared State
///
/// The session reports connection, wakelock and alert changes through notifiers.
/// Subscriptions write into the `Rc` cells below, which the status bar reads when it
/// is drawn.
pub struct ControlSurfaceUI {
    /// Connection lifecycle, remote device registries and heartbeat
    session: SessionManager,

    /// Press/move/release routing and the debounced move broadcaster
    board: ControlBoard,

    /// Placed controls with their typed widget handles for painting
    layout: Layout,

    /// Raw egui input to page events
    translator: EventTranslator,

    /// Events translated in `raw_input_hook`, dispatched during `update`
    pending: Vec<PointerEvent>,

    /// Last connection state published by the session
    connection: Rc<Cell<ConnectionState>>,

    /// Whether the screen wakelock is held
    wakelock_held: Rc<Cell<bool>>,

    /// Alerts not yet acknowledged in the dialog
    alerts: Rc<RefCell<VecDeque<Alert>>>,

    /// Most recent alert, kept for the status bar
    last_alert: Rc<RefCell<Option<Alert>>>,
}

impl ControlSurfaceUI {
    /// Builds the control surface from the loaded configuration and opens the link.
    ///
    /// # Parameters
    /// - `cc`: eframe creation context for egui initialization
    /// - `config`: validated application configuration
    /// - `runtime`: tokio runtime the WebSocket link task is spawned on
    ///
    /// Controls whose configuration cannot be built are skipped and reported as
    /// alerts; the remaining controls are usable.
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, runtime: Handle) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let mut session = SessionManager::new(
            config.session_settings(),
            Box::new(WebSocketConnector::new(runtime)),
            Box::new(UnsupportedWakeLock),
        );
        let mut board = ControlBoard::new(DebouncedBroadcaster::new(
            config.input.debounce_rate_hz,
            Instant::now(),
        ));
        let layout = Layout::build(&config.controls, &mut session, &mut board);

        let connection = Rc::new(Cell::new(session.connection_state()));
        let wakelock_held = Rc::new(Cell::new(session.wakelock_state().is_held()));
        let alerts = Rc::new(RefCell::new(VecDeque::new()));
        let last_alert = Rc::new(RefCell::new(None));

        let state = connection.clone();
        session.on_connection().subscribe(move |next| state.set(*next));

        let held = wakelock_held.clone();
        session.on_wakelock().subscribe(move |is_held| held.set(*is_held));

        let (queue, last) = (alerts.clone(), last_alert.clone());
        session.on_alert().subscribe(move |message: &String| {
            let alert = Alert::now(message.as_str());
            queue.borrow_mut().push_back(alert.clone());
            *last.borrow_mut() = Some(alert);
        });

        for error in &layout.errors {
            alerts.borrow_mut().push_back(Alert::now(error.to_string()));
        }

        info!(
            "Control surface ready with {} controls ({} registered with the session)",
            layout.controls.len(),
            session.control_count()
        );
        session.start();

        ControlSurfaceUI {
            session,
            board,
            layout,
            translator: EventTranslator::new(),
            pending: Vec::new(),
            connection,
            wakelock_held,
            alerts,
            last_alert,
        }
    }

    fn push_alert(&self, message: impl Into<String>) {
        let alert = Alert::now(message);
        self.alerts.borrow_mut().push_back(alert.clone());
        *self.last_alert.borrow_mut() = Some(alert);
    }

    /// Status bar mirroring the connection, wakelock and device state
    fn status_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let state = self.connection.get();
        let led = match state {
            ConnectionState::Idle => Color32::GRAY,
            ConnectionState::Connecting => Color32::YELLOW,
            ConnectionState::Open => Color32::GREEN,
            ConnectionState::Closed => Color32::RED,
        };

        ui.horizontal_centered(|ui| {
            ui.label(RichText::new("●").color(led).size(18.0));
            ui.label(format!("{}", state));

            let idle = matches!(state, ConnectionState::Idle | ConnectionState::Closed);
            if ui.add_enabled(idle, Button::new("Connect")).clicked() {
                self.session.start();
            }
            if ui.button("Reset").clicked() {
                self.session.reset_device();
            }
            let open = state == ConnectionState::Open;
            if ui.add_enabled(open, Button::new("Device info")).clicked() {
                self.session.request_device_info();
            }

            let wakelock = Button::new("Wake lock").selected(self.wakelock_held.get());
            if ui
                .add_enabled(self.session.wakelock_supported(), wakelock)
                .clicked()
            {
                self.session.toggle_wakelock();
            }

            let fullscreen = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
            if ui
                .add(Button::new("Fullscreen").selected(fullscreen))
                .clicked()
            {
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!fullscreen));
            }

            if ui.button("Screen size").clicked() {
                let screen = ctx.screen_rect();
                self.push_alert(format!(
                    "Screen size: {:.0} x {:.0}",
                    screen.width(),
                    screen.height()
                ));
            }

            ui.with_layout(EguiLayout::right_to_left(Align::Center), |ui| {
                ui.label(format!("Device {}", self.session.settings().device_id));
                if let Some(info) = self.session.device_info() {
                    ui.separator();
                    ui.label(info.to_string());
                }
                if let Some(alert) = self.last_alert.borrow().as_ref() {
                    ui.separator();
                    ui.label(
                        RichText::new(format!("[{}] {}", alert.at, alert.message))
                            .color(Color32::LIGHT_RED),
                    );
                }
            });
        });
    }

    /// Shows the oldest unacknowledged alert
    fn alert_dialog(&mut self, ctx: &egui::Context) {
        let Some(alert) = self.alerts.borrow().front().cloned() else {
            return;
        };

        let mut acknowledged = false;
        let response = egui::Modal::new(egui::Id::new("alert")).show(ctx, |ui| {
            ui.label(RichText::new(alert.at.as_str()).weak());
            ui.label(alert.message.as_str());
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                acknowledged = true;
            }
        });

        if acknowledged || response.should_close() {
            debug!("Alert acknowledged: {}", alert.message);
            self.alerts.borrow_mut().pop_front();
        }
    }

    fn next_repaint(&self, now: Instant) -> Duration {
        let mut wait = self.board.tick_period().min(MAX_FRAME_INTERVAL);
        if let Some(heartbeat) = self.session.next_heartbeat(now) {
            wait = wait.min(heartbeat);
        }
        wait
    }
}

impl eframe::App for ControlSurfaceUI {
    /// Translates the frame's raw pointer and touch input before egui consumes it.
    ///
    /// Events are queued rather than dispatched here because control geometry is only
    /// known once the central panel has been measured in `update`.
    fn raw_input_hook(&mut self, _ctx: &egui::Context, raw_input: &mut egui::RawInput) {
        let translated = self.translator.translate_frame(&raw_input.events);
        self.pending.extend(translated);
    }

    /// Runs one frame of the control surface.
    ///
    /// # Parameters
    /// - `ctx`: egui context for UI rendering and event processing
    /// - `_frame`: eframe application frame (unused)
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.board.poll(now);

        egui::TopBottomPanel::top("status_bar")
            .show_separator_line(true)
            .show(ctx, |ui| self.status_bar(ctx, ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let area = ui.available_rect_before_wrap();
            ui.allocate_rect(area, Sense::hover());
            self.layout.arrange(to_bounds(area));

            for event in self.pending.drain(..) {
                self.board.dispatch(&event);
            }

            let painter = ui.painter_at(area);
            for control in &self.layout.controls {
                paint_control(&painter, control);
            }
        });

        self.session.poll(Instant::now());
        self.alert_dialog(ctx);

        ctx.request_repaint_after(self.next_repaint(now));
    }
}

impl Drop for ControlSurfaceUI {
    fn drop(&mut self) {
        self.board.shutdown();
        self.session.shutdown();
    }
}
