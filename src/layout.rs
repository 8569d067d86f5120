//! Declarative control layout
//!
//! Builds widgets from the `[[controls]]` entries of the config, wires them into the
//! session and the control board, and places their elements inside the control area.
//!
//! ```toml
//! [[controls]]
//! kind = "slider"
//! axis = "Axis.THROTTLE"
//! orientation = "vertical"
//! spring = 0
//! rect = { x = 0.45, y = 0.05, width = 0.1, height = 0.75 }
//! spring_toggle = { rect = { x = 0.45, y = 0.82, width = 0.1, height = 0.13 }, state = true }
//! ```
//!
//! Entries with unknown axis labels are reported and skipped; everything else is built
//! even when ids collide, since the session only reports collisions.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::board::ControlBoard;
use crate::input::{Bounds, Element};
use crate::protocol::{Axis, ProtocolError};
use crate::session::{IdConflict, SessionManager};
use crate::widget::{Button, JoyStick, Orientation, Slider, SliderOptions, ToggleButton, Widget};

const RECT_EPSILON: f32 = 1e-4;

/// Placement as fractions of the control area
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_normalized(&self) -> bool {
        let within = |v: f32| (-RECT_EPSILON..=1.0 + RECT_EPSILON).contains(&v);
        self.width > 0.0
            && self.height > 0.0
            && within(self.x)
            && within(self.y)
            && within(self.x + self.width)
            && within(self.y + self.height)
    }

    /// Resolves the fractions against the page-space control area
    pub fn place(&self, area: Bounds) -> Bounds {
        Bounds::new(
            area.left + self.x * area.width,
            area.top + self.y * area.height,
            self.width * area.width,
            self.height * area.height,
        )
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct SpringToggleConfig {
    pub rect: Rect,
    #[serde(default)]
    pub state: Option<bool>,
}

fn default_auto_return() -> bool {
    true
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlConfig {
    Joystick {
        rect: Rect,
        axis_x: String,
        axis_y: String,
        #[serde(default = "default_auto_return")]
        auto_return: bool,
        #[serde(default)]
        knob_radius: Option<f32>,
    },
    Slider {
        rect: Rect,
        axis: String,
        #[serde(default)]
        orientation: Orientation,
        #[serde(default)]
        value: Option<i32>,
        #[serde(default)]
        spring: Option<i32>,
        #[serde(default)]
        spring_toggle: Option<SpringToggleConfig>,
    },
    Button {
        rect: Rect,
        id: u8,
        #[serde(default)]
        label: Option<String>,
    },
    Toggle {
        rect: Rect,
        id: u8,
        #[serde(default)]
        state: Option<bool>,
        #[serde(default)]
        label: Option<String>,
    },
}

impl ControlConfig {
    pub fn rect(&self) -> Rect {
        match self {
            ControlConfig::Joystick { rect, .. }
            | ControlConfig::Slider { rect, .. }
            | ControlConfig::Button { rect, .. }
            | ControlConfig::Toggle { rect, .. } => *rect,
        }
    }

    /// Every rect the entry occupies, auxiliary controls included
    pub fn rects(&self) -> Vec<Rect> {
        let mut rects = vec![self.rect()];
        if let ControlConfig::Slider {
            spring_toggle: Some(toggle),
            ..
        } = self
        {
            rects.push(toggle.rect);
        }
        rects
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Control {index} skipped: {source}")]
    UnknownAxis {
        index: usize,
        #[source]
        source: ProtocolError,
    },

    #[error("Control {index}: {conflict}")]
    Conflict { index: usize, conflict: IdConflict },
}

/// Typed handle kept for rendering
pub enum ControlView {
    Joystick(Rc<RefCell<JoyStick>>),
    Slider(Rc<RefCell<Slider>>),
    Button {
        widget: Rc<RefCell<Button>>,
        label: String,
    },
    Toggle {
        widget: Rc<RefCell<ToggleButton>>,
        label: String,
    },
}

pub struct PlacedControl {
    pub rect: Rect,
    pub element: Element,
    pub view: ControlView,
}

#[derive(Default)]
pub struct Layout {
    pub controls: Vec<PlacedControl>,
    pub errors: Vec<LayoutError>,
}

impl Layout {
    pub fn build(
        configs: &[ControlConfig],
        session: &mut SessionManager,
        board: &mut ControlBoard,
    ) -> Layout {
        let mut layout = Layout::default();
        for (index, config) in configs.iter().enumerate() {
            if let Err(e) = layout.add(index, config, session, board) {
                error!("{}", e);
                layout.errors.push(e);
            }
        }
        debug!(
            "Built layout with {} elements, {} errors",
            layout.controls.len(),
            layout.errors.len()
        );
        layout
    }

    /// Updates every element from the current control area
    pub fn arrange(&self, area: Bounds) {
        for control in &self.controls {
            control.element.set_bounds(control.rect.place(area));
        }
    }

    fn add(
        &mut self,
        index: usize,
        config: &ControlConfig,
        session: &mut SessionManager,
        board: &mut ControlBoard,
    ) -> Result<(), LayoutError> {
        let parse = |label: &str| {
            label
                .parse::<Axis>()
                .map_err(|source| LayoutError::UnknownAxis { index, source })
        };

        let conflicts = match config {
            ControlConfig::Joystick {
                rect,
                axis_x,
                axis_y,
                auto_return,
                knob_radius,
            } => {
                let (axis_x, axis_y) = (parse(axis_x.as_str())?, parse(axis_y.as_str())?);
                let element = Element::default();
                let mut stick = JoyStick::new(element.clone()).with_auto_return(*auto_return);
                if let Some(radius) = knob_radius {
                    stick = stick.with_knob_radius(*radius);
                }
                let stick = Rc::new(RefCell::new(stick));

                board.attach(&stick);
                let conflicts = session.add_joystick(&stick, axis_x, axis_y);
                self.place(*rect, element, ControlView::Joystick(stick));
                conflicts
            }
            ControlConfig::Slider {
                rect,
                axis,
                orientation,
                value,
                spring,
                spring_toggle,
            } => {
                let axis = parse(axis.as_str())?;
                let element = Element::default();
                let options = SliderOptions {
                    orientation: *orientation,
                    initial: *value,
                    spring: *spring,
                };
                let slider = Rc::new(RefCell::new(Slider::new(element.clone(), options)));

                board.attach(&slider);
                let conflicts = session.add_slider(&slider, axis);
                self.place(*rect, element, ControlView::Slider(slider.clone()));

                if let Some(toggle) = spring_toggle {
                    self.add_spring_toggle(toggle, &slider, board);
                }
                conflicts
            }
            ControlConfig::Button { rect, id, label } => {
                let element = Element::default();
                let widget = Rc::new(RefCell::new(Button::new(element.clone())));

                board.attach(&widget);
                let conflicts = session.add_button(&widget, *id);
                let label = label.clone().unwrap_or_else(|| format!("Button {}", id));
                self.place(*rect, element, ControlView::Button { widget, label });
                conflicts
            }
            ControlConfig::Toggle {
                rect,
                id,
                state,
                label,
            } => {
                let element = Element::default();
                let widget = match state {
                    Some(state) => ToggleButton::seeded(element.clone(), *state),
                    None => ToggleButton::new(element.clone()),
                };
                let widget = Rc::new(RefCell::new(widget));

                board.attach(&widget);
                let conflicts = session.add_button(&widget, *id);
                let label = label.clone().unwrap_or_else(|| format!("Toggle {}", id));
                self.place(*rect, element, ControlView::Toggle { widget, label });
                conflicts
            }
        };

        // Collisions are reported but the control stays registered
        for conflict in conflicts {
            warn!("Control {}: {}", index, conflict);
            self.errors.push(LayoutError::Conflict { index, conflict });
        }
        Ok(())
    }

    // Spring toggle drives the slider's spring mode and starts synchronized with it
    fn add_spring_toggle(
        &mut self,
        config: &SpringToggleConfig,
        slider: &Rc<RefCell<Slider>>,
        board: &mut ControlBoard,
    ) {
        let element = Element::default();
        let toggle = Rc::new(RefCell::new(ToggleButton::seeded(
            element.clone(),
            config.state.unwrap_or(false),
        )));

        let target = Rc::downgrade(slider);
        toggle.borrow_mut().subscribe(move |is_spring| {
            let Some(slider) = target.upgrade() else {
                return;
            };
            match slider.try_borrow_mut() {
                Ok(mut slider) => slider.set_spring_mode(*is_spring),
                Err(_) => warn!("Slider busy, spring mode not applied"),
            };
        });

        board.attach(&toggle);
        self.place(
            config.rect,
            element,
            ControlView::Toggle {
                widget: toggle,
                label: "Spring".to_string(),
            },
        );
    }

    fn place(&mut self, rect: Rect, element: Element, view: ControlView) {
        self.controls.push(PlacedControl {
            rect,
            element,
            view,
        });
    }
}
