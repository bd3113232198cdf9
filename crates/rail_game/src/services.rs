//! Capability interfaces for collaborators outside the runtime.
//!
//! Camera projection, rendering and input-device polling live elsewhere; the
//! components only see these narrow traits. [`GameServices`] bundles them
//! with session-wide state (the raft entity, cardboard mode) and is shared
//! through the manager's [`Services`](rail_ecs::Services) context.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rail_ecs::Entity;
use rail_math::{Pose, Vec2, Vec3};

/// Camera basis and viewport, as needed to turn a touch into a ray.
pub trait Camera {
    /// Vertical field of view, in radians.
    fn viewport_angle(&self) -> f32;
    /// Viewport size in pixels.
    fn viewport_resolution(&self) -> Vec2;
    /// Camera up vector in world space.
    fn up(&self) -> Vec3;
    /// Camera right vector in world space.
    fn right(&self) -> Vec3;
}

/// The window the game is drawn into.
pub trait Renderer {
    /// Window size in pixels.
    fn window_size(&self) -> Vec2;
}

/// State of a digital button as of the last controller update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Whether the button is held.
    pub value: bool,
    /// Whether `value` changed during the last update.
    pub has_changed: bool,
}

impl ButtonState {
    /// Returns `true` on the update the button was pressed.
    #[must_use]
    pub fn went_down(&self) -> bool {
        self.value && self.has_changed
    }
}

/// A player's input device.
pub trait InputController {
    /// Poll the device. Called once per frame while the player is enabled.
    fn update(&mut self);
    /// Direction the player is looking, in world space.
    fn facing(&self) -> Vec3;
    /// The fire button.
    fn fire_button(&self) -> ButtonState;
    /// Last touch or pointer position in window pixels; negative when there
    /// is none.
    fn last_position(&self) -> Vec2;
}

/// Shared handle to an input controller.
pub type ControllerHandle = Rc<RefCell<dyn InputController>>;

/// Session-wide collaborators and flags.
#[derive(Default)]
pub struct GameServices {
    camera: Option<Rc<dyn Camera>>,
    renderer: Option<Rc<dyn Renderer>>,
    in_cardboard: Cell<bool>,
    raft_entity: Cell<Option<Entity>>,
}

impl GameServices {
    /// No camera, no renderer, not in cardboard mode, no raft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a camera.
    #[must_use]
    pub fn with_camera(mut self, camera: Rc<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Attach a renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Rc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// The camera, if any.
    #[must_use]
    pub fn camera(&self) -> Option<&Rc<dyn Camera>> {
        self.camera.as_ref()
    }

    /// The renderer, if any.
    #[must_use]
    pub fn renderer(&self) -> Option<&Rc<dyn Renderer>> {
        self.renderer.as_ref()
    }

    /// Whether the game is rendering for a head-mounted viewer.
    #[must_use]
    pub fn is_in_cardboard(&self) -> bool {
        self.in_cardboard.get()
    }

    /// Enter or leave cardboard mode.
    pub fn set_in_cardboard(&self, in_cardboard: bool) {
        self.in_cardboard.set(in_cardboard);
    }

    /// The raft the player rides, if one is loaded.
    #[must_use]
    pub fn raft_entity(&self) -> Option<Entity> {
        self.raft_entity.get()
    }

    /// Set or clear the raft entity.
    pub fn set_raft_entity(&self, raft: Option<Entity>) {
        self.raft_entity.set(raft);
    }
}

impl fmt::Debug for GameServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameServices")
            .field("camera", &self.camera.is_some())
            .field("renderer", &self.renderer.is_some())
            .field("in_cardboard", &self.in_cardboard.get())
            .field("raft_entity", &self.raft_entity.get())
            .finish()
    }
}

/// A camera with a fixed basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCamera {
    /// Vertical field of view, in radians.
    pub viewport_angle: f32,
    /// Viewport size in pixels.
    pub viewport_resolution: Vec2,
    /// Up vector.
    pub up: Vec3,
    /// Right vector.
    pub right: Vec3,
}

impl Default for FixedCamera {
    fn default() -> Self {
        Self {
            viewport_angle: std::f32::consts::FRAC_PI_4,
            viewport_resolution: Vec2::new(1280.0, 720.0),
            up: Pose::UP,
            right: Vec3::X,
        }
    }
}

impl Camera for FixedCamera {
    fn viewport_angle(&self) -> f32 {
        self.viewport_angle
    }

    fn viewport_resolution(&self) -> Vec2 {
        self.viewport_resolution
    }

    fn up(&self) -> Vec3 {
        self.up
    }

    fn right(&self) -> Vec3 {
        self.right
    }
}

/// A renderer that only reports a window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessRenderer {
    /// Window size in pixels.
    pub window_size: Vec2,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self {
            window_size: Vec2::new(1280.0, 720.0),
        }
    }
}

impl Renderer for HeadlessRenderer {
    fn window_size(&self) -> Vec2 {
        self.window_size
    }
}

/// A controller driven by code rather than a device.
///
/// The host sets the button and facing between frames; `update` derives
/// `has_changed` from the previous update, as a polled device would.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    facing: Vec3,
    last_position: Vec2,
    pressed: bool,
    previous: bool,
    fire: ButtonState,
}

impl Default for ScriptedController {
    fn default() -> Self {
        Self {
            facing: Pose::FORWARD,
            last_position: Vec2::splat(-1.0),
            pressed: false,
            previous: false,
            fire: ButtonState::default(),
        }
    }
}

impl ScriptedController {
    /// Facing forward, button released, no touch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold or release the fire button.
    pub fn set_fire(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    /// Look in a new direction.
    pub fn set_facing(&mut self, facing: Vec3) {
        self.facing = facing;
    }

    /// Report a touch at `position`, in window pixels.
    pub fn set_last_position(&mut self, position: Vec2) {
        self.last_position = position;
    }
}

impl InputController for ScriptedController {
    fn update(&mut self) {
        self.fire = ButtonState {
            value: self.pressed,
            has_changed: self.pressed != self.previous,
        };
        self.previous = self.pressed;
    }

    fn facing(&self) -> Vec3 {
        self.facing
    }

    fn fire_button(&self) -> ButtonState {
        self.fire
    }

    fn last_position(&self) -> Vec2 {
        self.last_position
    }
}
