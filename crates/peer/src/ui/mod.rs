//! Status display and level-toggle adapters.
//!
//! This module provides the device-facing collaborators of a node:
//! - Renderers that show received text and flash the current level
//! - Toggle inputs that report level-toggle presses

pub mod render;
pub mod toggle;

pub use render::{ConsoleRenderer, RecordingRenderer, TracingRenderer};
pub use toggle::{NeverPressed, ScriptedToggle, StdinToggle};
