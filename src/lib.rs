//! Terminal control protocol engine.
//!
//! Turns raw terminal input into structured events and an application's desired screen into the
//! smallest stream of control sequences that brings the terminal up to date.
//!
//! # Public API Overview
//! - Drive a terminal with [`Engine`]: negotiate capabilities, enter application mode, render.
//! - Write through [`Window`]s into the [`Screen`]; [`Engine::render`] diffs and writes once.
//! - Read [`Event`]s (keys, mouse, paste, focus, resize) from [`Engine::next_event`].
//! - Show pictures with [`Image`], which picks kitty, sixel or half blocks from capabilities.
//! - Decode input without a tty through [`Tokenizer`] and [`Decoder`].

#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod graphics;
pub mod input;
pub mod platform;
pub mod render;
pub mod runtime;

/// Errors and results.
pub use crate::error::{Error, Result};

/// Environment configuration.
pub use crate::config::EnvConfig;

/// Cell, color and style model.
pub use crate::core::cell::{Cell, Character, WidthMethod};
pub use crate::core::color::{Color, ColorKind};
pub use crate::core::grid::Grid;
pub use crate::core::style::{AttributeMask, Hyperlink, Style, UnderlineStyle};

/// Negotiated terminal capabilities.
pub use crate::core::capabilities::{Capabilities, CellDimensions, GraphicsProtocol, Report};

/// Input events.
pub use crate::core::event::{Event, Inbound, Resize};
pub use crate::core::key::{Key, KeyEventType, Modifiers};
pub use crate::core::mouse::{Mouse, MouseButton, MouseEventType};

/// Terminal interface and the process-backed implementation.
pub use crate::core::terminal::Terminal;
pub use crate::platform::process_terminal::ProcessTerminal;

/// Input pipeline.
pub use crate::core::token::Token;
pub use crate::input::decoder::{Decoder, Dialect};
pub use crate::platform::tokenizer::Tokenizer;

/// Rendering.
pub use crate::render::renderer::DiffRenderer;
pub use crate::render::screen::{CursorShape, CursorState, Screen, Window};

/// Graphics.
pub use crate::graphics::image::Image;
pub use crate::graphics::placement::{Placement, PlacementAction, PlacementStyle};

/// Runtime.
pub use crate::runtime::engine::Engine;
pub use crate::runtime::queue::Queue;
