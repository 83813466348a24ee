//! # cine-core-view
//!
//! Cine auto-play scheduling for multi-viewport medical image viewers.
//!
//! This crate provides platform-agnostic data structures and logic for:
//! - Sharing repeating timers between viewports that play at the same rate
//! - Splitting and cancelling timers as viewports are retimed or stopped
//! - Validating loosely-shaped playback requests from a UI layer
//! - Tracking per-viewport toolbar cine state and batching its changes
//!
//! Rendering is left to the host: on every tick the controller asks a
//! [`FrameAdvancer`] to move a viewport to its adjacent frame.
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for data structures
//! - `toml` - Load [`CineConfig`] from TOML
//! - `tokio` - Timers backed by a tokio runtime
//! - `web` - Timers backed by `window.setInterval` in WASM hosts
//!
//! ## Example
//!
//! ```rust,ignore
//! use cine_core_view::{CineController, Direction, ManualTimer, PlayOptions, ViewportRef};
//!
//! let mut controller = CineController::new(timer, frame_count, advance_frame);
//!
//! // Play two viewports on one shared timer
//! let viewports = [
//!     ViewportRef::new(0, vec![series_a]),
//!     ViewportRef::new(1, vec![series_b]),
//! ];
//! controller.update(Direction::Forward, &viewports, PlayOptions::playing(24.0));
//!
//! // When the timer fires
//! controller.tick(handle);
//! ```

mod cine_state;
mod config;
mod controller;
mod data;
mod registry;
mod request;
pub mod timer;

pub use cine_state::{CineBatch, CineState, CineStates};
pub use config::{CineConfig, ConfigError, FrameRateLimits};
pub use controller::{CineController, FrameAdvancer, FrameCountError, FrameCounter};
pub use data::{AdvanceOptions, Direction, PlayOptions, PlaybackOperation, ViewportId, ViewportRef};
pub use registry::PlaybackRegistry;
pub use request::{CineRequest, RawDirection, RawPlayOptions, RawViewport, RequestError, ValidRequest};
pub use timer::{tick_period, ManualTimer, TimerError, TimerFacility, TimerHandle};

#[cfg(feature = "tokio")]
pub use timer::tokio_timer::TokioTimer;

#[cfg(feature = "web")]
pub use controller::web::WebCinePlayer;
#[cfg(feature = "web")]
pub use timer::web::IntervalTimer;
