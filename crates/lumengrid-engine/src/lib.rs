//! Light show engine for the lumengrid installation
//!
//! Architecture layers:
//! - `color` - Color type and palette helpers
//! - `buffer` - The 3D light buffer: cells, addressing views, plane shifts
//! - `clock` - Speed-scaled animation clock
//! - `program` - The [`VisualProgram`] plugin contract
//! - `engine` - Run loop, lifecycle state machine, program registry
//! - `schedule` - Day/night auto-scheduling against a sun-event oracle
//! - `output` - Frame serialization and the [`Transmitter`] seam
//! - `state` - Shared status for external observation
//!
//! Output hardware plugs in behind the [`Transmitter`] trait; running
//! without one is supported for headless use.

pub mod buffer;
pub mod clock;
pub mod color;
pub mod engine;
pub mod error;
pub mod output;
pub mod program;
pub mod schedule;
pub mod state;

// Buffer exports
pub use buffer::{Axis, GridId, Layout, Light, LightBuffer, PlaneHandle};

// Clock exports
pub use clock::AnimationClock;

// Color exports
pub use color::Rgb;

// Engine exports
pub use engine::{EngineConfig, ExecListener, ShowEngine};

// Error exports
pub use error::{GeometryError, TransmitError};

// Output exports
pub use output::{ChannelLayout, FRAME_START, NullTransmitter, OutputFramer, Transmitter};

// Program exports
pub use program::VisualProgram;

// Schedule exports
pub use schedule::{FixedHoursClock, SunClock, SunEvent, SunEventKind};

// State exports
pub use state::StatusSnapshot;
