//! Error types for the engine crate.

use crate::buffer::Axis;

/// Geometry errors raised by the `try_*` plane operations.
///
/// The legacy-named operations (`fill_plane`, `save_plane`, `set_plane`)
/// recover from all of these as silent no-ops; the `try_*` variants surface
/// them for tests and stricter callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// The addressed view has at least one zero dimension.
    #[error("view has a zero dimension")]
    EmptyView,
    /// The plane index falls outside the view along the given axis.
    #[error("plane index {index} out of range along {axis:?} (extent {extent})")]
    PlaneIndexOutOfRange {
        axis: Axis,
        index: i32,
        extent: usize,
    },
    /// A saved plane's dimensions do not match the destination plane.
    #[error("plane is {got_nx}x{got_ny} but the destination plane is {want_nx}x{want_ny}")]
    PlaneDimensionMismatch {
        got_nx: usize,
        got_ny: usize,
        want_nx: usize,
        want_ny: usize,
    },
}

/// Failure to hand a frame to the output hardware.
#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("transmit failed on channel {channel}: {reason}")]
    Channel { channel: usize, reason: String },
}
