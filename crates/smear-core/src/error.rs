use std::path::PathBuf;

use thiserror::Error;

/// Failures of the blur run. Every variant is terminal: the tool has no
/// partial-success mode, so the first error aborts the whole run before a
/// usable output file exists.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The input path could not be opened, probed, or decoded.
    #[error("decode failed for {}: {reason}", .path.display())]
    InputUnreadable { path: PathBuf, reason: String },

    /// The decoder finished without producing a single frame.
    #[error("decode produced no frames")]
    EmptySequence,

    /// A decoded frame does not match the dimensions of the first frame.
    #[error(
        "decode produced inconsistent frames: frame {index} is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    InconsistentDimensions {
        index: usize,
        got_width: u32,
        got_height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// A blend window frame does not match the window's dimensions. Should be
    /// unreachable given the sequence invariant, but the kernel checks anyway:
    /// a corrupt buffer here would silently corrupt every output sample.
    #[error(
        "blend window corrupt: frame is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        got_width: u32,
        got_height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// The encoder could not be started or could not write the output file.
    #[error("encode failed for {}: {reason}", .path.display())]
    OutputWriteFailure { path: PathBuf, reason: String },
}
