//! smear core: temporal motion blur over decoded video frames.
//!
//! Each output frame is the weighted blend of five temporally adjacent input
//! frames (two previous, the current frame, two next), with edge frames
//! standing in for missing neighbors at the start and end of the video. The
//! whole input is decoded into memory before blending and encoded in one pass
//! afterwards; decode and encode are delegated to ffmpeg subprocesses, while
//! this crate owns the frame buffer, the blend kernel, and the pipeline that
//! keeps output frames in input order.

pub mod error;
pub mod kernel;
pub mod pipeline;
pub mod sequence;
pub mod video;

pub use error::FilterError;
pub use pipeline::{blur_sequence, run_pipeline, PipelineConfig, ProgressFn, RunSummary};
pub use sequence::{FrameSequence, TemporalWindow};
