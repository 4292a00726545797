use std::path::Path;

use image::RgbImage;
use tracing::{debug, info};

use crate::error::FilterError;
use crate::kernel;
use crate::sequence::FrameSequence;
use crate::video::decoder::VideoDecoder;
use crate::video::encoder::{EncodeSettings, VideoEncoder};

/// Observer for blur progress, called with (frames_done, total_frames) after
/// each blended frame. Observation only: it must not affect control flow or
/// frame order.
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send>;

/// Parameters for a blur run.
#[derive(Default)]
pub struct PipelineConfig {
    /// Invoked after each blended frame.
    pub progress: Option<ProgressFn>,
}

/// What a completed run produced, for the caller's final log line.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Run the whole filter: decode every frame into memory, blend each frame
/// with its temporal neighbors, and encode the result with the original
/// audio track attached.
pub fn run_pipeline(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<RunSummary, FilterError> {
    info!(?input, ?output, "pipeline starting");

    let mut decoder = VideoDecoder::open(input).map_err(|e| input_error(input, &e))?;
    let frames = decoder
        .collect_frames()
        .map_err(|e| input_error(input, &e))?;
    let stream = decoder.info().clone();
    drop(decoder);

    let sequence = FrameSequence::load(frames)?;
    let blurred = blur_sequence(&sequence, config.progress.as_ref())?;

    info!(?output, "saving processed video");
    let settings = EncodeSettings {
        width: sequence.width(),
        height: sequence.height(),
        frame_rate: stream.frame_rate.clone(),
        audio_source: input.to_path_buf(),
    };
    let mut encoder =
        VideoEncoder::create(output, &settings).map_err(|e| output_error(output, &e))?;
    for frame in &blurred {
        encoder
            .write_frame(frame)
            .map_err(|e| output_error(output, &e))?;
    }
    encoder.finish().map_err(|e| output_error(output, &e))?;

    info!(
        frame_count = sequence.len(),
        width = sequence.width(),
        height = sequence.height(),
        fps = stream.fps,
        "pipeline complete"
    );

    Ok(RunSummary {
        frame_count: sequence.len(),
        width: sequence.width(),
        height: sequence.height(),
        fps: stream.fps,
    })
}

/// Blend every frame of the sequence in index order: `output[i]` is the blend
/// of the window centered on input frame `i`. Index order is a hard
/// invariant: the encoder consumes frames strictly sequentially.
pub fn blur_sequence(
    sequence: &FrameSequence,
    progress: Option<&ProgressFn>,
) -> Result<Vec<RgbImage>, FilterError> {
    let total = sequence.len();
    let mut output = Vec::with_capacity(total);

    for index in 0..total {
        let window = sequence.window(index);
        output.push(kernel::blend(&window)?);

        debug!(frame_number = index, total_frames = total, "frame blended");
        if let Some(report) = progress {
            report(index + 1, total);
        }
    }

    Ok(output)
}

fn input_error(path: &Path, err: &anyhow::Error) -> FilterError {
    FilterError::InputUnreadable {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    }
}

fn output_error(path: &Path, err: &anyhow::Error) -> FilterError {
    FilterError::OutputWriteFailure {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use image::{Rgb, RgbImage};
    use tracing_test::traced_test;

    use super::*;

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(1, 1, Rgb([value, value, value]))
    }

    fn sample(frame: &RgbImage) -> u8 {
        frame.get_pixel(0, 0)[0]
    }

    #[test]
    #[traced_test]
    fn black_white_black_blends_to_expected_samples() {
        let seq = FrameSequence::load(vec![solid(0), solid(255), solid(0)]).unwrap();
        let out = blur_sequence(&seq, None).unwrap();

        // Frame 0 window is [f0, f0, f0, f1, f2]: 0.2*255 = 51.
        // Frame 1 window is [f0, f0, f1, f2, f2]: 0.4*255 = 102.
        // Frame 2 window is [f0, f1, f2, f2, f2]: 0.2*255 = 51.
        let samples: Vec<u8> = out.iter().map(sample).collect();
        assert_eq!(samples, vec![51, 102, 51]);
    }

    #[test]
    fn output_preserves_length_and_dimensions() {
        let frames: Vec<RgbImage> = (0..7)
            .map(|i| RgbImage::from_pixel(4, 3, Rgb([i * 30, 0, 255 - i * 30])))
            .collect();
        let seq = FrameSequence::load(frames).unwrap();
        let out = blur_sequence(&seq, None).unwrap();

        assert_eq!(out.len(), 7);
        for frame in &out {
            assert_eq!(frame.dimensions(), (4, 3));
        }
    }

    #[test]
    fn output_stays_in_input_order() {
        let seq = FrameSequence::load(vec![
            solid(0),
            solid(50),
            solid(100),
            solid(150),
            solid(200),
        ])
        .unwrap();
        let out = blur_sequence(&seq, None).unwrap();

        let samples: Vec<u8> = out.iter().map(sample).collect();
        assert_eq!(samples, vec![30, 70, 120, 170, 210]);
    }

    #[test]
    fn single_frame_sequence_blends_with_itself() {
        let seq = FrameSequence::load(vec![solid(100)]).unwrap();
        let out = blur_sequence(&seq, None).unwrap();

        // All five window slots alias the one frame; the weight sum of 1.2
        // brightens 100 to 120.
        assert_eq!(out.len(), 1);
        assert_eq!(sample(&out[0]), 120);
    }

    #[test]
    fn two_frame_sequence_weights_edges_on_themselves() {
        let seq = FrameSequence::load(vec![solid(10), solid(250)]).unwrap();
        let out = blur_sequence(&seq, None).unwrap();

        // Frame 0 window is [a, a, a, b, b], frame 1 window is [a, a, b, b, b].
        let samples: Vec<u8> = out.iter().map(sample).collect();
        assert_eq!(samples, vec![108, 204]);
    }

    #[test]
    fn rerunning_produces_bit_identical_output() {
        let frames: Vec<RgbImage> = (0..5)
            .map(|i| {
                RgbImage::from_fn(8, 6, |x, y| {
                    let v = ((x * 11 + y * 17 + i * 23) % 256) as u8;
                    Rgb([v, v / 3, 255 - v])
                })
            })
            .collect();

        let seq = FrameSequence::load(frames).unwrap();
        let first = blur_sequence(&seq, None).unwrap();
        let second = blur_sequence(&seq, None).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.as_raw(), b.as_raw());
        }
    }

    #[test]
    #[traced_test]
    fn progress_reports_every_frame_in_order() {
        let seq =
            FrameSequence::load(vec![solid(10), solid(20), solid(30)]).unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let progress: ProgressFn = Box::new(move |done, total| {
            sink.lock().unwrap().push((done, total));
        });

        blur_sequence(&seq, Some(&progress)).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
