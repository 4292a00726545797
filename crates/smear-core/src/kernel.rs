use std::thread;

use image::RgbImage;

use crate::error::FilterError;
use crate::sequence::TemporalWindow;

/// Blend weights for (prev2, prev1, current, next1, next2). Fixed constants;
/// sums above 255 are absorbed by the output clamp.
const WEIGHTS: [f64; 5] = [0.2, 0.2, 0.4, 0.2, 0.2];

/// Compute one output frame from a five-frame window.
///
/// Every (row, column, channel) sample is independent: the weighted f64 sum
/// of the five source samples, clamped to [0, 255] and truncated toward zero.
/// The output buffer is split into contiguous row bands, one worker thread
/// per band; each band writes only its own disjoint region while all workers
/// read the shared source slices. The threads join before the frame is
/// returned, so callers see a fully assembled image.
pub fn blend(window: &TemporalWindow<'_>) -> Result<RgbImage, FilterError> {
    let (width, height) = window.frames[2].dimensions();
    for frame in window.frames {
        if frame.dimensions() != (width, height) {
            return Err(FilterError::DimensionMismatch {
                got_width: frame.width(),
                got_height: frame.height(),
                expected_width: width,
                expected_height: height,
            });
        }
    }
    assert!(width > 0 && height > 0, "window frames must not be empty");

    let sources: [&[u8]; 5] = window.frames.map(|frame| frame.as_raw().as_slice());
    let row_bytes = width as usize * 3;

    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    let band_bytes = (height as usize).div_ceil(workers) * row_bytes;

    let mut output = RgbImage::new(width, height);
    thread::scope(|scope| {
        for (band_index, band) in output.chunks_mut(band_bytes).enumerate() {
            let offset = band_index * band_bytes;
            scope.spawn(move || blend_band(&sources, band, offset));
        }
    });

    Ok(output)
}

/// Blend the samples of one output band. `offset` is the band's byte position
/// within the frame; a sample's flat index is (row * width + column) * 3 +
/// channel, but the kernel never needs the coordinates themselves.
fn blend_band(sources: &[&[u8]; 5], band: &mut [u8], offset: usize) {
    for (i, sample) in band.iter_mut().enumerate() {
        let at = offset + i;
        let sum = WEIGHTS[0] * sources[0][at] as f64
            + WEIGHTS[1] * sources[1][at] as f64
            + WEIGHTS[2] * sources[2][at] as f64
            + WEIGHTS[3] * sources[3][at] as f64
            + WEIGHTS[4] * sources[4][at] as f64;
        // The cast truncates toward zero; the samples must not be rounded.
        *sample = sum.clamp(0.0, 255.0) as u8;
    }
}
