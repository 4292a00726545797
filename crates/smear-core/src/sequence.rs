use image::RgbImage;
use tracing::debug;

use crate::error::FilterError;

/// Number of frames blended into one output frame.
pub const WINDOW_LEN: usize = 5;

/// The entire decoded video, resident in memory. The temporal window reaches
/// two frames forward, so frames cannot be blended as they stream in.
/// Frames are read-only once loaded.
pub struct FrameSequence {
    frames: Vec<RgbImage>,
    width: u32,
    height: u32,
}

/// Borrowed view of the five frames blended for one output index: two
/// previous, the current frame, two next. Near the ends of the sequence
/// several slots alias the same edge frame.
pub struct TemporalWindow<'a> {
    pub frames: [&'a RgbImage; WINDOW_LEN],
}

impl FrameSequence {
    /// Take ownership of the decoded frames, verifying that every frame
    /// matches the dimensions of the first.
    pub fn load(frames: Vec<RgbImage>) -> Result<Self, FilterError> {
        let Some(first) = frames.first() else {
            return Err(FilterError::EmptySequence);
        };
        let (width, height) = first.dimensions();
        assert!(width > 0 && height > 0, "decoded frames must not be empty");

        for (index, frame) in frames.iter().enumerate() {
            if frame.dimensions() != (width, height) {
                return Err(FilterError::InconsistentDimensions {
                    index,
                    got_width: frame.width(),
                    got_height: frame.height(),
                    expected_width: width,
                    expected_height: height,
                });
            }
        }

        debug!(
            frame_count = frames.len(),
            width, height, "frame sequence loaded"
        );

        Ok(Self {
            frames,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Look up a frame by temporal position, clamping out-of-range positions
    /// to the nearest edge. The first and last frames stand in for their
    /// missing neighbors rather than wrapping, mirroring, or padding with
    /// black, so edge frames are blended with extra weight on themselves.
    pub fn at(&self, position: i64) -> &RgbImage {
        let last = self.frames.len() as i64 - 1;
        &self.frames[position.clamp(0, last) as usize]
    }

    /// The five-frame window centered on `index`.
    pub fn window(&self, index: usize) -> TemporalWindow<'_> {
        let center = index as i64;
        TemporalWindow {
            frames: [
                self.at(center - 2),
                self.at(center - 1),
                self.at(center),
                self.at(center + 1),
                self.at(center + 2),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn load_rejects_empty_input() {
        let result = FrameSequence::load(Vec::new());
        assert!(matches!(result, Err(FilterError::EmptySequence)));
    }

    #[test]
    fn load_rejects_inconsistent_dimensions() {
        let frames = vec![solid(2, 2, 0), solid(2, 2, 10), solid(3, 2, 20)];
        let result = FrameSequence::load(frames);
        match result {
            Err(FilterError::InconsistentDimensions {
                index,
                got_width,
                expected_width,
                ..
            }) => {
                assert_eq!(index, 2);
                assert_eq!(got_width, 3);
                assert_eq!(expected_width, 2);
            }
            _ => panic!("expected InconsistentDimensions"),
        }
    }

    #[test]
    fn at_clamps_to_sequence_edges() {
        let frames = vec![solid(1, 1, 0), solid(1, 1, 100), solid(1, 1, 200)];
        let seq = FrameSequence::load(frames).unwrap();

        assert!(std::ptr::eq(seq.at(-1), seq.at(0)));
        assert!(std::ptr::eq(seq.at(-100), seq.at(0)));
        assert!(std::ptr::eq(seq.at(3), seq.at(2)));
        assert!(std::ptr::eq(seq.at(100), seq.at(2)));
        assert_eq!(seq.at(1).get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn window_duplicates_first_frame_at_start() {
        let frames = vec![solid(1, 1, 0), solid(1, 1, 100), solid(1, 1, 200)];
        let seq = FrameSequence::load(frames).unwrap();

        let window = seq.window(0);
        assert!(std::ptr::eq(window.frames[0], seq.at(0)));
        assert!(std::ptr::eq(window.frames[1], seq.at(0)));
        assert!(std::ptr::eq(window.frames[2], seq.at(0)));
        assert!(std::ptr::eq(window.frames[3], seq.at(1)));
        assert!(std::ptr::eq(window.frames[4], seq.at(2)));
    }

    #[test]
    fn window_duplicates_last_frame_at_end() {
        let frames = vec![solid(1, 1, 0), solid(1, 1, 100), solid(1, 1, 200)];
        let seq = FrameSequence::load(frames).unwrap();

        let window = seq.window(2);
        assert!(std::ptr::eq(window.frames[0], seq.at(0)));
        assert!(std::ptr::eq(window.frames[1], seq.at(1)));
        assert!(std::ptr::eq(window.frames[2], seq.at(2)));
        assert!(std::ptr::eq(window.frames[3], seq.at(2)));
        assert!(std::ptr::eq(window.frames[4], seq.at(2)));
    }

    #[test]
    fn window_of_single_frame_aliases_it_five_times() {
        let seq = FrameSequence::load(vec![solid(1, 1, 42)]).unwrap();
        let window = seq.window(0);
        for frame in window.frames {
            assert!(std::ptr::eq(frame, seq.at(0)));
        }
    }
}
