use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info};

/// Stream properties probed from the input before decoding.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate exactly as ffprobe reports it, e.g. "30000/1001". Handed to
    /// the encoder verbatim so output timing matches the input.
    pub frame_rate: String,
    /// Frame rate as a float, for logs and summaries.
    pub fps: f64,
}

fn probe(path: &Path) -> Result<StreamInfo> {
    info!(?path, "probing input stream with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe — is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {}", stderr.trim());
    }

    // Output format: "width,height,num/den"
    let stdout = String::from_utf8_lossy(&output.stdout);
    let fields: Vec<&str> = stdout.trim().split(',').collect();
    let [width, height, rate] = fields[..] else {
        bail!("unexpected ffprobe output: {stdout}");
    };

    let width: u32 = width.parse().context("failed to parse stream width")?;
    let height: u32 = height.parse().context("failed to parse stream height")?;
    let fps = parse_frame_rate(rate)
        .with_context(|| format!("failed to parse frame rate {rate:?}"))?;
    if fps <= 0.0 {
        bail!("input reports a non-positive frame rate: {rate}");
    }

    info!(width, height, fps, frame_rate = rate, "probe complete");

    Ok(StreamInfo {
        width,
        height,
        frame_rate: rate.to_owned(),
        fps,
    })
}

/// Parse ffprobe's rational frame rate ("num/den") or a plain number.
fn parse_frame_rate(rate: &str) -> Result<f64> {
    if let Some((num, den)) = rate.split_once('/') {
        let num: f64 = num.parse().context("bad numerator")?;
        let den: f64 = den.parse().context("bad denominator")?;
        if den <= 0.0 {
            bail!("zero denominator");
        }
        Ok(num / den)
    } else {
        Ok(rate.parse()?)
    }
}

/// Decodes the input into raw rgb24 frames by piping from the ffmpeg CLI.
pub struct VideoDecoder {
    child: Child,
    info: StreamInfo,
    frame_bytes: usize,
    frames_read: usize,
}

impl VideoDecoder {
    /// Probe the input and start the decode stream.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("input video does not exist: {}", path.display());
        }

        let info = probe(path)?;
        assert!(
            info.width > 0 && info.height > 0,
            "probed dimensions must be positive"
        );

        info!(?path, "spawning ffmpeg decoder process");

        let child = Command::new("ffmpeg")
            .args(["-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn ffmpeg — is ffmpeg installed?")?;

        let frame_bytes = info.width as usize * info.height as usize * 3;

        Ok(Self {
            child,
            info,
            frame_bytes,
            frames_read: 0,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Read the next frame from the ffmpeg pipe, or `None` once the stream is
    /// fully drained.
    pub fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .context("ffmpeg stdout not captured")?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut filled = 0;
        while filled < self.frame_bytes {
            let n = stdout
                .read(&mut buf[filled..])
                .context("failed to read from ffmpeg pipe")?;
            if n == 0 {
                if filled == 0 {
                    debug!(total_frames = self.frames_read, "decode stream finished");
                    return Ok(None);
                }
                error!(
                    read_bytes = filled,
                    expected_bytes = self.frame_bytes,
                    frame = self.frames_read,
                    "ffmpeg stream ended mid-frame"
                );
                bail!(
                    "ffmpeg stream ended mid-frame ({filled}/{} bytes of frame {})",
                    self.frame_bytes,
                    self.frames_read,
                );
            }
            filled += n;
        }

        let frame = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .context("raw frame bytes did not fit the probed dimensions")?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    /// Drain the whole stream into memory. The blur window reaches two frames
    /// forward, so the filter wants the entire video resident before it
    /// touches a single pixel.
    pub fn collect_frames(&mut self) -> Result<Vec<RgbImage>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        info!(frame_count = frames.len(), "loaded all frames into memory");
        Ok(frames)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        debug!(total_frames = self.frames_read, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
