use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, info};

/// Output video codec. Fixed, not user-configurable.
const VIDEO_CODEC: &str = "libx264";
/// Output audio codec for the re-attached original track.
const AUDIO_CODEC: &str = "libmp3lame";

/// Parameters for the encode stage.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    /// Frame rate in ffprobe's rational form, e.g. "30000/1001".
    pub frame_rate: String,
    /// File whose audio track is muxed into the output, so the blurred video
    /// keeps the original soundtrack.
    pub audio_source: PathBuf,
}

/// Encodes raw rgb24 frames piped into an ffmpeg child process, muxing in the
/// audio track of the original input.
pub struct VideoEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    output: PathBuf,
    frame_bytes: usize,
    frames_written: usize,
}

impl VideoEncoder {
    /// Spawn the encoder process. Frames are expected on `write_frame` in
    /// presentation order; ffmpeg assigns timestamps from the frame rate.
    pub fn create(output: &Path, settings: &EncodeSettings) -> Result<Self> {
        let video_size = format!("{}x{}", settings.width, settings.height);

        info!(
            ?output,
            video_size = %video_size,
            frame_rate = %settings.frame_rate,
            "spawning ffmpeg encoder process"
        );

        let mut child = Command::new("ffmpeg")
            .args(["-y", "-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-video_size", &video_size])
            .args(["-framerate", &settings.frame_rate])
            .args(["-i", "pipe:0", "-i"])
            .arg(&settings.audio_source)
            // The trailing '?' keeps silent inputs working: no audio stream,
            // no mapping.
            .args(["-map", "0:v:0", "-map", "1:a:0?"])
            .args(["-c:v", VIDEO_CODEC, "-pix_fmt", "yuv420p"])
            .args(["-c:a", AUDIO_CODEC])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn ffmpeg — is ffmpeg installed?")?;

        let stdin = child.stdin.take().context("ffmpeg stdin not captured")?;
        let stderr = child.stderr.take().context("ffmpeg stderr not captured")?;

        // Drain stderr concurrently so ffmpeg cannot block on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut stderr = stderr;
            let mut text = String::new();
            match stderr.read_to_string(&mut text) {
                Ok(_) => text,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            output: output.to_path_buf(),
            frame_bytes: settings.width as usize * settings.height as usize * 3,
            frames_written: 0,
        })
    }

    /// Stream one frame's raw samples to the encoder.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let raw = frame.as_raw();
        if raw.len() != self.frame_bytes {
            bail!(
                "frame {} holds {} bytes, expected {}",
                self.frames_written,
                raw.len(),
                self.frame_bytes,
            );
        }

        let stdin = self.stdin.as_mut().context("encoder already finished")?;
        stdin
            .write_all(raw)
            .with_context(|| format!("failed to pipe frame {} to ffmpeg", self.frames_written))?;

        self.frames_written += 1;
        debug!(frame_number = self.frames_written - 1, "frame piped to encoder");
        Ok(())
    }

    /// Close the frame stream and wait for ffmpeg to finalize the container.
    pub fn finish(mut self) -> Result<()> {
        drop(self.stdin.take());

        let status = self.child.wait().context("failed to wait on ffmpeg")?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task
                .join()
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
            None => String::new(),
        };

        if !status.success() {
            bail!("ffmpeg encode failed (status {status}): {}", stderr.trim());
        }

        info!(
            output = ?self.output,
            frames = self.frames_written,
            "output video written"
        );
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        // Only reached when finish() never ran; don't leave ffmpeg waiting on
        // a pipe that will never close.
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
