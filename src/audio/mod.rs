//! Merging per-turn audio files into one programme.
//!
//! Uses the `ffmpeg` concat demuxer when the binary is on `PATH`. Without it,
//! files are byte-concatenated: MP3 frames survive that, but players may
//! report a wrong duration.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors that can occur while merging audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio input does not exist: {0}")]
    MissingInput(PathBuf),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the merged file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMethod {
    Ffmpeg,
    ByteConcat,
}

impl ConcatMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::ByteConcat => "byte-concat",
        }
    }
}

/// Concatenates audio files with `ffmpeg`, or raw bytes as a fallback.
#[derive(Debug, Clone)]
pub struct AudioConcatenator {
    ffmpeg: Option<PathBuf>,
}

impl Default for AudioConcatenator {
    fn default() -> Self {
        Self::detect()
    }
}

impl AudioConcatenator {
    /// Look up `ffmpeg` on `PATH`.
    pub fn detect() -> Self {
        let ffmpeg = which::which("ffmpeg").ok();
        match &ffmpeg {
            Some(path) => debug!("Using ffmpeg at {}", path.display()),
            None => warn!("ffmpeg not found on PATH; audio will be byte-concatenated"),
        }
        Self { ffmpeg }
    }

    /// Always byte-concatenate.
    pub fn without_ffmpeg() -> Self {
        Self { ffmpeg: None }
    }

    pub fn has_ffmpeg(&self) -> bool {
        self.ffmpeg.is_some()
    }

    /// Merge `inputs` in order into `dest`.
    ///
    /// Every input must exist; nothing is written otherwise.
    pub async fn concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<ConcatMethod, AudioError> {
        for input in inputs {
            if !tokio::fs::try_exists(input).await.unwrap_or(false) {
                return Err(AudioError::MissingInput(input.clone()));
            }
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match &self.ffmpeg {
            Some(ffmpeg) => {
                concat_with_ffmpeg(ffmpeg, inputs, dest).await?;
                info!("Merged {} files with ffmpeg into {}", inputs.len(), dest.display());
                Ok(ConcatMethod::Ffmpeg)
            }
            None => {
                warn!(
                    "Byte-concatenating {} files into {}; duration metadata may be wrong",
                    inputs.len(),
                    dest.display()
                );
                concat_bytes(inputs, dest).await?;
                Ok(ConcatMethod::ByteConcat)
            }
        }
    }
}

/// Render an ffmpeg concat demuxer list.
///
/// ffmpeg resolves relative entries against the list file's directory, so
/// every entry is made absolute first.
fn concat_list(inputs: &[PathBuf]) -> std::io::Result<String> {
    let mut list = String::new();
    for input in inputs {
        let path = std::path::absolute(input)?;
        let escaped = path.to_string_lossy().replace('\'', r"'\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    Ok(list)
}

async fn concat_with_ffmpeg(ffmpeg: &Path, inputs: &[PathBuf], dest: &Path) -> Result<(), AudioError> {
    let list_path = dest.with_extension("concat.txt");
    tokio::fs::write(&list_path, concat_list(inputs)?).await?;

    let output = Command::new(ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    if let Err(e) = tokio::fs::remove_file(&list_path).await {
        debug!("Failed to remove concat list {}: {}", list_path.display(), e);
    }

    let output = output?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AudioError::Ffmpeg(stderr));
    }
    Ok(())
}

async fn concat_bytes(inputs: &[PathBuf], dest: &Path) -> Result<(), AudioError> {
    let mut out = tokio::fs::File::create(dest).await?;
    for input in inputs {
        let bytes = tokio::fs::read(input).await?;
        out.write_all(&bytes).await?;
    }
    out.flush().await?;
    Ok(())
}

/// Whether `ffprobe` is on `PATH`.
pub fn ffprobe_available() -> bool {
    which::which("ffprobe").is_ok()
}

/// Measure a file's duration in seconds with `ffprobe`.
pub async fn probe_duration(path: &Path) -> Result<f64, AudioError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AudioError::Ffmpeg(stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| AudioError::Ffmpeg(format!("unexpected ffprobe output: {}", stdout.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp3"), PathBuf::from("/tmp/it's.mp3")])
            .unwrap();
        assert_eq!(list, "file '/tmp/a.mp3'\nfile '/tmp/it'\\''s.mp3'\n");
    }

    #[test]
    fn test_concat_list_makes_relative_inputs_absolute() {
        let relative = PathBuf::from("data/work/abc-run/turn_000.mp3");
        let list = concat_list(&[relative.clone()]).unwrap();

        let expected = std::env::current_dir().unwrap().join(&relative);
        assert_eq!(list, format!("file '{}'\n", expected.display()));
        assert!(!list.contains("'data/"));
    }

    #[test]
    fn test_default_looks_for_ffmpeg() {
        assert_eq!(
            AudioConcatenator::default().has_ffmpeg(),
            which::which("ffmpeg").is_ok()
        );
        assert!(!AudioConcatenator::without_ffmpeg().has_ffmpeg());
    }

    #[tokio::test]
    async fn test_byte_concat_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp3");
        let b = dir.path().join("b.mp3");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();
        let dest = dir.path().join("out/merged.mp3");

        let method = AudioConcatenator::without_ffmpeg()
            .concat(&[a, b], &dest)
            .await
            .unwrap();

        assert_eq!(method, ConcatMethod::ByteConcat);
        assert_eq!(std::fs::read(&dest).unwrap(), b"firstsecond");
    }

    #[tokio::test]
    async fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp3");
        std::fs::write(&a, b"first").unwrap();
        let missing = dir.path().join("missing.mp3");
        let dest = dir.path().join("merged.mp3");

        let err = AudioConcatenator::without_ffmpeg()
            .concat(&[a, missing.clone()], &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, AudioError::MissingInput(p) if p == missing));
        assert!(!dest.exists());
    }

    async fn make_tone(dir: &Path, name: &str, seconds: f64) -> Option<PathBuf> {
        let path = dir.join(name);
        let status = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:duration={}", seconds))
            .args(["-ac", "1", "-ar", "22050", "-c:a", "pcm_s16le"])
            .arg(&path)
            .status()
            .await
            .ok()?;
        status.success().then_some(path)
    }

    #[tokio::test]
    async fn test_ffmpeg_concat_sums_durations() {
        let concatenator = AudioConcatenator::detect();
        if !concatenator.has_ffmpeg() || !ffprobe_available() {
            eprintln!("ffmpeg/ffprobe not available, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for (name, secs) in [("a.wav", 1.0), ("b.wav", 2.0), ("c.wav", 1.5)] {
            match make_tone(dir.path(), name, secs).await {
                Some(p) => inputs.push(p),
                None => {
                    eprintln!("ffmpeg cannot generate test tones, skipping");
                    return;
                }
            }
        }
        let dest = dir.path().join("merged.wav");

        let method = concatenator.concat(&inputs, &dest).await.unwrap();
        assert_eq!(method, ConcatMethod::Ffmpeg);

        let total = probe_duration(&dest).await.unwrap();
        assert!((total - 4.5).abs() < 0.2, "merged duration was {}", total);
    }
}
