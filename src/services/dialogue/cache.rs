//! Content-addressed output cache.
//!
//! A finished programme is stored as `<contentId>.mp3` with a
//! `<contentId>.mp3.json` sidecar next to it. The id depends only on the
//! format, the input ids (order-insensitive) and the speaking personas.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::{DialogueTurn, GenerationFormat};

/// Extension of generated programmes.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Compute the content identifier for a run.
pub fn content_id(format: GenerationFormat, ids: &[&str], participants: &[&str]) -> String {
    let mut sorted: Vec<&str> = ids.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(format.as_str().as_bytes());
    for id in sorted {
        hasher.update(b"\0");
        hasher.update(id.as_bytes());
    }
    hasher.update(b"\x01");
    for key in participants {
        hasher.update(b"\0");
        hasher.update(key.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// Final location of a programme in the output directory.
pub fn output_path(output_dir: &Path, content_id: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", content_id, AUDIO_EXTENSION))
}

/// Metadata sidecar path for an output file.
pub fn sidecar_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Metadata stored next to a finished programme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_seconds: Option<f64>,
    #[serde(default)]
    pub transcript: Vec<DialogueTurn>,
}

/// A previously finished programme.
#[derive(Debug, Clone)]
pub struct CachedOutput {
    pub path: PathBuf,
    pub sidecar: Option<Sidecar>,
}

/// Return the finished output for `content_id`, if one exists and is non-empty.
pub async fn lookup(output_dir: &Path, content_id: &str) -> Option<CachedOutput> {
    let path = output_path(output_dir, content_id);
    let meta = tokio::fs::metadata(&path).await.ok()?;
    if !meta.is_file() || meta.len() == 0 {
        return None;
    }

    let sidecar = match tokio::fs::read(sidecar_path(&path)).await {
        Ok(bytes) => match serde_json::from_slice::<Sidecar>(&bytes) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Ignoring unreadable sidecar for {}: {}", path.display(), e);
                None
            }
        },
        Err(_) => None,
    };

    Some(CachedOutput { path, sidecar })
}

/// Write the sidecar for `output`.
pub async fn write_sidecar(output: &Path, sidecar: &Sidecar) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(sidecar)?;
    tokio::fs::write(sidecar_path(output), json).await
}
