//! Per-session scratch directories and their retention.
//!
//! Layout:
//! ```text
//! <work_dir>/<session_id>/
//!     1_high/{canonical/, overlay/, music.mp3, frames.txt, video.mp4, thumbnail.jpg}
//!     2_medium/...
//! ```
//! Artifacts stay on disk after the session for external serving; stale
//! sessions are removed by [`prune_stale_sessions`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reel_models::encoding::{
    CANONICAL_DIR_NAME, MUSIC_FILE_NAME, OVERLAY_DIR_NAME, THUMBNAIL_FILE_NAME,
};
use reel_models::{QualityTier, SessionId};
use tracing::{debug, info, warn};

use crate::error::{GenerationError, GenerationOutcome};

/// Exclusive scratch area for one generation.
#[derive(Debug, Clone)]
pub struct WorkSession {
    id: SessionId,
    root: PathBuf,
}

/// Paths owned by one tier attempt.
#[derive(Debug, Clone)]
pub struct AttemptDirs {
    pub root: PathBuf,
    pub canonical: PathBuf,
    pub overlay: PathBuf,
    pub music: PathBuf,
    pub thumbnail: PathBuf,
}

impl WorkSession {
    /// Create `<work_dir>/<id>`; fails if it already exists.
    ///
    /// The root is always absolute: the encoder's concat manifest resolves
    /// relative entries against its own directory.
    pub async fn create(work_dir: &Path, id: &SessionId) -> GenerationOutcome<Self> {
        if !id.is_path_safe() {
            return Err(GenerationError::input(format!(
                "Session id {:?} is not a valid directory name",
                id.as_str()
            )));
        }

        tokio::fs::create_dir_all(work_dir).await?;
        let root = std::path::absolute(work_dir)?.join(id.as_str());

        match tokio::fs::create_dir(&root).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(GenerationError::input(format!(
                    "Session {} already exists",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(session_id = %id, path = %root.display(), "Created session directory");

        Ok(Self {
            id: id.clone(),
            root,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory for attempt number `attempt` (1-based).
    pub async fn attempt_dirs(&self, attempt: u32, tier: &QualityTier) -> io::Result<AttemptDirs> {
        let root = self.root.join(format!("{}_{}", attempt, tier.name));
        let dirs = AttemptDirs {
            canonical: root.join(CANONICAL_DIR_NAME),
            overlay: root.join(OVERLAY_DIR_NAME),
            music: root.join(MUSIC_FILE_NAME),
            thumbnail: root.join(THUMBNAIL_FILE_NAME),
            root,
        };

        tokio::fs::create_dir_all(&dirs.canonical).await?;
        tokio::fs::create_dir_all(&dirs.overlay).await?;

        Ok(dirs)
    }
}

/// Remove session directories under `work_dir` last modified more than
/// `retention` ago. Returns how many were removed.
pub async fn prune_stale_sessions(work_dir: &Path, retention: Duration) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= retention {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                removed += 1;
                debug!(path = %path.display(), age_secs = age.as_secs(), "Removed stale session");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale session"),
        }
    }

    if removed > 0 {
        info!(removed, work_dir = %work_dir.display(), "Pruned stale sessions");
    }

    Ok(removed)
}
