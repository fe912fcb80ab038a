use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

pub const REPLAY_EXTENSION: &str = "replay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

fn is_replay(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == REPLAY_EXTENSION)
}

/// Collects replay files under `root`, oldest modification first. A path to a
/// single file is returned as-is regardless of its extension.
pub fn find_replays(root: &Path) -> anyhow::Result<Vec<ReplayEntry>> {
    if root.is_file() {
        let modified = root.metadata()?.modified()?;
        return Ok(vec![ReplayEntry {
            path: root.to_path_buf(),
            modified,
        }]);
    }

    let mut replays = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_replay(entry.path()) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        replays.push(ReplayEntry {
            path: entry.into_path(),
            modified,
        });
    }
    replays.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(replays)
}
