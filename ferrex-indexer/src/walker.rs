use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ferrex_contracts::Observer;
use ferrex_fs::FileSystem;
use ferrex_model::ScannedFile;
use tokio::sync::mpsc;

use crate::classify::classify;

/// Walks `root` breadth-first via `fs`, emitting a [`ScannedFile`] for
/// every recognized media/playlist file onto `tx` (§4.3 step 1).
/// `ReadDir`/`Stat` errors on a subtree are logged and that subtree is
/// skipped; they never abort the whole walk.
pub async fn walk(
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    observer: Arc<dyn Observer>,
    tx: mpsc::Sender<ScannedFile>,
) {
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(dir) = queue.pop_front() {
        let entries = match fs.read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), %err, "skipping subtree after read_dir error");
                observer.indexer_scan_error("unknown", "read_dir");
                continue;
            }
        };

        for entry in entries {
            if entry.is_dir {
                queue.push_back(entry.path);
                continue;
            }

            let name = match entry.path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let Some(kind) = classify(name) else {
                continue;
            };

            let stat = match fs.stat(&entry.path).await {
                Ok(stat) => stat,
                Err(err) => {
                    tracing::warn!(path = %entry.path.display(), %err, "skipping file after stat error");
                    observer.indexer_scan_error("unknown", "stat");
                    continue;
                }
            };

            let Some(relative) = relative_path(&root, &entry.path) else {
                continue;
            };

            if tx
                .send(ScannedFile {
                    path: relative,
                    kind,
                    size: stat.len,
                    mtime: stat.modified_unix,
                })
                .await
                .is_err()
            {
                return;
            }
        }
    }
}

fn relative_path(root: &Path, full: &Path) -> Option<String> {
    let relative = full.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
