use std::time::Duration;

use ferrex_catalog::CatalogStore;
use ferrex_model::{FileAttrs, ScannedFile};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Groups scanned files into batches of `batch_size` or `batch_timeout`,
/// whichever comes first, and upserts each batch atomically (§4.3 step 2).
/// Returns every path touched (upserted) across the whole run.
pub async fn run_batcher(
    mut rx: mpsc::Receiver<ScannedFile>,
    store: &CatalogStore,
    batch_size: usize,
    batch_timeout: Duration,
) -> Result<Vec<String>, ferrex_catalog::StorageError> {
    let mut touched = Vec::new();
    let mut batch: Vec<(String, FileAttrs)> = Vec::with_capacity(batch_size);
    let mut deadline = Instant::now() + batch_timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            item = rx.recv() => {
                match item {
                    Some(file) => {
                        touched.push(file.path.clone());
                        batch.push((
                            file.path.clone(),
                            FileAttrs {
                                name: file.path.rsplit('/').next().unwrap_or(&file.path).to_string(),
                                kind: file.kind,
                                size_bytes: file.size,
                                modified_at: file.mtime,
                            },
                        ));
                        if batch.len() >= batch_size {
                            flush(store, &mut batch).await?;
                            deadline = Instant::now() + batch_timeout;
                        }
                    }
                    None => {
                        flush(store, &mut batch).await?;
                        return Ok(touched);
                    }
                }
            }
            _ = tokio::time::sleep(remaining), if !batch.is_empty() => {
                flush(store, &mut batch).await?;
                deadline = Instant::now() + batch_timeout;
            }
        }
    }
}

async fn flush(
    store: &CatalogStore,
    batch: &mut Vec<(String, FileAttrs)>,
) -> Result<(), ferrex_catalog::StorageError> {
    if batch.is_empty() {
        return Ok(());
    }
    store.upsert_batch(batch).await?;
    batch.clear();
    Ok(())
}
