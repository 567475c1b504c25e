use std::path::Path;
use tracing::warn;

/// File names in `dir`, newest first, at most `limit`.
///
/// Names carry a `YYYYMMDD_HHMMSS` stamp, so reverse lexical order is newest
/// first. A missing directory yields an empty list.
pub async fn list_recent(dir: &Path, limit: usize) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Cannot list {}: {}", dir.display(), e);
            }
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let is_file = entry
                    .file_type()
                    .await
                    .map(|t| t.is_file())
                    .unwrap_or(false);
                if is_file {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error while listing {}: {}", dir.display(), e);
                break;
            }
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    names.truncate(limit);
    names
}
