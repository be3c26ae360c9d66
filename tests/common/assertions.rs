//! Custom assertions and waiting helpers for on-disk and async state

use city_directory::storage::ContentStore;
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

/// Relative paths of every file under `root`, sorted, with `/` separators
pub fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

/// Assert that no atomic-write temp file was left behind
pub fn assert_no_temp_files(root: &Path) {
    let leftovers: Vec<String> = files_under(root)
        .into_iter()
        .filter(|p| p.rsplit('/').next().is_some_and(|name| name.starts_with(".tmp-")))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

/// Poll until `prefix` lists at least `count` blobs
///
/// Cache entries are written on a background task, so tests wait for them.
pub async fn wait_for_blobs(store: &dyn ContentStore, prefix: &str, count: usize, timeout: Duration) -> bool {
    let result = tokio::time::timeout(timeout, async {
        loop {
            if let Ok(entries) = store.list_by_prefix(prefix).await
                && entries.len() >= count
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    result.is_ok()
}
