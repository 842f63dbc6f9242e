use episode_org_core::{compute_digests_with, Algorithm, DigestError};
use std::path::Path;

/// Receives byte-level progress while files are digested.
pub trait Progress {
    fn start_file(&self, _path: &Path, _len: u64) {}
    fn advance(&self, _bytes: u64) {}
    fn finish_file(&self) {}
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Digests `path` in one pass while reporting bytes read to `progress`.
pub fn digest_with_progress(
    path: &Path,
    algorithms: &[Algorithm],
    chunk_size: usize,
    progress: &dyn Progress,
) -> Result<Vec<String>, DigestError> {
    let len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    progress.start_file(path, len);
    let result = compute_digests_with(path, algorithms, chunk_size, |n| {
        progress.advance(n as u64)
    });
    progress.finish_file();
    result
}
