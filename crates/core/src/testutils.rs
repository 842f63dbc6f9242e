use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a temp dir holding one series directory named `series`, populated with `files`.
///
/// Each file's content is its own name, so digests differ between files.
pub fn create_series_dir(series: &str, files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let series_dir = dir.path().join(series);
    fs::create_dir(&series_dir).unwrap();

    for name in files {
        write_file(&series_dir, name, name.as_bytes());
    }

    dir
}

pub fn write_file(dir: impl AsRef<Path>, name: &str, content: &[u8]) {
    fs::write(dir.as_ref().join(name), content).unwrap();
}
