use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Sorted listing of the entry names directly inside a series directory.
///
/// Naming and numbering are derived from a snapshot, never cached between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    entries: Vec<String>,
}

impl DirectorySnapshot {
    pub fn read(dir: &Path) -> io::Result<Self> {
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<walkdir::Result<Vec<_>>>()
            .map_err(io::Error::from)?;

        Ok(Self::from_names(entries))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<String> = names.into_iter().map(Into::into).collect();
        entries.sort();
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::create_series_dir;

    #[test]
    fn read_lists_sorted_top_level_entries() {
        let dir = create_series_dir("Show", &["Show - 02.mkv", "Show - 01.mkv", "b.nfo"]);
        std::fs::create_dir(dir.path().join("Show").join("extras")).unwrap();
        std::fs::write(dir.path().join("Show/extras/nested.mkv"), b"x").unwrap();

        let snapshot = DirectorySnapshot::read(&dir.path().join("Show")).unwrap();
        let names: Vec<&str> = snapshot.iter().collect();

        assert_eq!(names, vec!["Show - 01.mkv", "Show - 02.mkv", "b.nfo", "extras"]);
        assert!(snapshot.iter().any(|n| n == "b.nfo"));
        assert!(!snapshot.iter().any(|n| n == "nested.mkv"));
    }

    #[test]
    fn read_missing_dir_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(DirectorySnapshot::read(&dir.path().join("nope")).is_err());
    }
}
