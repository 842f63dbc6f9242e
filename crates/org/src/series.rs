use std::path::{Path, PathBuf};
use thiserror::Error;

use episode_org_core::{
    Algorithm, DigestError, DirectorySnapshot, EpisodeNumberer, NamingError, NamingScheme,
    NumberingError, SeriesIdentity, SeriesPattern,
};

use crate::config::{Config, ConfigError, CONFIG_FILENAME};
use crate::manifest::ManifestStore;
use crate::progress::{digest_with_progress, Progress};

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
    #[error("failed to list {}: {source}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle on one series directory. Holds no state derived from the listing.
#[derive(Debug, Clone)]
pub struct Series {
    dir: PathBuf,
    identity: SeriesIdentity,
    config: Config,
}

impl Series {
    pub fn open(dir: &Path) -> Result<Self, SeriesError> {
        let identity = SeriesIdentity::from_dir(dir)?;
        let config = Config::load_or_default(dir)?;
        tracing::debug!(dir = %dir.display(), basename = identity.basename(), "opened series");

        Ok(Self {
            dir: dir.to_path_buf(),
            identity,
            config,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn identity(&self) -> &SeriesIdentity {
        &self.identity
    }

    pub fn manifest(&self) -> ManifestStore {
        ManifestStore::for_series(&self.dir, &self.identity)
    }

    pub fn manifest_filename(&self) -> String {
        self.identity.manifest_filename()
    }

    /// Entries never reported as unchecked.
    pub fn is_reserved(&self, filename: &str) -> bool {
        filename == self.manifest_filename()
            || filename == CONFIG_FILENAME
            || filename == "."
            || filename == ".."
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn snapshot(&self) -> Result<DirectorySnapshot, SeriesError> {
        DirectorySnapshot::read(&self.dir).map_err(|source| SeriesError::Listing {
            path: self.dir.clone(),
            source,
        })
    }

    /// Derives the naming scheme from the current listing.
    pub fn numberer(&self) -> Result<EpisodeNumberer, SeriesError> {
        let snapshot = self.snapshot()?;
        let pattern = SeriesPattern::new(&self.identity, &self.config.naming)?;
        let episodes = pattern.episode_files(&snapshot)?;
        let scheme = NamingScheme::derive(&self.identity, &episodes, &self.config.naming)?;
        Ok(EpisodeNumberer::new(scheme, episodes))
    }

    pub fn digest(
        &self,
        path: &Path,
        algorithms: &[Algorithm],
        progress: &dyn Progress,
    ) -> Result<Vec<String>, DigestError> {
        digest_with_progress(path, algorithms, self.config.digest.chunk_size, progress)
    }

    pub fn status(&self) -> Result<SeriesStatus, SeriesError> {
        let numberer = self.numberer()?;
        let manifest_entries = self
            .manifest()
            .read_all()
            .ok()
            .map(|listing| listing.entries.len());

        Ok(SeriesStatus {
            basename: self.identity.basename().to_string(),
            digit_width: numberer.scheme().digit_width,
            episode_count: numberer.episodes().len(),
            next_number: numberer.next_number(),
            manifest_entries,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SeriesStatus {
    pub basename: String,
    pub digit_width: usize,
    pub episode_count: usize,
    pub next_number: Result<u64, NumberingError>,
    /// `None` when the manifest cannot be read, usually because nothing was imported yet.
    pub manifest_entries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;
    use std::fs;
    use tempfile::TempDir;

    fn series_dir(name: &str, files: &[&str]) -> (TempDir, PathBuf) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(name);
        fs::create_dir(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), file.as_bytes()).unwrap();
        }
        (root, dir)
    }

    #[test]
    fn open_strips_status_annotation() {
        let (_root, dir) = series_dir("Show (airing)", &[]);
        let series = Series::open(&dir).unwrap();

        assert_eq!(series.identity().basename(), "Show");
        assert_eq!(series.manifest().path(), dir.join("Show.sha1"));
        assert!(series.is_reserved("Show.sha1"));
        assert!(series.is_reserved("0org"));
        assert!(!series.is_reserved("Show - 01.mkv"));
    }

    #[test]
    fn numberer_reflects_listing() {
        let (_root, dir) = series_dir(
            "Show",
            &["Show - 001.mkv", "Show - 002.mkv", "Show - 003.ass", "stray.nfo"],
        );
        let numberer = Series::open(&dir).unwrap().numberer().unwrap();

        assert_eq!(numberer.scheme().digit_width, 3);
        assert_eq!(numberer.next_number(), Ok(3));
    }

    #[test]
    fn inconsistent_width_surfaces() {
        let (_root, dir) = series_dir("Show", &["Show - 01.mkv", "Show - 002.mkv"]);
        let err = Series::open(&dir).unwrap().numberer().unwrap_err();
        assert!(matches!(
            err,
            SeriesError::Naming(NamingError::InconsistentNaming { .. })
        ));
    }

    #[test]
    fn config_changes_default_width() {
        let (_root, dir) = series_dir("Show", &[]);
        fs::write(dir.join("0org"), r#"{"naming": {"default_digits": 3}}"#).unwrap();

        let numberer = Series::open(&dir).unwrap().numberer().unwrap();
        assert_eq!(numberer.scheme().digit_width, 3);
    }

    #[test]
    fn status_summarises_series() {
        let (_root, dir) = series_dir("Show", &["Show - 01.mkv", "Show - 03.mkv"]);
        let series = Series::open(&dir).unwrap();
        series
            .manifest()
            .append(&ManifestEntry::new("0".repeat(40), "Show - 01.mkv"))
            .unwrap();

        let status = series.status().unwrap();
        assert_eq!(status.basename, "Show");
        assert_eq!(status.episode_count, 2);
        assert_eq!(status.manifest_entries, Some(1));
        assert!(matches!(
            status.next_number,
            Err(NumberingError::InconsistentNumbering { expected: 2, found: 3, .. })
        ));
    }
}
