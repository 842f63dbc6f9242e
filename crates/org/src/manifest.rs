use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use episode_org_core::SeriesIdentity;

static ENTRY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-fA-F]{40})  (.+)$").expect("static regex"));

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to open manifest {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write manifest {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("filename cannot be recorded in a manifest: {0:?}")]
    InvalidFilename(String),
}

/// One `sha1sum`-style line: `"<40 hex>  <filename>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub sha1: String,
    pub filename: String,
}

impl ManifestEntry {
    pub fn new(sha1: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            sha1: sha1.into(),
            filename: filename.into(),
        }
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        ENTRY_LINE_RE
            .captures(line)
            .map(|c| Self::new(&c[1], &c[2]))
    }

    pub fn to_line(&self) -> String {
        format!("{}  {}\n", self.sha1, self.filename)
    }
}

/// Entries in file order. A filename may appear more than once.
#[derive(Debug, Clone, Default)]
pub struct ManifestListing {
    pub entries: Vec<ManifestEntry>,
}

impl ManifestListing {
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .enumerate()
            .filter_map(|(lineno, line)| {
                let entry = ManifestEntry::parse_line(line);
                if entry.is_none() && !line.trim().is_empty() {
                    tracing::debug!(line = lineno + 1, "skipping unrecognised manifest line");
                }
                entry
            })
            .collect();

        Self { entries }
    }
}

/// Append-only `<basename>.sha1` file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_series(dir: &Path, identity: &SeriesIdentity) -> Self {
        Self::new(dir.join(identity.manifest_filename()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn read_all(&self) -> Result<ManifestListing, ManifestError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ManifestError::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(ManifestListing::parse(&content))
    }

    /// Creates the manifest on first use. Each call writes exactly one line.
    pub fn append(&self, entry: &ManifestEntry) -> Result<(), ManifestError> {
        if entry.filename.contains(['\n', '\r']) {
            return Err(ManifestError::InvalidFilename(entry.filename.clone()));
        }

        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(entry.to_line().as_bytes()).map_err(write_err)?;
        file.flush().map_err(write_err)
    }
}
