use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use episode_org_core::{
    embedded_crc32, extension_of, numbers_in_filename, Algorithm, DigestError, NumberingError,
};

use crate::manifest::{ManifestEntry, ManifestError};
use crate::progress::Progress;
use crate::series::{Series, SeriesError};

/// A candidate that failed a sanity check. Nothing has been moved or recorded.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("File name is not valid UTF-8: {}", .0.display())]
    UnsupportedName(PathBuf),
    #[error("File doesn't contain the number {number}: {}", .path.display())]
    NumberNotInName { path: PathBuf, number: u64 },
    #[error("File doesn't have an extension: {}", .0.display())]
    MissingExtension(PathBuf),
    #[error("Destination file exists: {0}")]
    DestinationExists(String),
    #[error("CRC-32 mismatch for {}: expected {expected}, got {actual}", .path.display())]
    CrcMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("cannot digest {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: DigestError,
    },
}

#[derive(Error, Debug)]
pub enum CommitFailure {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("move failed: {0}")]
    Move(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("usage: {0}")]
    Usage(String),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Files before the failing one are already renamed and recorded.
    #[error("import stopped after {completed} file(s) at {}: {failure}", .path.display())]
    Commit {
        completed: usize,
        path: PathBuf,
        #[source]
        failure: CommitFailure,
    },
}

/// A source file that passed every sanity check, with its digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    pub source: PathBuf,
    pub destination: String,
    pub sha1: String,
    /// Present only when the source name carried a `[XXXXXXXX]` token.
    pub crc32: Option<String>,
}

/// Outcome of the sanity-check phase. Committing consumes it.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub start_number: u64,
    pub candidates: Vec<ImportCandidate>,
}

pub struct Importer<'a> {
    series: &'a Series,
    progress: &'a dyn Progress,
}

impl<'a> Importer<'a> {
    pub fn new(series: &'a Series, progress: &'a dyn Progress) -> Self {
        Self { series, progress }
    }

    /// Checks every source and computes its digests without touching the directory.
    pub fn plan(
        &self,
        start_number: Option<u64>,
        sources: &[PathBuf],
    ) -> Result<ImportPlan, ImportError> {
        if sources.is_empty() {
            return Err(ImportError::Usage("no files given".to_string()));
        }

        let numberer = self.series.numberer()?;
        let start = numberer
            .start_number(start_number)
            .map_err(|e| match e {
                NumberingError::InvalidStart(n) => {
                    ImportError::Usage(format!("start number must be at least 1, got {n}"))
                }
                other => SeriesError::from(other).into(),
            })?;

        let planned = sources
            .iter()
            .enumerate()
            .map(|(offset, source)| -> Result<_, ImportError> {
                let number = u64::try_from(offset)
                    .ok()
                    .and_then(|offset| start.checked_add(offset))
                    .ok_or_else(|| {
                        ImportError::Usage(format!(
                            "{} file(s) starting at {start} exceed the largest episode number",
                            sources.len()
                        ))
                    })?;
                let name = check_source(source, number)?;
                let destination = numberer
                    .filename_for(number, name)
                    .map_err(SeriesError::from)?;
                if self.series.path_of(&destination).exists() {
                    return Err(ValidationError::DestinationExists(destination).into());
                }
                Ok((source, destination))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = planned
            .into_iter()
            .map(|(source, destination)| self.digest_candidate(source, destination))
            .collect::<Result<Vec<_>, ImportError>>()?;

        Ok(ImportPlan {
            start_number: start,
            candidates,
        })
    }

    fn digest_candidate(
        &self,
        source: &Path,
        destination: String,
    ) -> Result<ImportCandidate, ImportError> {
        let expected_crc = source
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(embedded_crc32);

        let algorithms: &[Algorithm] = match expected_crc {
            Some(_) => &[Algorithm::Sha1, Algorithm::Crc32],
            None => &[Algorithm::Sha1],
        };

        let mut digests = self
            .series
            .digest(source, algorithms, self.progress)
            .map_err(|e| ValidationError::Unreadable {
                path: source.to_path_buf(),
                source: e,
            })?
            .into_iter();
        let sha1 = digests.next().unwrap_or_default();
        let crc32 = digests.next();

        if let (Some(expected), Some(actual)) = (&expected_crc, &crc32) {
            if !expected.eq_ignore_ascii_case(actual) {
                return Err(ValidationError::CrcMismatch {
                    path: source.to_path_buf(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                }
                .into());
            }
        }

        tracing::debug!(source = %source.display(), %sha1, ?crc32, "candidate verified");
        Ok(ImportCandidate {
            source: source.to_path_buf(),
            destination,
            sha1,
            crc32,
        })
    }

    /// Records and moves each candidate in order. There is no rollback: a failure
    /// leaves earlier files renamed and their manifest lines written.
    pub fn commit<F>(&self, plan: ImportPlan, mut on_move: F) -> Result<usize, ImportError>
    where
        F: FnMut(&ImportCandidate),
    {
        let manifest = self.series.manifest();

        for (completed, candidate) in plan.candidates.iter().enumerate() {
            let fail = |failure: CommitFailure| ImportError::Commit {
                completed,
                path: candidate.source.clone(),
                failure,
            };

            manifest
                .append(&ManifestEntry::new(&candidate.sha1, &candidate.destination))
                .map_err(|e| fail(e.into()))?;

            on_move(candidate);
            move_file(&candidate.source, &self.series.path_of(&candidate.destination))
                .map_err(|e| fail(e.into()))?;
        }

        Ok(plan.candidates.len())
    }

    pub fn import<F>(
        &self,
        start_number: Option<u64>,
        sources: &[PathBuf],
        on_move: F,
    ) -> Result<usize, ImportError>
    where
        F: FnMut(&ImportCandidate),
    {
        let plan = self.plan(start_number, sources)?;
        self.commit(plan, on_move)
    }
}

fn check_source(source: &Path, number: u64) -> Result<&str, ValidationError> {
    if !source.is_file() {
        return Err(ValidationError::SourceNotFound(source.to_path_buf()));
    }

    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ValidationError::UnsupportedName(source.to_path_buf()))?;

    if !numbers_in_filename(name).contains(&number) {
        return Err(ValidationError::NumberNotInName {
            path: source.to_path_buf(),
            number,
        });
    }

    if extension_of(name).is_none() {
        return Err(ValidationError::MissingExtension(source.to_path_buf()));
    }

    Ok(name)
}

/// Renames, falling back to copy-and-remove when the rename itself fails
/// (for example across filesystems).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) if !to.exists() => {
            tracing::debug!(error = %rename_err, "rename failed, copying instead");
            std::fs::copy(from, to).map_err(|_| rename_err)?;
            std::fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
