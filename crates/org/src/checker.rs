use std::collections::HashSet;
use thiserror::Error;

use episode_org_core::{Algorithm, DigestError};

use crate::manifest::{ManifestEntry, ManifestError};
use crate::progress::Progress;
use crate::series::{Series, SeriesError};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

#[derive(Debug)]
pub enum CheckOutcome {
    Ok,
    Mismatch { actual: String },
    Unreadable(DigestError),
}

#[derive(Debug)]
pub struct FileCheck {
    pub entry: ManifestEntry,
    pub outcome: CheckOutcome,
}

impl FileCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Ok)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CheckEvent<'e> {
    Checking(&'e ManifestEntry),
    Checked(&'e FileCheck),
    Duplicate(&'e str),
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub results: Vec<FileCheck>,
    /// Directory entries the manifest does not cover.
    pub unchecked: Vec<String>,
}

impl CheckReport {
    /// Only digest results count; duplicates and unchecked files never fail a check.
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(FileCheck::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileCheck> {
        self.results.iter().filter(|r| !r.is_ok())
    }
}

pub struct Checker<'a> {
    series: &'a Series,
    progress: &'a dyn Progress,
}

impl<'a> Checker<'a> {
    pub fn new(series: &'a Series, progress: &'a dyn Progress) -> Self {
        Self { series, progress }
    }

    /// Verifies every manifest entry, then lists what the manifest leaves out.
    ///
    /// A repeated filename is announced with `CheckEvent::Duplicate` just before that
    /// entry is checked. Fails only if the manifest cannot be read or the directory
    /// cannot be listed; individual digest failures are collected in the report.
    pub fn check<F>(&self, mut on_event: F) -> Result<CheckReport, CheckError>
    where
        F: FnMut(CheckEvent<'_>),
    {
        let listing = self.series.manifest().read_all()?;

        let mut seen = HashSet::new();
        let results: Vec<FileCheck> = listing
            .entries
            .iter()
            .map(|entry| {
                if !seen.insert(entry.filename.as_str()) {
                    tracing::debug!(filename = %entry.filename, "duplicate manifest entry");
                    on_event(CheckEvent::Duplicate(&entry.filename));
                }
                on_event(CheckEvent::Checking(entry));
                let check = self.check_entry(entry);
                on_event(CheckEvent::Checked(&check));
                check
            })
            .collect();

        let unchecked = self
            .series
            .snapshot()?
            .iter()
            .filter(|name| !self.series.is_reserved(name) && !seen.contains(name))
            .map(String::from)
            .collect();

        Ok(CheckReport { results, unchecked })
    }

    fn check_entry(&self, entry: &ManifestEntry) -> FileCheck {
        let path = self.series.path_of(&entry.filename);
        let outcome = match self.series.digest(&path, &[Algorithm::Sha1], self.progress) {
            Ok(digests) => match digests.into_iter().next() {
                Some(actual) if actual.eq_ignore_ascii_case(&entry.sha1) => CheckOutcome::Ok,
                Some(actual) => CheckOutcome::Mismatch { actual },
                None => CheckOutcome::Mismatch {
                    actual: String::new(),
                },
            },
            Err(e) => CheckOutcome::Unreadable(e),
        };

        if !matches!(outcome, CheckOutcome::Ok) {
            tracing::debug!(filename = %entry.filename, ?outcome, "digest check failed");
        }

        FileCheck {
            entry: entry.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use episode_org_core::sha1_content;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    fn series_with_manifest(manifest: &str, files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Show");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("Show.sha1"), manifest).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        (root, dir)
    }

    fn run(dir: &std::path::Path) -> Result<CheckReport, CheckError> {
        let series = Series::open(dir).unwrap();
        Checker::new(&series, &NoProgress).check(|_| {})
    }

    #[test]
    fn empty_file_verifies() {
        let (_root, dir) =
            series_with_manifest(&format!("{EMPTY_SHA1}  empty.txt\n"), &[("empty.txt", "")]);

        let report = run(&dir).unwrap();
        assert!(report.all_ok());
        assert_eq!(report.results.len(), 1);
        assert!(report.unchecked.is_empty());
    }

    #[test]
    fn uppercase_manifest_digest_verifies() {
        let (_root, dir) = series_with_manifest(
            &format!("{}  empty.txt\n", EMPTY_SHA1.to_uppercase()),
            &[("empty.txt", "")],
        );
        assert!(run(&dir).unwrap().all_ok());
    }

    #[test]
    fn missing_file_fails_but_checking_continues() {
        let manifest = format!(
            "{EMPTY_SHA1}  empty.txt\n{}  other.mkv\n",
            sha1_content(b"other")
        );
        let (_root, dir) = series_with_manifest(&manifest, &[("other.mkv", "other")]);

        let report = run(&dir).unwrap();
        assert!(!report.all_ok());
        assert_eq!(report.results.len(), 2);
        assert!(matches!(
            &report.results[0].outcome,
            CheckOutcome::Unreadable(e) if e.is_not_found()
        ));
        assert!(report.results[1].is_ok());
    }

    #[test]
    fn mismatch_is_reported() {
        let (_root, dir) =
            series_with_manifest(&format!("{EMPTY_SHA1}  a.mkv\n"), &[("a.mkv", "changed")]);

        let report = run(&dir).unwrap();
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0].outcome,
            CheckOutcome::Mismatch { actual } if *actual == sha1_content(b"changed")
        ));
    }

    #[test]
    fn unchecked_files_listed_regardless_of_status() {
        let (_root, dir) = series_with_manifest(
            &format!("{EMPTY_SHA1}  a.mkv\n"),
            &[("a.mkv", "changed"), ("stray.nfo", "x"), ("0org", "{}")],
        );

        let report = run(&dir).unwrap();
        assert!(!report.all_ok());
        assert_eq!(report.unchecked, vec!["stray.nfo".to_string()]);
    }

    #[test]
    fn duplicates_warn_inline_without_failing() {
        let manifest = format!("{EMPTY_SHA1}  a.mkv\n{EMPTY_SHA1}  b.mkv\n{EMPTY_SHA1}  a.mkv\n");
        let (_root, dir) = series_with_manifest(&manifest, &[("a.mkv", ""), ("b.mkv", "")]);
        let series = Series::open(&dir).unwrap();

        let mut events = Vec::new();
        let report = Checker::new(&series, &NoProgress)
            .check(|event| match event {
                CheckEvent::Duplicate(name) => events.push(format!("duplicate {name}")),
                CheckEvent::Checked(c) => events.push(format!("checked {}", c.entry.filename)),
                CheckEvent::Checking(_) => {}
            })
            .unwrap();

        assert!(report.all_ok());
        assert_eq!(
            events,
            vec![
                "checked a.mkv",
                "checked b.mkv",
                "duplicate a.mkv",
                "checked a.mkv",
            ]
        );
    }

    #[test]
    fn foreign_config_does_not_block_check() {
        let (_root, dir) = series_with_manifest(
            &format!("{EMPTY_SHA1}  empty.txt\n"),
            &[("empty.txt", ""), ("0org", "naming: yaml-or-ruby\n")],
        );

        let report = run(&dir).unwrap();
        assert!(report.all_ok());
        assert!(report.unchecked.is_empty());
    }

    #[test]
    fn missing_manifest_fails_whole_check() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Show");
        fs::create_dir(&dir).unwrap();

        assert!(matches!(run(&dir), Err(CheckError::Manifest(_))));
    }
}
