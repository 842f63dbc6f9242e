use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::snapshot::DirectorySnapshot;

static STATUS_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\([^()]+\)$").expect("static regex"));

#[derive(Error, Debug, PartialEq)]
pub enum NamingError {
    #[error("files are not consistently named: {filename} uses {found} digits, expected {expected}")]
    InconsistentNaming {
        filename: String,
        expected: usize,
        found: usize,
    },
    #[error("episode number in {0} is too large")]
    NumberOutOfRange(String),
    #[error("file doesn't have an extension: {0}")]
    MissingExtension(String),
    #[error("cannot derive a series name from {0}")]
    NoSeriesName(String),
    #[error("invalid series pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Tunables for recognising episode files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Extensions that look like episodes but never take part in width or number inference.
    pub subtitle_extensions: Vec<String>,
    /// Width used when the directory holds no episode files yet.
    pub default_digits: usize,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            subtitle_extensions: ["ass", "ssa", "sub"].map(String::from).to_vec(),
            default_digits: 2,
        }
    }
}

/// The series name, taken from the directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesIdentity {
    basename: String,
}

impl SeriesIdentity {
    /// Strips a single trailing status annotation such as `" (ongoing)"`.
    pub fn from_dir_name(name: &str) -> Self {
        Self {
            basename: STATUS_ANNOTATION.replace(name, "").into_owned(),
        }
    }

    pub fn from_dir(dir: &Path) -> Result<Self, NamingError> {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map(Self::from_dir_name)
            .filter(|id| !id.basename.is_empty())
            .ok_or_else(|| NamingError::NoSeriesName(dir.display().to_string()))
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn manifest_filename(&self) -> String {
        format!("{}.sha1", self.basename)
    }
}

/// A directory entry recognised as `"<basename> - <digits>.<ext>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFile {
    pub filename: String,
    pub number: u64,
    /// Number of digits used in the filename, leading zeros included.
    pub width: usize,
}

/// Compiled matchers for one series.
#[derive(Debug, Clone)]
pub struct SeriesPattern {
    episode: Regex,
    excluded: Option<Regex>,
}

impl SeriesPattern {
    pub fn new(identity: &SeriesIdentity, rules: &NamingRules) -> Result<Self, NamingError> {
        let base = regex::escape(identity.basename());
        let episode = Regex::new(&format!(r"^{base} - ([0-9]+)\.[^.]+$"))?;

        let excluded = (!rules.subtitle_extensions.is_empty())
            .then(|| {
                let exts = rules
                    .subtitle_extensions
                    .iter()
                    .map(|e| regex::escape(e))
                    .collect::<Vec<_>>()
                    .join("|");
                Regex::new(&format!(r"^{base} - ([0-9]+)\.({exts})$"))
            })
            .transpose()?;

        Ok(Self { episode, excluded })
    }

    /// Digit run of a canonical episode file, `None` for subtitles and unrelated names.
    pub fn episode_digits<'a>(&self, filename: &'a str) -> Option<&'a str> {
        let digits = self.episode.captures(filename)?.get(1)?.as_str();
        match &self.excluded {
            Some(excluded) if excluded.is_match(filename) => None,
            _ => Some(digits),
        }
    }

    /// Canonical episode files of the snapshot, in filename order.
    pub fn episode_files(
        &self,
        snapshot: &DirectorySnapshot,
    ) -> Result<Vec<EpisodeFile>, NamingError> {
        snapshot
            .iter()
            .filter_map(|name| self.episode_digits(name).map(|digits| (name, digits)))
            .map(|(name, digits)| {
                let number = digits
                    .parse()
                    .map_err(|_| NamingError::NumberOutOfRange(name.to_string()))?;
                Ok(EpisodeFile {
                    filename: name.to_string(),
                    number,
                    width: digits.len(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub basename: String,
    pub digit_width: usize,
}

impl NamingScheme {
    /// Derives the zero-padding width every existing episode file must share.
    pub fn derive(
        identity: &SeriesIdentity,
        episodes: &[EpisodeFile],
        rules: &NamingRules,
    ) -> Result<Self, NamingError> {
        let mut width: Option<usize> = None;
        for episode in episodes {
            match width {
                Some(expected) if expected != episode.width => {
                    return Err(NamingError::InconsistentNaming {
                        filename: episode.filename.clone(),
                        expected,
                        found: episode.width,
                    });
                }
                _ => width = Some(episode.width),
            }
        }

        let digit_width = width.unwrap_or(rules.default_digits.max(1));
        tracing::debug!(basename = identity.basename(), digit_width, "derived naming scheme");

        Ok(Self {
            basename: identity.basename().to_string(),
            digit_width,
        })
    }

    /// `"<basename> - <zero-padded number><extension of source>"`.
    pub fn episode_filename(&self, number: u64, source_name: &str) -> Result<String, NamingError> {
        let extension = extension_of(source_name)
            .ok_or_else(|| NamingError::MissingExtension(source_name.to_string()))?;
        Ok(format!(
            "{} - {:0width$}{}",
            self.basename,
            number,
            extension,
            width = self.digit_width
        ))
    }
}

/// Final `.suffix` of a file name, dot included. A trailing bare dot has no extension.
pub fn extension_of(filename: &str) -> Option<&str> {
    filename
        .rfind('.')
        .map(|idx| &filename[idx..])
        .filter(|ext| ext.len() > 1)
}
