use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::naming::{EpisodeFile, NamingError, NamingScheme};

static CRC_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9a-fA-F]{8})\]").expect("static regex"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("static regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberingError {
    #[error("files are not consistently numbered; expected {expected} but found {found}: {filename}")]
    InconsistentNumbering {
        filename: String,
        expected: u64,
        found: u64,
    },
    #[error("episode numbers start at 1, got {0}")]
    InvalidStart(u64),
}

/// One past the last episode, requiring the existing files to run 1, 2, 3, ...
pub fn next_number(episodes: &[EpisodeFile]) -> Result<u64, NumberingError> {
    episodes.iter().try_fold(1, |expected, episode| {
        if episode.number == expected {
            Ok(expected + 1)
        } else {
            Err(NumberingError::InconsistentNumbering {
                filename: episode.filename.clone(),
                expected,
                found: episode.number,
            })
        }
    })
}

/// Assigns episode numbers within one naming scheme.
#[derive(Debug, Clone)]
pub struct EpisodeNumberer {
    scheme: NamingScheme,
    episodes: Vec<EpisodeFile>,
}

impl EpisodeNumberer {
    pub fn new(scheme: NamingScheme, episodes: Vec<EpisodeFile>) -> Self {
        Self { scheme, episodes }
    }

    pub fn scheme(&self) -> &NamingScheme {
        &self.scheme
    }

    pub fn episodes(&self) -> &[EpisodeFile] {
        &self.episodes
    }

    pub fn next_number(&self) -> Result<u64, NumberingError> {
        let next = next_number(&self.episodes)?;
        tracing::debug!(next, "next episode number");
        Ok(next)
    }

    /// An explicit start bypasses the contiguity check on existing files.
    pub fn start_number(&self, explicit: Option<u64>) -> Result<u64, NumberingError> {
        match explicit {
            Some(0) => Err(NumberingError::InvalidStart(0)),
            Some(n) => Ok(n),
            None => self.next_number(),
        }
    }

    pub fn filename_for(&self, number: u64, source_name: &str) -> Result<String, NamingError> {
        self.scheme.episode_filename(number, source_name)
    }
}

/// Integers written in a file name, ignoring bracketed CRC tokens like `[1A2B3C4D]`.
pub fn numbers_in_filename(filename: &str) -> Vec<u64> {
    let stripped = CRC_TOKEN_RE.replace_all(filename, "");
    NUMBER_RE
        .find_iter(&stripped)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// The first bracketed 8-hex-digit token of a file name, lowercased.
pub fn embedded_crc32(filename: &str) -> Option<String> {
    CRC_TOKEN_RE
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}
