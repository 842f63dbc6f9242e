use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Read buffer used when streaming file content through the hashers.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl DigestError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    Crc32,
    Sha1,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" | "crc-32" => Ok(Self::Crc32),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Parses every name up front so an unknown algorithm fails before any I/O.
pub fn parse_algorithms<S: AsRef<str>>(names: &[S]) -> Result<Vec<Algorithm>, DigestError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

enum RunningDigest {
    Crc32(crc32fast::Hasher),
    Sha1(Sha1),
}

impl RunningDigest {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Crc32 => Self::Crc32(crc32fast::Hasher::new()),
            Algorithm::Sha1 => Self::Sha1(Sha1::new()),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        match self {
            Self::Crc32(h) => h.update(buf),
            Self::Sha1(h) => h.update(buf),
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Crc32(h) => format!("{:08x}", h.finalize()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Feeds `reader` through every requested algorithm in a single pass.
///
/// Results come back in the same order as `algorithms`. `on_chunk` is called
/// with the byte count of each chunk read, for progress reporting.
pub fn digest_reader<R, F>(
    mut reader: R,
    algorithms: &[Algorithm],
    chunk_size: usize,
    mut on_chunk: F,
) -> io::Result<Vec<String>>
where
    R: Read,
    F: FnMut(usize),
{
    let mut digests: Vec<RunningDigest> =
        algorithms.iter().copied().map(RunningDigest::new).collect();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digests.iter_mut().for_each(|d| d.update(&buf[..n]));
        on_chunk(n);
    }

    Ok(digests.into_iter().map(RunningDigest::finish).collect())
}

pub fn compute_digests_with<F>(
    path: &Path,
    algorithms: &[Algorithm],
    chunk_size: usize,
    on_chunk: F,
) -> Result<Vec<String>, DigestError>
where
    F: FnMut(usize),
{
    let io_err = |source| DigestError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let digests = digest_reader(file, algorithms, chunk_size, on_chunk).map_err(io_err)?;

    tracing::debug!(path = %path.display(), ?algorithms, "computed digests");
    Ok(digests)
}

pub fn sha1_content(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
