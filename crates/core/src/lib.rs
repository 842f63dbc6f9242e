pub mod digest;
pub mod naming;
pub mod numbering;
pub mod snapshot;
#[cfg(test)]
mod testutils;

pub use digest::{
    compute_digests_with, digest_reader, parse_algorithms, sha1_content, Algorithm, DigestError,
    DEFAULT_CHUNK_SIZE,
};
pub use naming::{
    extension_of, EpisodeFile, NamingError, NamingRules, NamingScheme, SeriesIdentity,
    SeriesPattern,
};
pub use numbering::{
    embedded_crc32, next_number, numbers_in_filename, EpisodeNumberer, NumberingError,
};
pub use snapshot::DirectorySnapshot;
