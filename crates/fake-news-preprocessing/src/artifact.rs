//! Versioned binary envelope for persisted model components.
//!
//! Every artifact starts with a fixed header so a wrong, stale or damaged file
//! is rejected before any payload is decoded:
//!
//! ```text
//! magic "FNDA" (4) | format version u16 LE (2) | kind (1) | crc32 of body u32 LE (4) | body
//! ```
//!
//! The body is the bincode encoding of `(producer_version, payload)`.

use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};

use bincode::{Decode, Encode};
use tracing::{debug, info};

use crate::ArtifactError;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"FNDA";
pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 1 + 4;

/// Which component an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    Vectorizer = 1,
    Classifier = 2,
}

impl ArtifactKind {
    fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vectorizer => write!(f, "vectorizer"),
            Self::Classifier => write!(f, "classifier"),
        }
    }
}

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Encode `value` into a self-describing artifact of the given kind.
pub fn encode<T: Encode>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>, ArtifactError> {
    let body = bincode::encode_to_vec((env!("CARGO_PKG_VERSION"), value), config())?;
    let checksum = crc32fast::hash(&body);

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&ARTIFACT_MAGIC);
    bytes.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
    bytes.push(kind.tag());
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes.extend_from_slice(&body);

    debug!(%kind, size = bytes.len(), checksum, "Encoded artifact");
    Ok(bytes)
}

/// Validate the header of `bytes` and decode its payload.
pub fn decode<T: Decode<()>>(kind: ArtifactKind, bytes: &[u8]) -> Result<T, ArtifactError> {
    if bytes.len() < HEADER_LEN {
        return Err(ArtifactError::Truncated { len: bytes.len() });
    }
    let (header, body) = bytes.split_at(HEADER_LEN);

    let magic = [header[0], header[1], header[2], header[3]];
    if magic != ARTIFACT_MAGIC {
        return Err(ArtifactError::BadMagic { found: magic });
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != ARTIFACT_FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            found: version,
            expected: ARTIFACT_FORMAT_VERSION,
        });
    }

    if header[6] != kind.tag() {
        return Err(ArtifactError::WrongKind {
            expected: kind,
            found: header[6],
        });
    }

    let stored = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(ArtifactError::ChecksumMismatch { stored, computed });
    }

    let ((producer_version, payload), read): ((String, T), usize) =
        bincode::decode_from_slice(body, config())?;
    if read != body.len() {
        return Err(ArtifactError::Inconsistent(format!(
            "{} trailing bytes after payload",
            body.len() - read
        )));
    }

    debug!(%kind, %producer_version, "Decoded artifact");
    Ok(payload)
}

/// Read an artifact file into memory.
pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>, ArtifactError> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `bytes` to `path` through a temporary file in the same directory, so
/// readers never observe a partially written artifact.
pub fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    fs::create_dir_all(&parent).map_err(io_err)?;

    let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;

    info!(path = %path.display(), size = bytes.len(), "Wrote artifact");
    Ok(())
}
