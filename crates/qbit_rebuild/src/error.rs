use thiserror::Error;

use crate::info_hash::InfoHash;

/// Malformed or structurally inconsistent input to the metainfo builder or
/// the piece-hash assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("torrent name is empty")]
    EmptyName,

    #[error("announce list is empty")]
    EmptyAnnounceList,

    #[error("file list is empty")]
    EmptyFileList,

    #[error("piece length must be greater than zero")]
    ZeroPieceLength,

    #[error("expected {expected} piece hashes for {total_size} bytes, got {actual}")]
    PieceCountMismatch {
        expected: u64,
        actual: usize,
        total_size: u64,
    },

    #[error("piece {index}: digest must be 40 hex characters, got {len}")]
    DigestLength { index: usize, len: usize },

    #[error("piece {index}: digest has odd length {len}")]
    DigestOddLength { index: usize, len: usize },

    #[error("piece {index}: invalid hex character {ch:?} at offset {offset}")]
    DigestCharacter {
        index: usize,
        ch: char,
        offset: usize,
    },

    #[error("torrent size does not fit a bencode integer")]
    LengthOverflow,

    #[error("file {index}: invalid path {path:?}")]
    InvalidPath { index: usize, path: Vec<String> },

    #[error("invalid info hash {0:?}")]
    InvalidInfoHash(String),
}

/// An invariant violation while serializing a bencode value.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("duplicate dictionary key {0:?}")]
    DuplicateKey(String),

    #[error("metainfo has no info dictionary")]
    MissingInfo,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the daemon's WebUI API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid daemon url {0:?}")]
    InvalidUrl(String),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("login rejected: bad username or password")]
    LoginRejected,

    #[error("login refused: client IP is banned after too many failed attempts")]
    Banned,

    #[error("{0} requires an authenticated session")]
    Unauthorized(&'static str),

    #[error("torrent {0} not found")]
    TorrentNotFound(String),

    #[error("daemon rejected the torrent upload")]
    AddRejected,

    #[error("torrent {hash}: daemon reports {expected} pieces but returned {actual} piece hashes")]
    IncompletePieceHashes {
        hash: String,
        expected: i64,
        actual: usize,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything that can go wrong while regenerating or re-adding a torrent.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("rebuilt info hash {actual} does not match daemon hash {expected}")]
    InfoHashMismatch { expected: InfoHash, actual: InfoHash },
}
