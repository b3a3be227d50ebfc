use crate::bencode::Value;
use crate::error::ValidationError;
use crate::pieces::assemble_pieces;
use crate::utils;

/// One file of the torrent, with the root folder already removed from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Vec<String>,
    pub length: u64,
}

impl FileEntry {
    pub fn new(path: Vec<String>, length: u64) -> Self {
        Self { path, length }
    }
}

/// Everything needed to rebuild a v1 metainfo file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetainfoRequest {
    pub name: String,
    /// Tracker URLs, primary first.
    pub announce_list: Vec<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    /// Unix timestamp.
    pub creation_date: Option<i64>,
    pub piece_length: u64,
    /// One 40-character hex SHA-1 per piece, in piece-index order.
    pub piece_hashes_hex: Vec<String>,
    /// Daemon-reported order. Must not be empty.
    pub files: Vec<FileEntry>,
    pub is_private: bool,
}

impl MetainfoRequest {
    fn checked_total_size(&self) -> Option<u64> {
        self.files
            .iter()
            .try_fold(0u64, |total, f| total.checked_add(f.length))
            .filter(|total| *total <= i64::MAX as u64)
    }

    pub fn is_single_file(&self) -> bool {
        self.files.len() == 1
    }
}

/// Builds the outer metainfo dictionary for `request`.
///
/// All validation runs before any value is composed, so a failing request
/// never yields a partially built dictionary.
pub fn build_metainfo(request: &MetainfoRequest) -> Result<Value, ValidationError> {
    validate(request)?;

    let pieces = assemble_pieces(&request.piece_hashes_hex)?;
    let info = build_info(request, pieces);

    let announce_list = request
        .announce_list
        .iter()
        .map(|url| Value::List(vec![Value::string(url)]))
        .collect::<Vec<_>>();

    Ok(Value::dict()
        .with("announce", request.announce_list[0].as_str())
        .with("announce-list", announce_list)
        .with_opt("comment", request.comment.as_deref())
        .with_opt("created by", request.created_by.as_deref())
        .with_opt("creation date", request.creation_date)
        .with("info", info))
}

fn build_info(request: &MetainfoRequest, pieces: Vec<u8>) -> Value {
    let info = Value::dict()
        .with("name", request.name.as_str())
        .with("piece length", to_integer(request.piece_length))
        .with("pieces", pieces)
        .with("private", i64::from(request.is_private));

    if request.is_single_file() {
        info.with("length", to_integer(request.files[0].length))
    } else {
        let files = request
            .files
            .iter()
            .map(|file| {
                let path = file
                    .path
                    .iter()
                    .map(|segment| Value::string(segment))
                    .collect::<Vec<_>>();
                Value::dict()
                    .with("length", to_integer(file.length))
                    .with("path", path)
            })
            .collect::<Vec<_>>();
        info.with("files", files)
    }
}

fn validate(request: &MetainfoRequest) -> Result<(), ValidationError> {
    if request.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if request.announce_list.is_empty() {
        return Err(ValidationError::EmptyAnnounceList);
    }
    if request.files.is_empty() {
        return Err(ValidationError::EmptyFileList);
    }
    if request.piece_length == 0 {
        return Err(ValidationError::ZeroPieceLength);
    }

    for (index, file) in request.files.iter().enumerate() {
        let bad_segment = file
            .path
            .iter()
            .any(|s| s.is_empty() || s == "." || s == "..");
        if file.path.is_empty() || bad_segment {
            return Err(ValidationError::InvalidPath {
                index,
                path: file.path.clone(),
            });
        }
    }

    let total_size = request
        .checked_total_size()
        .ok_or(ValidationError::LengthOverflow)?;
    if request.piece_length > i64::MAX as u64 {
        return Err(ValidationError::LengthOverflow);
    }
    let expected = utils::expected_piece_count(total_size, request.piece_length);
    if expected != request.piece_hashes_hex.len() as u64 {
        return Err(ValidationError::PieceCountMismatch {
            expected,
            actual: request.piece_hashes_hex.len(),
            total_size,
        });
    }

    Ok(())
}

// Callers run `validate` first, which bounds every length by i64::MAX.
fn to_integer(n: u64) -> i64 {
    n as i64
}
