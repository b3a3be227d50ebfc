use tracing::debug;

use crate::api::{DaemonFile, TorrentInfo, TorrentProperties};
use crate::error::ClientError;
use crate::info_hash::InfoHash;
use crate::metainfo::{FileEntry, MetainfoRequest};
use crate::session::Session;
use crate::trackers;
use crate::utils;

/// What the daemon knows about a torrent beyond its file and piece lists.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentSummary {
    pub name: String,
    pub tracker: Option<String>,
    pub piece_size: u64,
    pub creation_date: Option<i64>,
    pub created_by: Option<String>,
    pub comment: Option<String>,
    pub is_private: bool,
    pub save_path: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub up_limit: i64,
    pub dl_limit: i64,
    pub ratio_limit: f64,
    pub seeding_time_limit: i64,
    pub auto_tmm: bool,
}

impl TorrentSummary {
    pub fn new(info: &TorrentInfo, properties: &TorrentProperties) -> Self {
        let save_path = if properties.save_path.is_empty() {
            info.save_path.clone()
        } else {
            properties.save_path.clone()
        };

        TorrentSummary {
            name: info.name.clone(),
            tracker: info.tracker.clone(),
            piece_size: u64::try_from(properties.piece_size).unwrap_or(0),
            creation_date: properties.creation_date,
            created_by: properties.created_by.clone(),
            comment: properties.comment.clone(),
            is_private: properties.is_private.or(info.private).unwrap_or(false),
            save_path,
            category: info.category.clone(),
            tags: info.tag_list(),
            up_limit: info.up_limit,
            dl_limit: info.dl_limit,
            ratio_limit: info.ratio_limit,
            seeding_time_limit: info.seeding_time_limit,
            auto_tmm: info.auto_tmm,
        }
    }
}

/// One consistent read of a torrent's state, taken before anything is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentSnapshot {
    pub hash: InfoHash,
    pub summary: TorrentSummary,
    pub announce_list: Vec<String>,
    pub piece_hashes: Vec<String>,
    pub files: Vec<DaemonFile>,
}

impl TorrentSnapshot {
    pub async fn fetch(session: &Session, hash: &InfoHash) -> Result<Self, ClientError> {
        let info = session.torrent_info(hash).await?;
        let properties = session.torrent_properties(hash).await?;
        let tracker_rows = session.torrent_trackers(hash).await?;
        let piece_hashes = session.piece_hashes(hash).await?;
        let files = session.torrent_files(hash).await?;
        check_piece_hashes(hash, &properties, &piece_hashes)?;

        let summary = TorrentSummary::new(&info, &properties);
        let announce_list = trackers::announce_list(&tracker_rows, summary.tracker.as_deref());

        debug!(
            "Fetched {}: {} files, {} pieces, {} trackers",
            hash,
            files.len(),
            piece_hashes.len(),
            announce_list.len()
        );

        Ok(TorrentSnapshot {
            hash: *hash,
            summary,
            announce_list,
            piece_hashes,
            files,
        })
    }

    /// The builder input for this snapshot, with root folders stripped.
    pub fn to_request(&self) -> MetainfoRequest {
        MetainfoRequest {
            name: self.summary.name.clone(),
            announce_list: self.announce_list.clone(),
            comment: self.summary.comment.clone(),
            created_by: self.summary.created_by.clone(),
            creation_date: self.summary.creation_date,
            piece_length: self.summary.piece_size,
            piece_hashes_hex: self.piece_hashes.clone(),
            files: file_entries(&self.files),
            is_private: self.summary.is_private,
        }
    }

    /// File name for the exported metainfo, `<name>.<first 8 hash digits>.torrent`.
    /// The hash part keeps torrents with the same display name apart.
    pub fn torrent_file_name(&self) -> String {
        let stem: String = self
            .summary
            .name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let stem = stem.trim();
        let hex = self.hash.to_hex();
        if stem.is_empty() {
            format!("{}.torrent", hex)
        } else {
            format!("{}.{}.torrent", stem, &hex[..8])
        }
    }
}

// The daemon serves an empty hash list until it has the torrent's metadata.
// A missing or negative piece count means it does not know yet either.
fn check_piece_hashes(
    hash: &InfoHash,
    properties: &TorrentProperties,
    piece_hashes: &[String],
) -> Result<(), ClientError> {
    if properties.pieces_num <= 0 || properties.pieces_num == piece_hashes.len() as i64 {
        return Ok(());
    }
    Err(ClientError::IncompletePieceHashes {
        hash: hash.to_hex(),
        expected: properties.pieces_num,
        actual: piece_hashes.len(),
    })
}

/// Converts daemon file rows to builder entries.
///
/// A single file keeps only its last path segment. For several files, the
/// first segment is dropped when every file shares it, since the daemon
/// reports paths with the torrent's root folder in front.
pub fn file_entries(files: &[DaemonFile]) -> Vec<FileEntry> {
    let mut paths: Vec<Vec<String>> = files.iter().map(|f| utils::split_path(&f.name)).collect();

    if paths.len() == 1 {
        let last = paths[0].pop();
        paths[0] = last.into_iter().collect();
    } else if has_common_root(&paths) {
        for path in &mut paths {
            path.remove(0);
        }
    }

    files
        .iter()
        .zip(paths)
        .map(|(file, path)| FileEntry::new(path, file.size))
        .collect()
}

fn has_common_root(paths: &[Vec<String>]) -> bool {
    let Some(root) = paths.first().and_then(|p| p.first()) else {
        return false;
    };
    paths.len() > 1 && paths.iter().all(|p| p.len() > 1 && p[0] == *root)
}
