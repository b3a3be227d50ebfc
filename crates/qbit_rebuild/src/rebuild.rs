use tracing::{error, info, warn};

use crate::api::AddTorrentOptions;
use crate::bencode::encode;
use crate::error::RebuildError;
use crate::info_hash::InfoHash;
use crate::metainfo::{build_metainfo, MetainfoRequest};
use crate::session::Session;
use crate::torrent::TorrentSnapshot;

/// A regenerated metainfo file.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebuilt {
    pub bytes: Vec<u8>,
    pub info_hash: InfoHash,
    pub request: MetainfoRequest,
}

/// Builds and encodes the metainfo for `snapshot`.
pub fn rebuild(snapshot: &TorrentSnapshot) -> Result<Rebuilt, RebuildError> {
    let request = snapshot.to_request();
    let metainfo = build_metainfo(&request)?;
    let info_hash = InfoHash::of_metainfo(&metainfo)?;
    let bytes = encode(&metainfo)?;

    Ok(Rebuilt {
        bytes,
        info_hash,
        request,
    })
}

/// Checks the rebuilt info hash against the one the daemon reports.
///
/// With `allow_mismatch` a mismatch is only logged.
pub fn verify(
    rebuilt: &Rebuilt,
    expected: &InfoHash,
    allow_mismatch: bool,
) -> Result<(), RebuildError> {
    if rebuilt.info_hash == *expected {
        return Ok(());
    }
    if allow_mismatch {
        warn!(
            "Rebuilt info hash {} differs from daemon hash {}",
            rebuilt.info_hash, expected
        );
        return Ok(());
    }
    Err(RebuildError::InfoHashMismatch {
        expected: *expected,
        actual: rebuilt.info_hash,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaddOptions {
    pub paused: bool,
    pub skip_checking: bool,
    pub allow_mismatch: bool,
    pub dry_run: bool,
}

impl Default for ReaddOptions {
    fn default() -> Self {
        Self {
            paused: false,
            skip_checking: true,
            allow_mismatch: false,
            dry_run: false,
        }
    }
}

/// Upload options that put the rebuilt torrent back where it was, with the
/// same category, tags and limits.
pub fn add_options(
    snapshot: &TorrentSnapshot,
    rebuilt: &Rebuilt,
    options: &ReaddOptions,
) -> AddTorrentOptions {
    let summary = &snapshot.summary;
    AddTorrentOptions {
        file_name: snapshot.torrent_file_name(),
        torrent: rebuilt.bytes.clone(),
        save_path: (!summary.auto_tmm && !summary.save_path.is_empty())
            .then(|| summary.save_path.clone()),
        category: summary.category.clone(),
        tags: summary.tags.clone(),
        paused: options.paused,
        skip_checking: options.skip_checking,
        up_limit: Some(summary.up_limit),
        dl_limit: Some(summary.dl_limit),
        ratio_limit: Some(summary.ratio_limit),
        seeding_time_limit: Some(summary.seeding_time_limit),
        auto_tmm: Some(summary.auto_tmm),
        content_layout: Some("Original".to_string()),
    }
}

/// Replaces the daemon's copy of a torrent with `rebuilt`.
///
/// The torrent is removed (keeping its data) and uploaded again. Nothing on
/// the daemon changes if the hash check fails, or on a dry run.
pub async fn readd(
    session: &Session,
    snapshot: &TorrentSnapshot,
    rebuilt: &Rebuilt,
    options: &ReaddOptions,
) -> Result<(), RebuildError> {
    verify(rebuilt, &snapshot.hash, options.allow_mismatch)?;

    if options.dry_run {
        info!("Dry run: would re-add {} ({})", snapshot.summary.name, rebuilt.info_hash);
        return Ok(());
    }

    let add = add_options(snapshot, rebuilt, options);
    session.delete_torrent(&snapshot.hash, false).await?;
    info!("Removed {} from the daemon, data kept", snapshot.hash);

    if let Err(err) = session.add_torrent(&add).await {
        error!(
            "Re-adding {} failed after removal; its data is still in {}",
            snapshot.hash, snapshot.summary.save_path
        );
        return Err(err.into());
    }
    info!("Re-added {} as {}", snapshot.summary.name, rebuilt.info_hash);

    Ok(())
}
