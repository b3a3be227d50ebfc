//! qBittorrent WebUI API v2 endpoints and payloads.

use serde::{Deserialize, Deserializer};

pub const LOGIN: &str = "/api/v2/auth/login";
pub const LOGOUT: &str = "/api/v2/auth/logout";
pub const APP_VERSION: &str = "/api/v2/app/version";
pub const TORRENTS_INFO: &str = "/api/v2/torrents/info";
pub const TORRENT_PROPERTIES: &str = "/api/v2/torrents/properties";
pub const TORRENT_TRACKERS: &str = "/api/v2/torrents/trackers";
pub const TORRENT_PIECE_HASHES: &str = "/api/v2/torrents/pieceHashes";
pub const TORRENT_FILES: &str = "/api/v2/torrents/files";
pub const TORRENTS_ADD: &str = "/api/v2/torrents/add";
pub const TORRENTS_DELETE: &str = "/api/v2/torrents/delete";

/// One row of `/torrents/info`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    /// Currently working tracker, empty when none is.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub tracker: Option<String>,
    #[serde(default)]
    pub save_path: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    /// Comma separated.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub up_limit: i64,
    #[serde(default)]
    pub dl_limit: i64,
    #[serde(default = "unset_limit")]
    pub ratio_limit: f64,
    #[serde(default = "unset_limit_i64")]
    pub seeding_time_limit: i64,
    #[serde(default)]
    pub auto_tmm: bool,
    /// Only reported by newer daemons.
    #[serde(default)]
    pub private: Option<bool>,
}

impl TorrentInfo {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

/// `/torrents/properties`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TorrentProperties {
    #[serde(default)]
    pub save_path: String,
    #[serde(default, deserialize_with = "timestamp_as_option")]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub piece_size: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub created_by: Option<String>,
    /// `-1` while the daemon has no metadata yet.
    #[serde(default)]
    pub pieces_num: i64,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// One row of `/torrents/trackers`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tracker {
    pub url: String,
    /// `-1` for the DHT, PeX and LSD pseudo-rows.
    #[serde(default)]
    pub tier: i64,
}

/// One row of `/torrents/files`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DaemonFile {
    #[serde(default)]
    pub index: usize,
    /// Relative path including the torrent's root folder, if it has one.
    pub name: String,
    pub size: u64,
}

/// Upload options for `/torrents/add`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddTorrentOptions {
    pub file_name: String,
    pub torrent: Vec<u8>,
    pub save_path: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub paused: bool,
    pub skip_checking: bool,
    pub up_limit: Option<i64>,
    pub dl_limit: Option<i64>,
    pub ratio_limit: Option<f64>,
    pub seeding_time_limit: Option<i64>,
    pub auto_tmm: Option<bool>,
    /// `Original`, `Subfolder` or `NoSubfolder`.
    pub content_layout: Option<String>,
}

impl AddTorrentOptions {
    /// Text fields of the multipart body, in wire form. Unset options are
    /// left out so the daemon applies its own defaults.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();

        if let Some(save_path) = &self.save_path {
            fields.push(("savepath", save_path.clone()));
        }
        if let Some(category) = &self.category {
            fields.push(("category", category.clone()));
        }
        if !self.tags.is_empty() {
            fields.push(("tags", self.tags.join(",")));
        }
        fields.push(("paused", self.paused.to_string()));
        fields.push(("stopped", self.paused.to_string()));
        fields.push(("skip_checking", self.skip_checking.to_string()));
        if let Some(limit) = self.up_limit.filter(|l| *l > 0) {
            fields.push(("upLimit", limit.to_string()));
        }
        if let Some(limit) = self.dl_limit.filter(|l| *l > 0) {
            fields.push(("dlLimit", limit.to_string()));
        }
        if let Some(ratio) = self.ratio_limit {
            fields.push(("ratioLimit", ratio.to_string()));
        }
        if let Some(minutes) = self.seeding_time_limit {
            fields.push(("seedingTimeLimit", minutes.to_string()));
        }
        if let Some(auto_tmm) = self.auto_tmm {
            fields.push(("autoTMM", auto_tmm.to_string()));
        }
        if let Some(layout) = &self.content_layout {
            fields.push(("contentLayout", layout.clone()));
        }

        fields
    }
}

fn unset_limit() -> f64 {
    -2.0
}

fn unset_limit_i64() -> i64 {
    -2
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// The daemon reports an unknown creation date as -1 (older versions: 0).
fn timestamp_as_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.filter(|ts| *ts > 0))
}
