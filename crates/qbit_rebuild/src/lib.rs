//! Rebuild `.torrent` metainfo files from a qBittorrent daemon's state.

pub mod api;
pub mod bencode;
pub mod error;
pub mod info_hash;
pub mod metainfo;
pub mod pieces;
pub mod rebuild;
pub mod session;
pub mod torrent;
pub mod trackers;
pub mod utils;

pub use bencode::{encode, Value};
pub use error::{ClientError, EncodingError, RebuildError, ValidationError};
pub use info_hash::InfoHash;
pub use metainfo::{build_metainfo, FileEntry, MetainfoRequest};
pub use pieces::assemble_pieces;
pub use session::{ClientConfig, Session};
pub use torrent::TorrentSnapshot;
