use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{connect, init_tracing, write_output, ConnectionArgs};
use qbit_rebuild::rebuild::{readd, rebuild, ReaddOptions};
use qbit_rebuild::{InfoHash, Session, TorrentSnapshot};

/// Re-add a torrent to qBittorrent from a freshly rebuilt .torrent file.
///
/// The torrent is removed from the daemon (its data stays on disk) and
/// uploaded again with the same save path, category, tags and limits.
#[derive(Debug, Parser)]
#[command(name = "qbt-readd", version, about)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Info hash of the torrent to re-add
    hash: InfoHash,

    /// Add the torrent paused
    #[arg(long)]
    paused: bool,

    /// Let the daemon re-check the data instead of trusting it
    #[arg(long)]
    recheck: bool,

    /// Rebuild and verify only; change nothing on the daemon
    #[arg(long)]
    dry_run: bool,

    /// Proceed even if the rebuilt info hash differs from the daemon's
    #[arg(long)]
    force: bool,

    /// Also write the rebuilt .torrent here before touching the daemon, even
    /// if its info hash turns out not to match
    #[arg(long)]
    save_copy: Option<PathBuf>,
}

impl Cli {
    fn readd_options(&self) -> ReaddOptions {
        ReaddOptions {
            paused: self.paused,
            skip_checking: !self.recheck,
            allow_mismatch: self.force,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut session = connect(&cli.connection).await?;
    let result = readd_one(&session, &cli).await;
    session.logout().await.ok();
    result
}

async fn readd_one(session: &Session, cli: &Cli) -> Result<()> {
    let snapshot = TorrentSnapshot::fetch(session, &cli.hash).await?;
    let rebuilt = rebuild(&snapshot)?;

    if let Some(path) = &cli.save_copy {
        write_output(path, &rebuilt.bytes).await?;
    }

    readd(session, &snapshot, &rebuilt, &cli.readd_options()).await?;
    info!(
        "{} {} ({} bytes of metainfo)",
        if cli.dry_run { "Verified" } else { "Re-added" },
        rebuilt.info_hash,
        rebuilt.bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["qbt-readd", HASH]);
        assert_eq!(cli.hash.to_hex(), HASH);
        assert_eq!(cli.readd_options(), ReaddOptions::default());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["qbt-readd", HASH, "--paused", "--recheck", "--dry-run", "--force"]);
        let options = cli.readd_options();
        assert!(options.paused);
        assert!(!options.skip_checking);
        assert!(options.dry_run);
        assert!(options.allow_mismatch);
    }

    #[test]
    fn test_hash_required() {
        assert!(Cli::try_parse_from(["qbt-readd"]).is_err());
    }
}
