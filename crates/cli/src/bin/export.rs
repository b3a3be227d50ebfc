use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use cli::{connect, init_tracing, write_output, ConnectionArgs};
use qbit_rebuild::rebuild::{rebuild, verify, Rebuilt};
use qbit_rebuild::{InfoHash, Session, TorrentSnapshot};
use util::filter::NameFilter;

/// Regenerate .torrent files from a qBittorrent daemon's download state.
#[derive(Debug, Parser)]
#[command(name = "qbt-export", version, about)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Info hashes of the torrents to export
    hashes: Vec<InfoHash>,

    /// Export every torrent the daemon knows about
    #[arg(long)]
    all: bool,

    /// Only export torrents whose name matches this glob (implies --all)
    #[arg(long)]
    filter: Vec<String>,

    /// Only export torrents in this category (implies --all)
    #[arg(long)]
    category: Option<String>,

    /// Output file for a single torrent, `-` for stdout
    #[arg(long, short = 'o', conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for exported files (default: current directory)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write the file even if its info hash differs from the daemon's
    #[arg(long)]
    force: bool,
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
    let batch = cli.all || !cli.filter.is_empty() || cli.category.is_some();
    if cli.hashes.is_empty() && !batch {
        bail!("give at least one info hash, or --all / --filter / --category");
    }
    if cli.output.is_some() && (batch || cli.hashes.len() != 1) {
        bail!("--output needs exactly one info hash");
    }

    let mut session = connect(&cli.connection).await?;
    let hashes = select_torrents(&session, &cli, batch).await?;
    info!("Exporting {} torrent(s)", hashes.len());

    let result = if let Some(output) = &cli.output {
        export_one(&session, &hashes[0], output, cli.force).await
    } else {
        export_many(&session, &hashes, &cli).await
    };

    session.logout().await.ok();
    result
}

async fn select_torrents(session: &Session, cli: &Cli, batch: bool) -> Result<Vec<InfoHash>> {
    let mut hashes = cli.hashes.clone();
    if batch {
        let filter = NameFilter::new(&cli.filter)?;
        for torrent in session.torrent_list(cli.category.as_deref()).await? {
            if !filter.matches(&torrent.name) {
                continue;
            }
            let hash = InfoHash::from_hex(&torrent.hash)
                .with_context(|| format!("daemon reported a bad hash for {}", torrent.name))?;
            if !hashes.contains(&hash) {
                hashes.push(hash);
            }
        }
    }
    if hashes.is_empty() {
        bail!("no torrents matched");
    }
    Ok(hashes)
}

async fn fetch_verified(
    session: &Session,
    hash: &InfoHash,
    force: bool,
) -> Result<(TorrentSnapshot, Rebuilt)> {
    let snapshot = TorrentSnapshot::fetch(session, hash).await?;
    let rebuilt = rebuild(&snapshot)?;
    verify(&rebuilt, hash, force)?;
    Ok((snapshot, rebuilt))
}

async fn export_one(session: &Session, hash: &InfoHash, output: &Path, force: bool) -> Result<()> {
    let (_, rebuilt) = fetch_verified(session, hash, force).await?;
    write_output(output, &rebuilt.bytes).await
}

async fn export_to_dir(session: &Session, hash: &InfoHash, out_dir: &Path, force: bool) -> Result<()> {
    let (snapshot, rebuilt) = fetch_verified(session, hash, force).await?;
    write_output(&out_dir.join(snapshot.torrent_file_name()), &rebuilt.bytes).await
}

async fn export_many(session: &Session, hashes: &[InfoHash], cli: &Cli) -> Result<()> {
    let out_dir = cli.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    let pb = ProgressBar::new(hashes.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    let mut failed = 0usize;
    for hash in hashes {
        pb.set_message(hash.to_string());
        if let Err(err) = export_to_dir(session, hash, &out_dir, cli.force).await {
            failed += 1;
            pb.suspend(|| error!("{}: {:#}", hash, err));
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if failed > 0 {
        bail!("{} of {} torrent(s) failed to export", failed, hashes.len());
    }
    Ok(())
}
