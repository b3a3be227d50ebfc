use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncWriteExt;
use tracing::info;

use qbit_rebuild::{ClientConfig, Session};
use util::config::{Config, Overrides};

/// How to reach the daemon. Flags win over `QBT_*` variables and the config file.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// WebUI base URL, e.g. http://localhost:8080
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long, short = 'u')]
    pub username: Option<String>,

    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// JSON config file (default: <config dir>/qbt-rebuild/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn resolve(&self) -> Result<ClientConfig> {
        let config = Config::resolve(
            self.config.as_deref(),
            Overrides {
                url: self.url.clone(),
                username: self.username.clone(),
                password: self.password.clone(),
                timeout_secs: self.timeout,
            },
        )?;
        Ok(client_config(config))
    }
}

pub fn client_config(config: Config) -> ClientConfig {
    ClientConfig {
        url: config.url,
        username: config.username,
        password: config.password,
        timeout: Duration::from_secs(config.timeout_secs),
    }
}

pub fn init_tracing() {
    #[cfg(not(feature = "tokio-console"))]
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "tokio-console")]
    console_subscriber::init();
}

/// Opens and authenticates a session.
pub async fn connect(args: &ConnectionArgs) -> Result<Session> {
    let config = args.resolve()?;
    let mut session = Session::new(&config)?;
    session
        .login()
        .await
        .with_context(|| format!("failed to log in to {}", session.base_url()))?;
    let version = session.app_version().await?;
    info!("Connected to qBittorrent {} at {}", version, session.base_url());
    Ok(session)
}

/// Writes `bytes` to `path`, or to stdout when `path` is `-`.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if path == Path::new("-") {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(bytes).await?;
        stdout.flush().await?;
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
