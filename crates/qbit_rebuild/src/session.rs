use std::time::Duration;

use reqwest::{multipart, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::{
    self, AddTorrentOptions, DaemonFile, TorrentInfo, TorrentProperties, Tracker,
};
use crate::error::ClientError;
use crate::info_hash::InfoHash;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the daemon's WebUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A cookie-authenticated session against the WebUI API.
///
/// The `SID` cookie set by [`Session::login`] is kept by the underlying
/// client and sent with every later request.
pub struct Session {
    client: reqwest::Client,
    base: String,
    username: String,
    password: String,
    authenticated: bool,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = normalize_base_url(&config.url)?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
            authenticated: false,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub async fn login(&mut self) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(api::LOGIN))
            .header(reqwest::header::REFERER, &self.base)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("POST {} -> {}", api::LOGIN, status);
        if status == StatusCode::FORBIDDEN {
            return Err(ClientError::Banned);
        }
        let body = check_status(api::LOGIN, response).await?.text().await?;
        if !is_ok_body(&body) {
            return Err(ClientError::LoginRejected);
        }

        self.authenticated = true;
        info!("Logged in to {} as {}", self.base, self.username);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let response = self.client.post(self.url(api::LOGOUT)).send().await?;
        debug!("POST {} -> {}", api::LOGOUT, response.status());
        check_status(api::LOGOUT, response).await?;
        self.authenticated = false;
        Ok(())
    }

    pub async fn app_version(&self) -> Result<String, ClientError> {
        let response = self.get(api::APP_VERSION, &[]).await?;
        Ok(response.text().await?.trim().to_string())
    }

    pub async fn torrent_list(&self, category: Option<&str>) -> Result<Vec<TorrentInfo>, ClientError> {
        let query: Vec<(&str, &str)> = category.map(|c| ("category", c)).into_iter().collect();
        self.get_json(api::TORRENTS_INFO, &query).await
    }

    pub async fn torrent_info(&self, hash: &InfoHash) -> Result<TorrentInfo, ClientError> {
        let hex = hash.to_hex();
        let infos: Vec<TorrentInfo> = self
            .get_json(api::TORRENTS_INFO, &[("hashes", hex.as_str())])
            .await?;
        infos
            .into_iter()
            .find(|info| info.hash.eq_ignore_ascii_case(&hex))
            .ok_or(ClientError::TorrentNotFound(hex))
    }

    pub async fn torrent_properties(
        &self,
        hash: &InfoHash,
    ) -> Result<TorrentProperties, ClientError> {
        self.get_torrent_json(api::TORRENT_PROPERTIES, hash).await
    }

    pub async fn torrent_trackers(&self, hash: &InfoHash) -> Result<Vec<Tracker>, ClientError> {
        self.get_torrent_json(api::TORRENT_TRACKERS, hash).await
    }

    pub async fn piece_hashes(&self, hash: &InfoHash) -> Result<Vec<String>, ClientError> {
        self.get_torrent_json(api::TORRENT_PIECE_HASHES, hash).await
    }

    /// Files in the daemon's index order.
    pub async fn torrent_files(&self, hash: &InfoHash) -> Result<Vec<DaemonFile>, ClientError> {
        let mut files: Vec<DaemonFile> = self.get_torrent_json(api::TORRENT_FILES, hash).await?;
        files.sort_by_key(|f| f.index);
        Ok(files)
    }

    pub async fn add_torrent(&self, options: &AddTorrentOptions) -> Result<(), ClientError> {
        let part = multipart::Part::bytes(options.torrent.clone())
            .file_name(options.file_name.clone())
            .mime_str("application/x-bittorrent")?;
        let form = options
            .form_fields()
            .into_iter()
            .fold(multipart::Form::new().part("torrents", part), |form, (k, v)| {
                form.text(k, v)
            });

        let response = self
            .client
            .post(self.url(api::TORRENTS_ADD))
            .multipart(form)
            .send()
            .await?;
        debug!("POST {} -> {}", api::TORRENTS_ADD, response.status());

        let body = self.checked(api::TORRENTS_ADD, response).await?.text().await?;
        if body.trim().eq_ignore_ascii_case("fails.") {
            return Err(ClientError::AddRejected);
        }
        Ok(())
    }

    pub async fn delete_torrent(
        &self,
        hash: &InfoHash,
        delete_files: bool,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(api::TORRENTS_DELETE))
            .form(&[
                ("hashes", hash.to_hex()),
                ("deleteFiles", delete_files.to_string()),
            ])
            .send()
            .await?;
        debug!("POST {} -> {}", api::TORRENTS_DELETE, response.status());
        self.checked(api::TORRENTS_DELETE, response).await?;
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    async fn get(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await?;
        debug!("GET {} {:?} -> {}", endpoint, query, response.status());
        self.checked(endpoint, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let body = self.get(endpoint, query).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { endpoint, source })
    }

    async fn get_torrent_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        hash: &InfoHash,
    ) -> Result<T, ClientError> {
        let hex = hash.to_hex();
        match self.get_json(endpoint, &[("hash", hex.as_str())]).await {
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                Err(ClientError::TorrentNotFound(hex))
            }
            other => other,
        }
    }

    async fn checked(
        &self,
        endpoint: &'static str,
        response: Response,
    ) -> Result<Response, ClientError> {
        if response.status() == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized(endpoint));
        }
        check_status(endpoint, response).await
    }
}

async fn check_status(endpoint: &'static str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        endpoint,
        status,
        body,
    })
}

fn is_ok_body(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case("ok.")
}

/// Trims trailing slashes and rejects anything that is not http(s).
fn normalize_base_url(url: &str) -> Result<String, ClientError> {
    let trimmed = url.trim().trim_end_matches('/');
    let has_host = trimmed
        .split_once("://")
        .map(|(scheme, rest)| matches!(scheme, "http" | "https") && !rest.is_empty())
        .unwrap_or(false);
    if !has_host {
        return Err(ClientError::InvalidUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    type Route = (&'static str, u16, &'static str);

    /// Serves fixed responses keyed by request path; unknown paths get 404.
    async fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let path = read_request(&mut stream).await;
                    let (status, body) = routes
                        .iter()
                        .find(|(p, _, _)| *p == path)
                        .map(|(_, status, body)| (*status, *body))
                        .unwrap_or((404, "Not Found"));
                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).await.ok();
                    stream.shutdown().await.ok();
                });
            }
        });
        format!("http://{}", addr)
    }

    // Reads one full request and returns its path without the query.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break buf.len();
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
        let head = head.to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let chunked = head.contains("transfer-encoding: chunked");

        loop {
            let body = &buf[header_end..];
            let done = if chunked {
                body.ends_with(b"0\r\n\r\n")
            } else {
                body.len() >= content_length
            };
            if done {
                break;
            }
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        target.split('?').next().unwrap_or("/").to_string()
    }

    async fn session_for(routes: Vec<Route>) -> Session {
        let config = ClientConfig {
            url: serve(routes).await,
            timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        };
        Session::new(&config).unwrap()
    }

    fn hash() -> InfoHash {
        InfoHash::from_hex(HASH).unwrap()
    }

    #[tokio::test]
    async fn test_login_ok() {
        let mut session = session_for(vec![(api::LOGIN, 200, "Ok.")]).await;
        session.login().await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_fails_body_is_rejected() {
        let mut session = session_for(vec![(api::LOGIN, 200, "Fails.")]).await;
        assert!(matches!(
            session.login().await,
            Err(ClientError::LoginRejected)
        ));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_forbidden_is_banned() {
        let mut session = session_for(vec![(api::LOGIN, 403, "Forbidden")]).await;
        assert!(matches!(session.login().await, Err(ClientError::Banned)));
    }

    #[tokio::test]
    async fn test_forbidden_after_login_is_unauthorized() {
        let mut session = session_for(vec![
            (api::LOGIN, 200, "Ok."),
            (api::TORRENT_PROPERTIES, 403, "Forbidden"),
        ])
        .await;
        session.login().await.unwrap();
        match session.torrent_properties(&hash()).await {
            Err(ClientError::Unauthorized(endpoint)) => {
                assert_eq!(endpoint, api::TORRENT_PROPERTIES)
            }
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_torrent_is_not_found() {
        let session = session_for(vec![(api::TORRENT_TRACKERS, 404, "Not Found")]).await;
        match session.torrent_trackers(&hash()).await {
            Err(ClientError::TorrentNotFound(hex)) => assert_eq!(hex, HASH),
            other => panic!("expected not found, got {:?}", other),
        }

        let session = session_for(vec![(api::TORRENTS_INFO, 200, "[]")]).await;
        assert!(matches!(
            session.torrent_info(&hash()).await,
            Err(ClientError::TorrentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_fails_body_is_rejected() {
        let session = session_for(vec![(api::TORRENTS_ADD, 200, "Fails.")]).await;
        let options = AddTorrentOptions {
            file_name: "a.torrent".into(),
            torrent: b"de".to_vec(),
            ..AddTorrentOptions::default()
        };
        assert!(matches!(
            session.add_torrent(&options).await,
            Err(ClientError::AddRejected)
        ));

        let session = session_for(vec![(api::TORRENTS_ADD, 200, "Ok.")]).await;
        session.add_torrent(&options).await.unwrap();
    }

    #[tokio::test]
    async fn test_files_sorted_by_index() {
        let session = session_for(vec![(
            api::TORRENT_FILES,
            200,
            r#"[{"index": 2, "name": "r/c", "size": 3},
                {"index": 0, "name": "r/a", "size": 1},
                {"index": 1, "name": "r/b", "size": 2}]"#,
        )])
        .await;
        let files = session.torrent_files(&hash()).await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["r/a", "r/b", "r/c"]);
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let session = session_for(vec![(api::TORRENT_PIECE_HASHES, 200, "[\"abc\", ")]).await;
        match session.piece_hashes(&hash()).await {
            Err(ClientError::Decode { endpoint, .. }) => {
                assert_eq!(endpoint, api::TORRENT_PIECE_HASHES)
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_app_version() {
        let session = session_for(vec![(api::APP_VERSION, 200, "v4.6.2\n")]).await;
        assert_eq!(session.app_version().await.unwrap(), "v4.6.2");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8080/").unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(
            normalize_base_url(" https://seedbox.example/qbt// ").unwrap(),
            "https://seedbox.example/qbt"
        );
        assert!(normalize_base_url("localhost:8080").is_err());
        assert!(normalize_base_url("ftp://localhost").is_err());
        assert!(normalize_base_url("http://").is_err());
    }

    #[test]
    fn test_login_body() {
        assert!(is_ok_body("Ok."));
        assert!(is_ok_body("ok.\n"));
        assert!(!is_ok_body("Fails."));
        assert!(!is_ok_body(""));
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new(&ClientConfig::default()).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.base_url(), "http://localhost:8080");
        assert_eq!(
            session.url(api::TORRENT_FILES),
            "http://localhost:8080/api/v2/torrents/files"
        );
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_http_error() {
        let config = ClientConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let mut session = Session::new(&config).unwrap();
        assert!(matches!(session.login().await, Err(ClientError::Http(_))));
        assert!(!session.is_authenticated());
    }
}
