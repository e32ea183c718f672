//! HTTP client for the metadata API and artwork downloads.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use {
    futures::StreamExt,
    reqwest::{Client, Response},
    tokio::{
        fs::{File, create_dir_all, remove_file, rename},
        io::{AsyncWriteExt, BufWriter},
    },
    tracing::debug,
};

use crate::{
    config::UserSettings,
    error::EnrichmentError,
    online::{
        enrichment::MetadataSource,
        models::{LyricResponse, RemoteSong, SearchResponse},
    },
};

/// Write buffer used for streamed downloads.
const DOWNLOAD_BUFFER_SIZE: usize = 8192;

/// Client for `search` and `lyric` endpoints plus plain file downloads.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    api: Client,
    downloads: Client,
    base_url: String,
}

impl MetadataClient {
    /// Builds the API and download clients from user settings.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::HttpError` if a client cannot be built.
    pub fn from_settings(settings: &UserSettings) -> Result<Self, EnrichmentError> {
        let api = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(concat!("melodeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let downloads = Client::builder()
            .connect_timeout(Duration::from_secs(settings.download_timeout_secs))
            .timeout(Duration::from_secs(settings.download_timeout_secs))
            .user_agent(settings.download_user_agent.as_str())
            .build()?;

        Ok(Self {
            api,
            downloads,
            base_url: settings.metadata_api_base_url.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }
}

fn check_status(response: Response) -> Result<Response, EnrichmentError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EnrichmentError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// `<dest>.part`, the file a download streams into before it is renamed.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

impl MetadataSource for MetadataClient {
    async fn search(&self, keywords: &str, limit: u32) -> Result<Vec<RemoteSong>, EnrichmentError> {
        let url = self.endpoint("search");
        debug!("Searching {url} for \"{keywords}\"");
        let response = self
            .api
            .get(&url)
            .query(&[("keywords", keywords), ("type", "1")])
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: SearchResponse = check_status(response)?.json().await?;
        Ok(body.into_songs())
    }

    async fn fetch_lyrics(&self, id: i64) -> Result<Option<String>, EnrichmentError> {
        let url = self.endpoint("lyric");
        let response = self.api.get(&url).query(&[("id", id)]).send().await?;
        let body: LyricResponse = check_status(response)?.json().await?;
        Ok(body.into_text())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, EnrichmentError> {
        let response = check_status(self.downloads.get(url).send().await?)?;
        if let Some(parent) = dest.parent() {
            create_dir_all(parent).await?;
        }

        let partial = partial_path(dest);
        let written = stream_to_file(response, &partial).await;
        match written {
            Ok(0) => {
                let _ = remove_file(&partial).await;
                Err(EnrichmentError::EmptyBody {
                    url: url.to_string(),
                })
            }
            Ok(bytes) => {
                rename(&partial, dest).await?;
                debug!("Downloaded {bytes} bytes from {url} to {:?}", dest);
                Ok(bytes)
            }
            Err(e) => {
                let _ = remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file(response: Response, path: &Path) -> Result<u64, EnrichmentError> {
    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut total = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        total = total.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
    }
    writer.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{create_dir_all, read, write},
        path::{Path, PathBuf},
    };

    use {
        tempfile::TempDir,
        tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::TcpListener,
        },
    };

    use crate::{
        config::UserSettings,
        error::EnrichmentError,
        online::{
            client::{MetadataClient, partial_path},
            enrichment::MetadataSource,
        },
    };

    /// Serves one connection with `response` (raw HTTP) and closes it.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/cover.jpg")
    }

    fn cached_cover(dir: &TempDir) -> PathBuf {
        let dest = dir.path().join("album_art").join("sunrise.jpg");
        create_dir_all(dest.parent().unwrap()).unwrap();
        write(&dest, b"old cover").unwrap();
        dest
    }

    fn client() -> MetadataClient {
        MetadataClient::from_settings(&UserSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_download_replaces_file_on_success() {
        let dir = TempDir::new().unwrap();
        let dest = cached_cover(&dir);
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnew cover",
        )
        .await;

        assert_eq!(client().download(&url, &dest).await.unwrap(), 9);
        assert_eq!(read(&dest).unwrap(), b"new cover");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_empty_body_keeps_cached_file() {
        let dir = TempDir::new().unwrap();
        let dest = cached_cover(&dir);
        let url =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

        let error = client().download(&url, &dest).await.unwrap_err();

        assert!(matches!(error, EnrichmentError::EmptyBody { .. }));
        assert_eq!(read(&dest).unwrap(), b"old cover");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_error_status_keeps_cached_file() {
        let dir = TempDir::new().unwrap();
        let dest = cached_cover(&dir);
        let url = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let error = client().download(&url, &dest).await.unwrap_err();

        assert!(matches!(error, EnrichmentError::Status { status: 404, .. }));
        assert_eq!(read(&dest).unwrap(), b"old cover");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_truncated_body_keeps_cached_file() {
        let dir = TempDir::new().unwrap();
        let dest = cached_cover(&dir);
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\nonly a few bytes",
        )
        .await;

        let error = client().download(&url, &dest).await.unwrap_err();

        assert!(matches!(error, EnrichmentError::HttpError(_)));
        assert_eq!(read(&dest).unwrap(), b"old cover");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/data/album_art/song.jpg")),
            Path::new("/data/album_art/song.jpg.part")
        );
    }

    #[test]
    fn test_endpoints_follow_base_url() {
        let client = MetadataClient::from_settings(&UserSettings::default()).unwrap();
        assert_eq!(
            client.endpoint("search"),
            "https://music-api.heheda.top/search"
        );
        assert_eq!(client.endpoint("lyric"), "https://music-api.heheda.top/lyric");
    }
}
