//! Outbound Page Fetch
//!
//! Bookmarks get a favicon and a preview image derived from the target page.
//! Fetching is bounded in time and size, and a failure never prevents the
//! bookmark from being saved.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::time::Duration;

use crate::config::AppConfig;
use crate::domain::{DomainError, DomainResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// 100 KB is enough to reach the `<head>` of nearly any page
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024;

static OG_IMAGE: Lazy<Regex> = Lazy::new(|| meta_image_regex("og:image"));
static TWITTER_IMAGE: Lazy<Regex> = Lazy::new(|| meta_image_regex("twitter:image"));

/// Matches `<meta property="NAME" content="...">` in either attribute order
fn meta_image_regex(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(
        r#"(?i)<meta\s+[^>]*?(?:property|name)=["']{name}["']\s+[^>]*?content=["']([^"']+)["']|<meta\s+[^>]*?content=["']([^"']+)["']\s+[^>]*?(?:property|name)=["']{name}["']"#
    ))
    .expect("meta image pattern is valid")
}

/// Retrieves the text of a remote page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> DomainResult<String>;
}

/// reqwest-backed fetcher with a request timeout and a body size cap
pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("infokeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::ExternalFetch(e.to_string()))?;
        Ok(Self { client, max_bytes })
    }

    pub fn from_config(config: &AppConfig) -> DomainResult<Self> {
        Self::new(config.fetch_timeout(), config.fetch_max_bytes)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> DomainResult<String> {
        let fetch_err = |e: reqwest::Error| DomainError::ExternalFetch(format!("{}: {}", url, e));

        let mut resp = self.client.get(url).send().await.map_err(fetch_err)?;
        if !resp.status().is_success() {
            return Err(DomainError::ExternalFetch(format!(
                "{} returned status {}",
                url,
                resp.status()
            )));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(fetch_err)? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_bytes {
                body.truncate(self.max_bytes);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn first_capture(re: &Regex, html: &str) -> Option<String> {
    let caps = re.captures(html)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Preview image declared by the page: `og:image`, else `twitter:image`
pub fn extract_preview_image(html: &str) -> Option<String> {
    first_capture(&OG_IMAGE, html).or_else(|| first_capture(&TWITTER_IMAGE, html))
}

/// Conventional favicon location for a page URL
pub fn favicon_url(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url.trim()).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}/favicon.ico", url.scheme(), host, port),
        None => format!("{}://{}/favicon.ico", url.scheme(), host),
    })
}

/// Fetch the page and pull out its preview image. Errors are logged and
/// swallowed.
pub async fn fetch_thumbnail(fetcher: &dyn PageFetcher, page_url: &str) -> Option<String> {
    match fetcher.fetch_page(page_url).await {
        Ok(html) => extract_preview_image(&html),
        Err(e) => {
            log::warn!("Thumbnail fetch skipped: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    struct StaticPage(&'static str);

    #[async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch_page(&self, _url: &str) -> DomainResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl PageFetcher for Unreachable {
        async fn fetch_page(&self, url: &str) -> DomainResult<String> {
            Err(DomainError::ExternalFetch(format!("{} timed out", url)))
        }
    }

    #[test]
    fn test_og_image_property_first() {
        let html = r#"<head><meta property="og:image" content="https://x.test/a.png"></head>"#;
        assert_eq!(extract_preview_image(html).as_deref(), Some("https://x.test/a.png"));
    }

    #[test]
    fn test_og_image_content_first() {
        let html = r#"<META content='https://x.test/b.jpg' property='og:image' />"#;
        assert_eq!(extract_preview_image(html).as_deref(), Some("https://x.test/b.jpg"));
    }

    #[test]
    fn test_twitter_image_fallback() {
        let html = r#"<meta name="twitter:image" content="https://x.test/t.png">"#;
        assert_eq!(extract_preview_image(html).as_deref(), Some("https://x.test/t.png"));
        assert_eq!(extract_preview_image("<html></html>"), None);
    }

    #[test]
    fn test_favicon_url() {
        assert_eq!(
            favicon_url("https://example.com/some/page?q=1").as_deref(),
            Some("https://example.com/favicon.ico")
        );
        assert_eq!(
            favicon_url("http://localhost:8080/x").as_deref(),
            Some("http://localhost:8080/favicon.ico")
        );
        assert_eq!(favicon_url("not a url"), None);
    }

    #[tokio::test]
    async fn test_fetch_thumbnail_swallows_errors() {
        assert_eq!(fetch_thumbnail(&Unreachable, "http://slow.test").await, None);

        let page = StaticPage(r#"<meta property="og:image" content="/img.png">"#);
        assert_eq!(
            fetch_thumbnail(&page, "http://ok.test").await.as_deref(),
            Some("/img.png")
        );
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpPageFetcher::new(DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES).is_ok());
    }

    /// Accept one connection on a local port and hand it to `respond`.
    /// Returns the URL to fetch.
    async fn local_server<F, Fut>(respond: F) -> String
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                respond(socket).await;
            }
        });
        format!("http://{}/page", addr)
    }

    #[tokio::test]
    async fn test_body_capped_at_max_bytes() {
        let body_len = 3 * DEFAULT_MAX_BYTES;
        let url = local_server(move |mut socket| async move {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
                body_len
            );
            let _ = socket.write_all(head.as_bytes()).await;
            // The client hangs up after the cap; later writes may fail
            let _ = socket.write_all(&vec![b'a'; body_len]).await;
        })
        .await;

        let fetcher = HttpPageFetcher::new(DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES).unwrap();
        let page = fetcher.fetch_page(&url).await.unwrap();
        assert_eq!(page.len(), DEFAULT_MAX_BYTES);
        assert!(page.bytes().all(|b| b == b'a'));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let url = local_server(|socket| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        })
        .await;

        let fetcher = HttpPageFetcher::new(Duration::from_millis(200), DEFAULT_MAX_BYTES).unwrap();
        let started = std::time::Instant::now();
        let err = fetcher.fetch_page(&url).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalFetch(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_error_status_is_a_fetch_error() {
        let url = local_server(|mut socket| async move {
            let _ = socket
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await;
        })
        .await;

        let fetcher = HttpPageFetcher::new(DEFAULT_TIMEOUT, DEFAULT_MAX_BYTES).unwrap();
        assert!(matches!(
            fetcher.fetch_page(&url).await,
            Err(DomainError::ExternalFetch(_))
        ));
    }
}
