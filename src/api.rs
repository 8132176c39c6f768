use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::models::Photo;

/// Largest thumbnail body we are willing to buffer.
pub const MAX_THUMBNAIL_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("could not read response body: {0}")]
    Body(#[from] std::io::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => ApiError::Status(code),
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

/// The two mutually exclusive ways the collection is queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoQuery {
    /// Titles starting with the text; the page number plays no part.
    TitlePrefix(String),
    /// One album, numbered from 1.
    Album(usize),
}

impl PhotoQuery {
    pub fn for_view(search_text: &str, page: usize) -> Self {
        if search_text.is_empty() {
            PhotoQuery::Album(page + 1)
        } else {
            PhotoQuery::TitlePrefix(search_text.to_string())
        }
    }

    pub fn param(&self) -> (&'static str, String) {
        match self {
            PhotoQuery::TitlePrefix(text) => ("title_like", format!("^{text}")),
            PhotoQuery::Album(album) => ("albumId", album.to_string()),
        }
    }
}

impl fmt::Display for PhotoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, value) = self.param();
        write!(f, "{key}={value}")
    }
}

/// Where photos and their thumbnails come from. Implementations block; they
/// are only called from worker threads.
pub trait PhotoSource: Send + Sync {
    fn fetch_photos(&self, query: &PhotoQuery) -> Result<Vec<Photo>, ApiError>;
    fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

pub struct HttpPhotoSource {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpPhotoSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("photos_table/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl PhotoSource for HttpPhotoSource {
    fn fetch_photos(&self, query: &PhotoQuery) -> Result<Vec<Photo>, ApiError> {
        let (key, value) = query.param();
        let body = self
            .agent
            .get(&self.endpoint)
            .query(key, &value)
            .call()?
            .into_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.agent.get(url).call()?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_THUMBNAIL_BYTES + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_THUMBNAIL_BYTES {
            return Err(ApiError::TooLarge {
                limit: MAX_THUMBNAIL_BYTES,
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serves exactly one canned HTTP response and reports the request line.
    fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let head = String::from_utf8_lossy(&head).to_string();
            let request_line = head.lines().next().unwrap_or_default().to_string();
            tx.send(request_line).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
        });
        (format!("http://{addr}/photos"), rx)
    }

    const ONE_PHOTO: &str = r#"[{"albumId":3,"id":101,"title":"incidunt alias vel enim","url":"https://via.placeholder.com/600/e743b","thumbnailUrl":"https://via.placeholder.com/150/e743b"}]"#;

    #[test]
    fn search_query_ignores_page() {
        assert_eq!(
            PhotoQuery::for_view("cat", 7),
            PhotoQuery::TitlePrefix("cat".to_string())
        );
        assert_eq!(PhotoQuery::for_view("cat", 7), PhotoQuery::for_view("cat", 0));
    }

    #[test]
    fn browse_query_requests_next_album() {
        for page in [0usize, 1, 42, 99] {
            assert_eq!(PhotoQuery::for_view("", page), PhotoQuery::Album(page + 1));
        }
    }

    #[test]
    fn query_params_match_endpoint_filters() {
        assert_eq!(
            PhotoQuery::TitlePrefix("accus".into()).param(),
            ("title_like", "^accus".to_string())
        );
        assert_eq!(PhotoQuery::Album(3).param(), ("albumId", "3".to_string()));
        assert_eq!(PhotoQuery::Album(3).to_string(), "albumId=3");
    }

    #[test]
    fn fetches_album_over_http() {
        let (endpoint, requests) = serve_once("200 OK", ONE_PHOTO);
        let source = HttpPhotoSource::new(endpoint, Duration::from_secs(5));

        let photos = source.fetch_photos(&PhotoQuery::Album(3)).unwrap();

        assert_eq!(requests.recv().unwrap(), "GET /photos?albumId=3 HTTP/1.1");
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, 101);
        assert_eq!(photos[0].album_id, 3);
    }

    #[test]
    fn title_prefix_is_sent_with_caret() {
        let (endpoint, requests) = serve_once("200 OK", "[]");
        let source = HttpPhotoSource::new(endpoint, Duration::from_secs(5));

        let photos = source
            .fetch_photos(&PhotoQuery::TitlePrefix("accus".into()))
            .unwrap();

        assert!(photos.is_empty());
        assert_eq!(
            requests.recv().unwrap(),
            "GET /photos?title_like=%5Eaccus HTTP/1.1"
        );
    }

    #[test]
    fn error_status_is_reported() {
        let (endpoint, _requests) = serve_once("500 Internal Server Error", "oops");
        let source = HttpPhotoSource::new(endpoint, Duration::from_secs(5));

        let err = source.fetch_photos(&PhotoQuery::Album(1)).unwrap_err();
        assert!(matches!(err, ApiError::Status(500)));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let (endpoint, _requests) = serve_once("200 OK", r#"{"not":"an array"}"#);
        let source = HttpPhotoSource::new(endpoint, Duration::from_secs(5));

        let err = source.fetch_photos(&PhotoQuery::Album(1)).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpPhotoSource::new(format!("http://{addr}/photos"), Duration::from_secs(2));

        let err = source.fetch_photos(&PhotoQuery::Album(1)).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn thumbnail_bytes_are_returned() {
        let (url, _requests) = serve_once("200 OK", "PNGDATA");
        let source = HttpPhotoSource::new("http://unused.invalid/photos", Duration::from_secs(5));

        let bytes = source.fetch_thumbnail(&url).unwrap();
        assert_eq!(bytes, b"PNGDATA");
    }
}
