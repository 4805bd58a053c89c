//! HTTP remote source.
//!
//! The actual HTTP client is abstracted via a trait so any library
//! (reqwest, ureq, hyper) or an in-process loopback can carry the requests.
//! Bodies are JSON arrays of objects, each with an integer `id`.

use crate::error::{SyncError, SyncResult};
use crate::mediator::PageSize;
use crate::remote::{RemoteResponse, RemoteSource};
use feedsync_core::{Item, ItemId};
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::debug;

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    ///
    /// `Err` means no response arrived at all (DNS, connect, timeout).
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub message: String,
    /// Body bytes; empty if the server sent none.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A `200 OK` response with a body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            message: "OK".to_string(),
            body: body.into(),
        }
    }
}

/// [`RemoteSource`] over a JSON posts API.
///
/// | fetch | request |
/// |---|---|
/// | latest | `GET {base}/api/posts/latest?count=N` |
/// | after `id` | `GET {base}/api/posts/{id}/after?count=N` |
/// | before `id` | `GET {base}/api/posts/{id}/before?count=N` |
pub struct HttpRemoteSource<C: HttpClient> {
    base_url: String,
    client: C,
}

#[derive(Deserialize)]
struct IdField {
    id: i64,
}

impl<C: HttpClient> HttpRemoteSource<C> {
    /// Creates a source for the API at `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_page(&self, path: &str, limit: PageSize) -> SyncResult<RemoteResponse> {
        let url = format!("{}{}?count={}", self.base_url, path, limit.get());
        debug!(%url, "fetching page");

        let response = self.client.get(&url).map_err(SyncError::Network)?;
        if !(200..300).contains(&response.status) || response.body.is_empty() {
            return Ok(RemoteResponse {
                status: response.status,
                message: response.message,
                body: None,
            });
        }

        let items = decode_items(&response.body)?;
        Ok(RemoteResponse {
            status: response.status,
            message: response.message,
            body: Some(items),
        })
    }
}

/// Decodes a JSON array of objects. Each object's text becomes the payload
/// of an item keyed by its `id` field.
fn decode_items(body: &[u8]) -> SyncResult<Vec<Item>> {
    let raw: Vec<&RawValue> = serde_json::from_slice(body)
        .map_err(|e| SyncError::decode(format!("response is not a JSON array: {e}")))?;

    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            let IdField { id } = serde_json::from_str(value.get())
                .map_err(|e| SyncError::decode(format!("element {index}: {e}")))?;
            Ok(Item::new(id, value.get().as_bytes().to_vec()))
        })
        .collect()
}

impl<C: HttpClient> RemoteSource for HttpRemoteSource<C> {
    fn fetch_latest(&self, limit: PageSize) -> SyncResult<RemoteResponse> {
        self.get_page("/api/posts/latest", limit)
    }

    fn fetch_after(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        self.get_page(&format!("/api/posts/{id}/after"), limit)
    }

    fn fetch_before(&self, id: ItemId, limit: PageSize) -> SyncResult<RemoteResponse> {
        self.get_page(&format!("/api/posts/{id}/before"), limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Answers every request with one canned response and records URLs.
    struct CannedClient {
        response: Result<HttpResponse, String>,
        urls: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(response: Result<HttpResponse, String>) -> Self {
            Self {
                response,
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for CannedClient {
        fn get(&self, url: &str) -> Result<HttpResponse, String> {
            self.urls.lock().push(url.to_string());
            self.response.clone()
        }
    }

    fn page(n: u32) -> PageSize {
        PageSize::new(n).unwrap()
    }

    #[test]
    fn builds_endpoint_urls() {
        let source = HttpRemoteSource::new(
            "http://10.0.2.2:9999/",
            CannedClient::new(Ok(HttpResponse::ok("[]"))),
        );
        source.fetch_latest(page(60)).unwrap();
        source.fetch_after(ItemId::new(50), page(20)).unwrap();
        source.fetch_before(ItemId::new(48), page(20)).unwrap();

        assert_eq!(source.base_url(), "http://10.0.2.2:9999");
        assert_eq!(
            *source.client.urls.lock(),
            vec![
                "http://10.0.2.2:9999/api/posts/latest?count=60",
                "http://10.0.2.2:9999/api/posts/50/after?count=20",
                "http://10.0.2.2:9999/api/posts/48/before?count=20",
            ]
        );
    }

    #[test]
    fn payload_is_the_verbatim_object() {
        let body = r#"[{"id":50,"author":"Netology","likes":3},{"id": 49, "content":"hi"}]"#;
        let source = HttpRemoteSource::new("http://h", CannedClient::new(Ok(HttpResponse::ok(body))));

        let items = source.fetch_latest(page(2)).unwrap().into_page().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, ItemId::new(50));
        assert_eq!(items[0].payload, br#"{"id":50,"author":"Netology","likes":3}"#.to_vec());
        assert_eq!(items[1].payload, br#"{"id": 49, "content":"hi"}"#.to_vec());
    }

    #[test]
    fn error_status_has_no_body() {
        let source = HttpRemoteSource::new(
            "http://h",
            CannedClient::new(Ok(HttpResponse {
                status: 500,
                message: "Internal Server Error".into(),
                body: b"oops".to_vec(),
            })),
        );
        let response = source.fetch_latest(page(1)).unwrap();
        assert_eq!(response.status, 500);
        assert!(response.body.is_none());
    }

    #[test]
    fn empty_success_body_is_missing() {
        let source = HttpRemoteSource::new("http://h", CannedClient::new(Ok(HttpResponse::ok(""))));
        assert!(matches!(
            source.fetch_latest(page(1)).unwrap().into_page(),
            Err(SyncError::Api { status: 200, .. })
        ));
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        for body in [r#"{"id":1}"#, r#"[{"title":"no id"}]"#, r#"[{"id":"1"}]"#, "not json"] {
            let source =
                HttpRemoteSource::new("http://h", CannedClient::new(Ok(HttpResponse::ok(body))));
            assert!(
                matches!(source.fetch_latest(page(1)), Err(SyncError::Decode(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn transport_failure_is_network_error() {
        let source =
            HttpRemoteSource::new("http://h", CannedClient::new(Err("connection refused".into())));
        assert!(matches!(
            source.fetch_after(ItemId::new(1), page(1)),
            Err(SyncError::Network(msg)) if msg == "connection refused"
        ));
    }
}
