//! Fetch page bodies from the GROWI REST API (v3).
//!
//! - Latest revision: `GET /_api/v3/page?pageId=<id>` → `page.revision.body`
//! - Past revision:   `GET /_api/v3/revisions/<revisionId>?pageId=<id>` → `revision.body`
//!
//! Any failure (network, non-2xx status, unexpected JSON) yields `None`; the
//! caller treats that exactly like a page without front matter.

use std::future::Future;

use serde_json::Value;
use url::Url;

/// JSON pointer to the body in the latest-page envelope.
const PAGE_BODY_POINTER: &str = "/page/revision/body";

/// JSON pointer to the body in the revision envelope.
const REVISION_BODY_POINTER: &str = "/revision/body";

/// Source of page Markdown.
pub trait ContentSource {
    /// Body of `page_id` at `revision_id` (latest when `None`), or `None` if
    /// it could not be retrieved.
    fn fetch_page_body(
        &self,
        page_id: &str,
        revision_id: Option<&str>,
    ) -> impl Future<Output = Option<String>>;
}

/// reqwest-backed client for the GROWI API. In the browser reqwest delegates
/// to `fetch`, which sends the user's session cookie with same-origin requests.
pub struct GrowiApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GrowiApiClient {
    /// `base_url` is the GROWI origin, e.g. `https://wiki.example.com`.
    pub fn new(base_url: &str) -> Result<Self, String> {
        let base_url = Url::parse(base_url).map_err(|e| format!("Invalid GROWI base URL: {e}"))?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(format!(
                    "Scheme \"{scheme}\" is not allowed; use http or https"
                ));
            }
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request URL and the JSON pointer of the body inside the response.
    pub(crate) fn request_for(
        &self,
        page_id: &str,
        revision_id: Option<&str>,
    ) -> Result<(Url, &'static str), String> {
        // Accept the "/<id>" form GROWI uses in page paths as well
        let page_id = page_id.strip_prefix('/').unwrap_or(page_id);

        let mut url = self.base_url.clone();
        let pointer = {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| "GROWI base URL cannot carry a path".to_string())?;
            segments.clear().extend(["_api", "v3"]);
            match revision_id {
                Some(revision_id) => {
                    segments.extend(["revisions", revision_id]);
                    REVISION_BODY_POINTER
                }
                None => {
                    segments.push("page");
                    PAGE_BODY_POINTER
                }
            }
        };
        url.set_fragment(None);
        url.query_pairs_mut().clear().append_pair("pageId", page_id);

        Ok((url, pointer))
    }

    async fn fetch_json(&self, url: Url) -> Result<Value, String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("GROWI API request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("GROWI API returned HTTP {}", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse GROWI API JSON: {e}"))
    }
}

impl ContentSource for GrowiApiClient {
    async fn fetch_page_body(&self, page_id: &str, revision_id: Option<&str>) -> Option<String> {
        let (url, pointer) = match self.request_for(page_id, revision_id) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(page_id, error = %e, "cannot build page request");
                return None;
            }
        };

        let json = match self.fetch_json(url).await {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(page_id, revision_id, error = %e, "page body unavailable");
                return None;
            }
        };

        let body = json.pointer(pointer).and_then(Value::as_str);
        if body.is_none() {
            tracing::debug!(page_id, pointer, "response has no page body");
        }
        body.map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
