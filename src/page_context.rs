//! GROWI page URLs and the navigation state derived from them.
//!
//! A GROWI page URL looks like `/6995d3fcf17c96c558f6b0ab`, optionally
//! followed by `?revisionId=<id>` (an old revision) and `#edit` (editor open).
//! Everything else (admin screens, search, user pages) is not a page this
//! plugin cares about.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    /// GROWI page ids are MongoDB ObjectIds: 24 hex characters.
    static ref PAGE_ID_RE: Regex = Regex::new(r"(?i)^/([0-9a-f]{24})$").unwrap();
}

/// Query parameter GROWI uses when showing a past revision.
const REVISION_PARAM: &str = "revisionId";

/// Fragment GROWI appends while the editor is open.
const EDIT_FRAGMENT: &str = "edit";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether the page is being read or edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    View,
    Edit,
}

impl PageMode {
    /// Map a URL fragment (without the leading `#`) to a mode.
    pub fn from_fragment(fragment: Option<&str>) -> Self {
        match fragment {
            Some(EDIT_FRAGMENT) => PageMode::Edit,
            _ => PageMode::View,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageMode::View => "view",
            PageMode::Edit => "edit",
        }
    }
}

/// One distinct navigable state: page, mode and (optional) revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Bare 24-character id, without the leading `/`.
    pub page_id: String,
    pub mode: PageMode,
    /// `None` when the latest revision is shown.
    pub revision_id: Option<String>,
}

impl PageContext {
    /// Derive the context from an absolute URL.
    ///
    /// Returns `None` for URLs that do not point at a page.
    pub fn from_url(url: &Url) -> Option<Self> {
        let page_id = extract_page_id(url.path())?;
        let revision_id = url
            .query_pairs()
            .find(|(key, _)| key == REVISION_PARAM)
            .map(|(_, value)| value.into_owned())
            // `?revisionId=` with no value shows the latest revision
            .filter(|value| !value.is_empty());

        Some(Self {
            page_id: page_id.to_string(),
            mode: PageMode::from_fragment(url.fragment()),
            revision_id,
        })
    }

    /// Parse `href` and derive the context. Unparseable URLs yield `None`.
    pub fn from_href(href: &str) -> Option<Self> {
        match Url::parse(href) {
            Ok(url) => Self::from_url(&url),
            Err(e) => {
                tracing::debug!(href, error = %e, "ignoring unparseable navigation URL");
                None
            }
        }
    }

    /// Serialized identity used for duplicate suppression.
    ///
    /// An absent revision serializes as the empty string, which no real
    /// revision id can collide with.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}::{}::{}",
            self.page_id,
            self.mode.as_str(),
            self.revision_id.as_deref().unwrap_or("")
        )
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Returns true if `pathname` is a page-id URL (`/<24 hex>`).
pub fn is_page_id_path(pathname: &str) -> bool {
    PAGE_ID_RE.is_match(pathname)
}

/// Extract the page id from `pathname`, or `None` for non-page paths.
pub fn extract_page_id(pathname: &str) -> Option<&str> {
    PAGE_ID_RE
        .captures(pathname)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
