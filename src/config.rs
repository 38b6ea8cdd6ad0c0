use serde::{Deserialize, Serialize};

/// Registry key under `window.pluginActivators`. Must match the package name
/// GROWI knows the plugin by.
pub const DEFAULT_PLUGIN_NAME: &str = "growi-plugin-front-matter-viewer";

/// Reserved element id of the panel container.
pub const DEFAULT_CONTAINER_ID: &str = "growi-plugin-front-matter-viewer-container";

/// Floating panel in the bottom-right corner, used when no sidebar is found.
pub const DEFAULT_FALLBACK_STYLE: &str = "position: fixed; bottom: 20px; right: 20px; \
     width: 320px; max-height: 80vh; overflow-y: auto; z-index: 9999; \
     box-shadow: 0 4px 12px rgba(0,0,0,0.2); border-radius: 4px; background: #fff;";

/// Sidebar locators tried in order. GROWI's markup changes between versions;
/// check these against the running instance when upgrading the host.
const DEFAULT_ANCHOR_SELECTORS: &[&str] = &[
    "[data-testid=\"grw-sidebar-contents-scroll-container\"]",
    "[data-testid=\"grw-side-contents\"]",
    "#grw-sidebar-contents",
    ".grw-sidebar-contents-scroll-container",
    ".grw-sidebar",
    "#grw-sidebar",
];

// ---------------------------------------------------------------------------
// Anchor locators
// ---------------------------------------------------------------------------

/// Where the container goes relative to a matched anchor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Insertion {
    /// Last child of the anchor
    #[default]
    Append,
    /// First child of the anchor
    Prepend,
    /// Sibling immediately before the anchor
    Before,
    /// Sibling immediately after the anchor
    After,
}

/// One integration point candidate in the host DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLocator {
    pub selector: String,
    #[serde(default)]
    pub insertion: Insertion,
}

impl AnchorLocator {
    pub fn append_to(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            insertion: Insertion::Append,
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// Ordered sidebar locators; first match wins
    #[serde(default = "default_anchors")]
    pub anchors: Vec<AnchorLocator>,
    /// Inline style of the floating fallback container
    #[serde(default = "default_fallback_style")]
    pub fallback_style: String,
    /// Origin of the GROWI API (None = the page's own origin)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// tracing-subscriber filter directives, e.g. "debug" or "front_matter_viewer=trace"
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_plugin_name() -> String {
    DEFAULT_PLUGIN_NAME.to_string()
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_anchors() -> Vec<AnchorLocator> {
    DEFAULT_ANCHOR_SELECTORS
        .iter()
        .map(|s| AnchorLocator::append_to(s))
        .collect()
}

fn default_fallback_style() -> String {
    DEFAULT_FALLBACK_STYLE.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            plugin_name: default_plugin_name(),
            container_id: default_container_id(),
            anchors: default_anchors(),
            fallback_style: default_fallback_style(),
            api_base_url: None,
            log_filter: default_log_filter(),
        }
    }
}

impl PluginConfig {
    /// Parse a JSON override (missing fields take their defaults).
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Corrupt front matter viewer config: {e}"))
    }

    /// Load the effective config from an optional JSON override.
    ///
    /// Never fails: corrupt JSON falls back to defaults. Problems are returned
    /// as warnings because logging is configured from the result.
    pub fn load(json: Option<&str>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let config = match json.map(Self::from_json) {
            None => Self::default(),
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                warnings.push(format!("{e}. Using defaults."));
                Self::default()
            }
        };
        let (config, mut repairs) = config.validated();
        warnings.append(&mut repairs);
        (config, warnings)
    }

    /// Repair values that would leave the plugin unusable.
    pub fn validated(mut self) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        if self.plugin_name.trim().is_empty() {
            warnings.push(format!("pluginName is empty; using \"{DEFAULT_PLUGIN_NAME}\""));
            self.plugin_name = default_plugin_name();
        }
        if self.container_id.trim().is_empty() {
            warnings.push(format!("containerId is empty; using \"{DEFAULT_CONTAINER_ID}\""));
            self.container_id = default_container_id();
        }
        let before = self.anchors.len();
        self.anchors.retain(|locator| !locator.selector.trim().is_empty());
        if self.anchors.len() != before {
            warnings.push(format!(
                "dropped {} anchor locator(s) with an empty selector",
                before - self.anchors.len()
            ));
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = default_log_filter();
        }
        (self, warnings)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
