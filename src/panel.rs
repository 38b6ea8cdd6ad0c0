//! The front matter panel as a pure view model.
//!
//! `render_panel` turns [`PanelState`] into a small element tree
//! ([`ViewNode`]); the web renderer materialises that tree into DOM nodes and
//! routes clicks on elements carrying [`ACTION_ATTR`] back to
//! [`PanelState::apply`]. Keeping the tree free of DOM types lets the whole
//! presentation be tested natively.
//!
//! Colours come from Bootstrap 5 CSS variables provided by GROWI, so the panel
//! follows the host's light/dark theme without hard-coded values.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::front_matter::FrontMatter;

/// Attribute naming the action a clickable element triggers.
pub const ACTION_ATTR: &str = "data-fmv-action";

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s,<>"']+"#).unwrap();
}

mod style {
    const BASE_BTN: &str =
        "font-size: 11px; border: 1px solid var(--bs-border-color); border-radius: 3px; cursor: pointer;";

    pub(super) const PANEL: &str = "margin: 8px 0; border: 1px solid var(--bs-border-color); \
        border-radius: 4px; font-size: 12px; font-family: inherit; overflow: hidden; \
        background: var(--bs-body-bg); color: var(--bs-body-color);";
    pub(super) const HEADER: &str = "display: flex; align-items: center; justify-content: space-between; \
        padding: 6px 10px; background: var(--bs-tertiary-bg); border-bottom: 1px solid var(--bs-border-color);";
    pub(super) const TITLE: &str = "font-weight: bold; font-size: 11px; text-transform: uppercase; \
        letter-spacing: 0.05em; color: var(--bs-secondary-color);";
    pub(super) const TOGGLE_GROUP: &str = "display: flex; gap: 2px;";
    pub(super) const BODY: &str = "padding: 8px; max-height: 400px; overflow-y: auto;";
    pub(super) const TABLE: &str = "width: 100%; border-collapse: collapse;";
    pub(super) const TH: &str = "padding: 3px 6px; text-align: left; vertical-align: top; \
        color: var(--bs-secondary-color); white-space: nowrap; font-weight: normal; \
        border-bottom: 1px solid var(--bs-border-color); width: 35%;";
    pub(super) const TH_INDEX: &str = "padding: 3px 6px; text-align: left; vertical-align: top; \
        color: var(--bs-secondary-color); white-space: nowrap; font-weight: normal; \
        border-bottom: 1px solid var(--bs-border-color); width: 20px;";
    pub(super) const TD: &str = "padding: 3px 6px; vertical-align: top; \
        border-bottom: 1px solid var(--bs-border-color); word-break: break-all;";
    pub(super) const PRE: &str = "margin: 0; padding: 4px; font-size: 11px; \
        background: var(--bs-tertiary-bg); color: var(--bs-body-color); border-radius: 3px; \
        overflow-x: auto; white-space: pre-wrap; word-break: break-all;";
    pub(super) const BADGE: &str = "display: inline-block; padding: 1px 5px; border-radius: 10px; \
        font-size: 10px; background: var(--bs-secondary-bg); color: var(--bs-secondary-color);";
    pub(super) const LINK: &str = "color: rgba(var(--grw-wiki-link-color-rgb, var(--bs-link-color-rgb)), var(--bs-link-opacity, 1)); \
        text-decoration-color: rgba(var(--grw-wiki-link-color-rgb, var(--bs-link-color-rgb)), var(--bs-link-underline-opacity, 1));";

    pub(super) fn button(active: bool) -> String {
        let (background, color) = if active {
            ("var(--bs-primary-border-subtle)", "var(--bs-btn-active-color)")
        } else {
            ("var(--bs-btn-bg)", "var(--bs-btn-color)")
        };
        format!("{BASE_BTN} padding: 2px 8px; background: {background}; color: {color};")
    }

    pub(super) fn chevron(collapsed: bool) -> String {
        let rotation = if collapsed { -90 } else { 0 };
        format!(
            "{BASE_BTN} padding: 2px 6px; background: var(--bs-btn-bg); color: var(--bs-btn-color); \
             line-height: 1; transform: rotate({rotation}deg); transition: transform 0.2s ease;"
        )
    }
}

// ---------------------------------------------------------------------------
// View tree
// ---------------------------------------------------------------------------

/// Minimal element tree produced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<ViewNode>,
    },
    Text(String),
}

impl ViewNode {
    fn element(tag: &'static str) -> Self {
        ViewNode::Element {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn text(text: impl Into<String>) -> Self {
        ViewNode::Text(text.into())
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let ViewNode::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    fn style(self, css: impl Into<String>) -> Self {
        self.attr("style", css)
    }

    fn child(mut self, node: ViewNode) -> Self {
        if let ViewNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    fn children(mut self, nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        if let ViewNode::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    /// Concatenated text content, the way `Node.textContent` reports it.
    pub fn text_content(&self) -> String {
        match self {
            ViewNode::Text(text) => text.clone(),
            ViewNode::Element { children, .. } => {
                children.iter().map(ViewNode::text_content).collect()
            }
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        match self {
            ViewNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.as_str()),
            ViewNode::Text(_) => None,
        }
    }

    /// Depth-first search for elements with the given tag.
    pub fn find_all(&self, wanted: &str) -> Vec<&ViewNode> {
        let mut found = Vec::new();
        self.collect_tag(wanted, &mut found);
        found
    }

    fn collect_tag<'a>(&'a self, wanted: &str, found: &mut Vec<&'a ViewNode>) {
        if let ViewNode::Element { tag, children, .. } = self {
            if *tag == wanted {
                found.push(self);
            }
            for child in children {
                child.collect_tag(wanted, found);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Panel state
// ---------------------------------------------------------------------------

/// Which representation the panel body shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelView {
    #[default]
    Table,
    Yaml,
}

/// Click actions wired through [`ACTION_ATTR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    ShowTable,
    ShowYaml,
    ToggleCollapsed,
}

impl PanelAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PanelAction::ShowTable => "table",
            PanelAction::ShowYaml => "yaml",
            PanelAction::ToggleCollapsed => "toggle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "table" => Some(PanelAction::ShowTable),
            "yaml" => Some(PanelAction::ShowYaml),
            "toggle" => Some(PanelAction::ToggleCollapsed),
            _ => None,
        }
    }
}

/// Everything the panel displays, plus the UI state that survives re-renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub content: FrontMatter,
    pub view: PanelView,
    pub collapsed: bool,
}

impl PanelState {
    pub fn new(content: FrontMatter) -> Self {
        Self {
            content,
            view: PanelView::default(),
            collapsed: false,
        }
    }

    /// Swap in new content, keeping the selected view and collapsed flag.
    pub fn replace_content(&mut self, content: FrontMatter) {
        self.content = content;
    }

    pub fn apply(&mut self, action: PanelAction) {
        match action {
            PanelAction::ShowTable => self.view = PanelView::Table,
            PanelAction::ShowYaml => self.view = PanelView::Yaml,
            PanelAction::ToggleCollapsed => self.collapsed = !self.collapsed,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn action_button(label: &str, action: PanelAction, css: String) -> ViewNode {
    ViewNode::element("button")
        .attr("type", "button")
        .attr(ACTION_ATTR, action.as_str())
        .style(css)
        .child(ViewNode::text(label))
}

fn raw_block(raw: &str) -> ViewNode {
    ViewNode::element("pre")
        .style(style::PRE)
        .child(ViewNode::text(raw))
}

/// Render the whole panel.
pub fn render_panel(state: &PanelState) -> ViewNode {
    let mut toggles = ViewNode::element("div").style(style::TOGGLE_GROUP);
    if !state.collapsed {
        toggles = toggles
            .child(action_button(
                "Table",
                PanelAction::ShowTable,
                style::button(state.view == PanelView::Table),
            ))
            .child(action_button(
                "YAML",
                PanelAction::ShowYaml,
                style::button(state.view == PanelView::Yaml),
            ));
    }
    let chevron = action_button(
        "\u{25BC}",
        PanelAction::ToggleCollapsed,
        style::chevron(state.collapsed),
    )
    .attr("title", if state.collapsed { "Expand" } else { "Collapse" });
    toggles = toggles.child(chevron);

    let header = ViewNode::element("div")
        .style(style::HEADER)
        .child(
            ViewNode::element("span")
                .style(style::TITLE)
                .child(ViewNode::text("Front Matter")),
        )
        .child(toggles);

    let mut panel = ViewNode::element("div")
        .attr("class", "fmv-panel")
        .style(style::PANEL)
        .child(header);

    if !state.collapsed {
        let body = match (&state.view, &state.content.parsed) {
            (PanelView::Table, Some(map)) if !map.is_empty() => render_object(map),
            // Unparseable or empty blocks show their raw text in both views
            _ => raw_block(&state.content.raw),
        };
        panel = panel.child(ViewNode::element("div").style(style::BODY).child(body));
    }

    panel
}

fn badge(text: &str) -> ViewNode {
    ViewNode::element("span")
        .style(style::BADGE)
        .child(ViewNode::text(text))
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn primitive_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render any front matter value; collections become nested tables.
pub fn render_value(value: &Value) -> ViewNode {
    match value {
        Value::Null => badge("null"),
        Value::Bool(b) => badge(if *b { "true" } else { "false" }),
        Value::Number(n) => linkify(&n.to_string()),
        Value::String(s) => linkify(s),
        Value::Array(items) if items.is_empty() => badge("[]"),
        Value::Array(items) if items.iter().all(is_primitive) => {
            let joined: Vec<String> = items.iter().map(primitive_text).collect();
            linkify(&joined.join(", "))
        }
        Value::Array(items) => {
            let rows = items.iter().enumerate().map(|(i, item)| {
                ViewNode::element("tr")
                    .child(
                        ViewNode::element("th")
                            .style(style::TH_INDEX)
                            .child(ViewNode::text(i.to_string())),
                    )
                    .child(ViewNode::element("td").style(style::TD).child(render_value(item)))
            });
            table(rows)
        }
        Value::Object(map) => render_object(map),
    }
}

fn render_object(map: &Map<String, Value>) -> ViewNode {
    if map.is_empty() {
        return badge("{}");
    }
    let rows = map.iter().map(|(key, value)| {
        ViewNode::element("tr")
            .child(
                ViewNode::element("th")
                    .style(style::TH)
                    .child(ViewNode::text(key.as_str())),
            )
            .child(ViewNode::element("td").style(style::TD).child(render_value(value)))
    });
    table(rows)
}

fn table(rows: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::element("table")
        .style(style::TABLE)
        .child(ViewNode::element("tbody").children(rows))
}

/// Turn URLs inside `text` into links. Text without URLs stays a single text node.
pub fn linkify(text: &str) -> ViewNode {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in URL_RE.find_iter(text) {
        if m.start() > last {
            parts.push(ViewNode::text(&text[last..m.start()]));
        }
        parts.push(
            ViewNode::element("a")
                .attr("href", m.as_str())
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer")
                .style(style::LINK)
                .child(ViewNode::text(m.as_str())),
        );
        last = m.end();
    }
    if parts.is_empty() {
        return ViewNode::text(text);
    }
    if last < text.len() {
        parts.push(ViewNode::text(&text[last..]));
    }
    ViewNode::element("span").children(parts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
