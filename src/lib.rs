//! GROWI script plugin that shows a page's YAML front matter as a
//! collapsible sidebar panel with a table view and a raw YAML view.
//!
//! The browser-facing pieces live in `web` (wasm32 only); everything else
//! talks to the host through small traits so it can be tested natively.

pub mod config;
pub mod front_matter;
pub mod growi_api;
pub mod logging;
pub mod mount;
pub mod navigation;
pub mod page_context;
pub mod panel;
pub mod pipeline;
pub mod plugin;
pub mod spawn;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AnchorLocator, Insertion, PluginConfig};
pub use front_matter::{extract_front_matter, FrontMatter};
pub use growi_api::{ContentSource, GrowiApiClient};
pub use mount::{HostDocument, MountError, MountManager, MountOptions, Placement};
pub use navigation::{HandlerOutcome, NavigationSource, NavigationWatcher, Transition, WatchStrategy};
pub use page_context::{PageContext, PageMode};
pub use pipeline::{ApplyGate, ContentPipeline};
pub use plugin::FrontMatterViewer;
pub use spawn::Spawn;
