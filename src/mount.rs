//! Mounting the panel into GROWI's sidebar.
//!
//! GROWI's DOM differs between versions and settings, so the sidebar is found
//! by trying an ordered list of locators (see [`crate::config`]). When none
//! match, the panel floats in the bottom-right corner instead. Finding no
//! sidebar is an expected outcome, not an error.
//!
//! At most one panel exists at a time. A container carrying the reserved id
//! is reused in place on every `show`, so repeated updates never move or
//! re-insert it.

use thiserror::Error;

use crate::config::{AnchorLocator, Insertion};
use crate::front_matter::FrontMatter;

#[derive(Debug, Error)]
pub enum MountError {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("document has no <body>")]
    NoBody,
    #[error("failed to create panel container: {0}")]
    CreateElement(String),
    #[error("failed to insert panel container: {0}")]
    Insert(String),
    #[error("failed to style panel container: {0}")]
    Style(String),
    #[error("failed to render panel: {0}")]
    Render(String),
}

// ---------------------------------------------------------------------------
// Document seam
// ---------------------------------------------------------------------------

/// The parts of the host document the mount manager needs.
///
/// `Root` is the render root: the object that owns the panel's UI state and
/// event wiring inside one container.
pub trait HostDocument {
    type Element: Clone + PartialEq;
    type Root;

    /// First element matching `selector`. An unparseable selector is an error.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>, MountError>;
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;
    fn body(&self) -> Option<Self::Element>;

    /// Create a detached container element carrying `id`.
    fn create_container(&self, id: &str) -> Result<Self::Element, MountError>;
    fn insert(
        &self,
        anchor: &Self::Element,
        node: &Self::Element,
        insertion: Insertion,
    ) -> Result<(), MountError>;
    fn set_style(&self, element: &Self::Element, css: &str) -> Result<(), MountError>;
    /// Remove `element` from its parent. No-op when already detached.
    fn detach(&self, element: &Self::Element);

    fn create_root(&self, container: &Self::Element) -> Result<Self::Root, MountError>;
    /// Replace whatever `root` displays with `content`.
    fn render(&self, root: &mut Self::Root, content: &FrontMatter) -> Result<(), MountError>;
    fn unmount(&self, root: Self::Root);
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Where a new container goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement<E> {
    Anchored {
        anchor: E,
        insertion: Insertion,
        selector: String,
    },
    /// Fixed-position container appended to `<body>`
    Fallback,
}

#[derive(Debug, Clone)]
pub struct MountOptions {
    pub container_id: String,
    pub anchors: Vec<AnchorLocator>,
    pub fallback_style: String,
}

impl From<&crate::config::PluginConfig> for MountOptions {
    fn from(config: &crate::config::PluginConfig) -> Self {
        Self {
            container_id: config.container_id.clone(),
            anchors: config.anchors.clone(),
            fallback_style: config.fallback_style.clone(),
        }
    }
}

/// Container and render root, always recorded together.
struct Mounted<D: HostDocument> {
    container: D::Element,
    root: D::Root,
}

// ---------------------------------------------------------------------------
// Mount manager
// ---------------------------------------------------------------------------

/// Owns the single panel instance in the host document.
pub struct MountManager<D: HostDocument> {
    document: D,
    options: MountOptions,
    mounted: Option<Mounted<D>>,
}

impl<D: HostDocument> MountManager<D> {
    pub fn new(document: D, options: MountOptions) -> Self {
        Self {
            document,
            options,
            mounted: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Try each locator in order; first match wins.
    pub fn resolve_placement(&self) -> Placement<D::Element> {
        for locator in &self.options.anchors {
            match self.document.query_selector(&locator.selector) {
                Ok(Some(anchor)) => {
                    tracing::debug!(selector = %locator.selector, "sidebar anchor found");
                    return Placement::Anchored {
                        anchor,
                        insertion: locator.insertion,
                        selector: locator.selector.clone(),
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "skipping anchor locator");
                }
            }
        }
        tracing::debug!("no sidebar anchor matched; using floating fallback");
        Placement::Fallback
    }

    /// Reuse the container with the reserved id, or create and place a new one.
    fn ensure_container(&self) -> Result<D::Element, MountError> {
        let id = &self.options.container_id;
        if let Some(existing) = self.document.element_by_id(id) {
            return Ok(existing);
        }

        let container = self.document.create_container(id)?;
        match self.resolve_placement() {
            Placement::Anchored {
                anchor, insertion, ..
            } => self.document.insert(&anchor, &container, insertion)?,
            Placement::Fallback => {
                let body = self.document.body().ok_or(MountError::NoBody)?;
                self.document
                    .set_style(&container, &self.options.fallback_style)?;
                self.document.insert(&body, &container, Insertion::Append)?;
            }
        }
        Ok(container)
    }

    fn mount_root(&self, container: D::Element) -> Result<Mounted<D>, MountError> {
        match self.document.create_root(&container) {
            Ok(root) => Ok(Mounted { container, root }),
            Err(e) => {
                // Don't leave an unowned container behind
                self.document.detach(&container);
                Err(e)
            }
        }
    }

    /// Show `content`, mounting the panel first if needed.
    ///
    /// Safe to call repeatedly: each call replaces what is displayed.
    pub fn show(&mut self, content: &FrontMatter) -> Result<(), MountError> {
        let container = self.ensure_container()?;

        let mounted = match self.mounted.take() {
            Some(current) if current.container == container => current,
            Some(stale) => {
                // The host re-rendered and dropped our container
                tracing::debug!("panel container was replaced; remounting");
                self.document.unmount(stale.root);
                self.document.detach(&stale.container);
                self.mount_root(container)?
            }
            None => self.mount_root(container)?,
        };

        let mounted = self.mounted.insert(mounted);
        self.document.render(&mut mounted.root, content)
    }

    /// Unmount and remove the panel. No-op when nothing is mounted.
    pub fn hide(&mut self) {
        if let Some(Mounted { container, root }) = self.mounted.take() {
            self.document.unmount(root);
            self.document.detach(&container);
            tracing::debug!("panel unmounted");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
