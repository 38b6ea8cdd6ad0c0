//! The real DOM as a [`HostDocument`], and the panel's DOM renderer.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, Node};

use crate::config::Insertion;
use crate::front_matter::FrontMatter;
use crate::mount::{HostDocument, MountError};
use crate::panel::{render_panel, PanelAction, PanelState, ViewNode, ACTION_ATTR};

use super::js_error_message;

#[derive(Clone)]
pub struct WebDocument {
    document: Document,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl HostDocument for WebDocument {
    type Element = Element;
    type Root = WebRoot;

    fn query_selector(&self, selector: &str) -> Result<Option<Element>, MountError> {
        self.document
            .query_selector(selector)
            .map_err(|e| MountError::InvalidSelector {
                selector: selector.to_string(),
                reason: js_error_message(&e),
            })
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn create_container(&self, id: &str) -> Result<Element, MountError> {
        let container = self
            .document
            .create_element("div")
            .map_err(|e| MountError::CreateElement(js_error_message(&e)))?;
        container.set_id(id);
        Ok(container)
    }

    fn insert(&self, anchor: &Element, node: &Element, insertion: Insertion) -> Result<(), MountError> {
        let result = match insertion {
            Insertion::Append => anchor.append_with_node_1(node),
            Insertion::Prepend => anchor.prepend_with_node_1(node),
            Insertion::Before => anchor.before_with_node_1(node),
            Insertion::After => anchor.after_with_node_1(node),
        };
        result.map_err(|e| MountError::Insert(js_error_message(&e)))
    }

    fn set_style(&self, element: &Element, css: &str) -> Result<(), MountError> {
        element
            .set_attribute("style", css)
            .map_err(|e| MountError::Style(js_error_message(&e)))
    }

    fn detach(&self, element: &Element) {
        element.remove();
    }

    fn create_root(&self, container: &Element) -> Result<WebRoot, MountError> {
        WebRoot::new(self.document.clone(), container.clone())
    }

    fn render(&self, root: &mut WebRoot, content: &FrontMatter) -> Result<(), MountError> {
        root.render(content)
    }

    fn unmount(&self, root: WebRoot) {
        root.unmount();
    }
}

// ---------------------------------------------------------------------------
// Render root
// ---------------------------------------------------------------------------

struct RootInner {
    document: Document,
    container: Element,
    state: RefCell<Option<PanelState>>,
}

impl RootInner {
    fn redraw(&self) -> Result<(), MountError> {
        let tree = match self.state.borrow().as_ref() {
            Some(state) => render_panel(state),
            None => return Ok(()),
        };
        let node = materialize(&self.document, &tree)?;
        self.container.set_text_content(None);
        self.container
            .append_child(&node)
            .map_err(|e| MountError::Render(js_error_message(&e)))?;
        Ok(())
    }

    fn on_click(&self, event: &Event) {
        let Some(action) = clicked_action(event) else {
            return;
        };
        if let Some(state) = self.state.borrow_mut().as_mut() {
            state.apply(action);
        }
        if let Err(e) = self.redraw() {
            tracing::error!(error = %e, "failed to redraw panel");
        }
    }
}

/// The action of the nearest `[data-fmv-action]` element around the click target.
fn clicked_action(event: &Event) -> Option<PanelAction> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let actionable = target.closest(&format!("[{ACTION_ATTR}]")).ok()??;
    PanelAction::parse(&actionable.get_attribute(ACTION_ATTR)?)
}

/// Panel UI mounted in one container. Owns the panel state and a delegated
/// click listener on the container.
pub struct WebRoot {
    inner: Rc<RootInner>,
    on_click: Closure<dyn FnMut(Event)>,
}

impl WebRoot {
    fn new(document: Document, container: Element) -> Result<Self, MountError> {
        let inner = Rc::new(RootInner {
            document,
            container,
            state: RefCell::new(None),
        });

        let handler = Rc::clone(&inner);
        let on_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| handler.on_click(&event));
        inner
            .container
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(|e| MountError::Render(js_error_message(&e)))?;

        Ok(Self { inner, on_click })
    }

    fn render(&mut self, content: &FrontMatter) -> Result<(), MountError> {
        {
            let mut state = self.inner.state.borrow_mut();
            match state.as_mut() {
                // Keep the chosen view and collapsed state across pages
                Some(current) => current.replace_content(content.clone()),
                None => *state = Some(PanelState::new(content.clone())),
            }
        }
        self.inner.redraw()
    }

    fn unmount(self) {
        let container = &self.inner.container;
        if let Err(e) = container
            .remove_event_listener_with_callback("click", self.on_click.as_ref().unchecked_ref())
        {
            tracing::warn!(error = %js_error_message(&e), "failed to remove panel click listener");
        }
        container.set_text_content(None);
        self.inner.state.replace(None);
    }
}

/// Build DOM nodes for a view tree.
fn materialize(document: &Document, node: &ViewNode) -> Result<Node, MountError> {
    match node {
        ViewNode::Text(text) => Ok(document.create_text_node(text).into()),
        ViewNode::Element {
            tag,
            attrs,
            children,
        } => {
            let element = document
                .create_element(tag)
                .map_err(|e| MountError::CreateElement(js_error_message(&e)))?;
            for (name, value) in attrs {
                element
                    .set_attribute(name, value)
                    .map_err(|e| MountError::Render(js_error_message(&e)))?;
            }
            for child in children {
                let child = materialize(document, child)?;
                element
                    .append_child(&child)
                    .map_err(|e| MountError::Render(js_error_message(&e)))?;
            }
            Ok(element.into())
        }
    }
}
