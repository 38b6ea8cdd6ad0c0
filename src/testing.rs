//! In-memory stand-ins for the browser, used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

use crate::config::Insertion;
use crate::front_matter::FrontMatter;
use crate::growi_api::ContentSource;
use crate::mount::{HostDocument, MountError};
use crate::navigation::{NavigateListener, NavigationSource};
use crate::spawn::Spawn;

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NavState {
    supported: bool,
    listening: Cell<bool>,
    current_url: RefCell<String>,
    /// Registered listeners keyed by the handle that added them.
    listeners: RefCell<Vec<(usize, NavigateListener)>>,
    add_calls: Cell<usize>,
    fail_add: Cell<bool>,
    next_handle: Cell<usize>,
}

/// Navigation API double. Clones share state, like two handles on
/// `window.navigation`, but each clone owns its own listener.
pub(crate) struct FakeNavigation {
    state: Rc<NavState>,
    handle: usize,
}

impl Clone for FakeNavigation {
    fn clone(&self) -> Self {
        let handle = self.state.next_handle.get() + 1;
        self.state.next_handle.set(handle);
        Self {
            state: Rc::clone(&self.state),
            handle,
        }
    }
}

impl FakeNavigation {
    pub(crate) fn supported(current_url: &str) -> Self {
        Self::build(true, current_url)
    }

    pub(crate) fn unsupported(current_url: &str) -> Self {
        Self::build(false, current_url)
    }

    fn build(supported: bool, current_url: &str) -> Self {
        Self {
            state: Rc::new(NavState {
                supported,
                current_url: RefCell::new(current_url.to_string()),
                ..NavState::default()
            }),
            handle: 0,
        }
    }

    /// Simulate an SPA navigation to `url`.
    pub(crate) fn navigate(&self, url: &str) {
        self.state.current_url.replace(url.to_string());
        let listeners: Vec<NavigateListener> = self
            .state
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(url);
        }
    }

    pub(crate) fn has_listener(&self) -> bool {
        !self.state.listeners.borrow().is_empty()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    pub(crate) fn add_listener_calls(&self) -> usize {
        self.state.add_calls.get()
    }

    /// Make subsequent `add_listener` calls fail, like a throwing
    /// `addEventListener`.
    pub(crate) fn fail_add_listener(&self, fail: bool) {
        self.state.fail_add.set(fail);
    }
}

impl NavigationSource for FakeNavigation {
    fn is_supported(&self) -> bool {
        self.state.supported
    }

    fn is_listening(&self) -> bool {
        self.state.listening.get()
    }

    fn set_listening(&self, listening: bool) {
        self.state.listening.set(listening);
    }

    fn add_listener(&self, listener: NavigateListener) -> Result<(), String> {
        self.state.add_calls.set(self.state.add_calls.get() + 1);
        if self.state.fail_add.get() {
            return Err("addEventListener threw".to_string());
        }
        let mut listeners = self.state.listeners.borrow_mut();
        listeners.retain(|(handle, _)| *handle != self.handle);
        listeners.push((self.handle, listener));
        Ok(())
    }

    fn remove_listener(&self) {
        self.state
            .listeners
            .borrow_mut()
            .retain(|(handle, _)| *handle != self.handle);
    }

    fn current_url(&self) -> Option<String> {
        Some(self.state.current_url.borrow().clone())
    }
}

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

/// Collects spawned tasks so a test decides when (and in which order) they run.
#[derive(Default)]
pub(crate) struct QueueSpawner {
    queue: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl QueueSpawner {
    pub(crate) fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn take_all(&self) -> Vec<LocalBoxFuture<'static, ()>> {
        self.queue.take()
    }

    /// Run queued tasks in spawn order until the queue stays empty.
    pub(crate) async fn run_all(&self) {
        loop {
            let tasks = self.take_all();
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                task.await;
            }
        }
    }
}

impl Spawn for QueueSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.queue.borrow_mut().push(task);
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Serves page bodies from a map and records every request.
#[derive(Default)]
pub(crate) struct StubContent {
    bodies: RefCell<HashMap<(String, Option<String>), String>>,
    requests: RefCell<Vec<(String, Option<String>)>>,
}

impl StubContent {
    pub(crate) fn with_page(self, page_id: &str, body: &str) -> Self {
        self.bodies
            .borrow_mut()
            .insert((page_id.to_string(), None), body.to_string());
        self
    }

    pub(crate) fn with_revision(self, page_id: &str, revision_id: &str, body: &str) -> Self {
        self.bodies.borrow_mut().insert(
            (page_id.to_string(), Some(revision_id.to_string())),
            body.to_string(),
        );
        self
    }

    pub(crate) fn set_page(&self, page_id: &str, body: &str) {
        self.bodies
            .borrow_mut()
            .insert((page_id.to_string(), None), body.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.borrow().clone()
    }
}

impl ContentSource for StubContent {
    async fn fetch_page_body(&self, page_id: &str, revision_id: Option<&str>) -> Option<String> {
        let key = (page_id.to_string(), revision_id.map(str::to_string));
        self.requests.borrow_mut().push(key.clone());
        self.bodies.borrow().get(&key).cloned()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FakeElement(usize);

#[derive(Default)]
struct FakeNode {
    id: Option<String>,
    selector: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
    style: Option<String>,
    rendered: Option<FrontMatter>,
}

pub(crate) struct FakeRoot {
    node: usize,
    serial: usize,
}

#[derive(Default)]
struct DomState {
    nodes: Vec<FakeNode>,
    rejected_selectors: Vec<String>,
    fail_create_root: bool,
    roots_created: usize,
    live_roots: Vec<usize>,
    insert_calls: usize,
}

impl DomState {
    /// Attached nodes in document (pre-)order.
    fn walk(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![BODY];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev());
        }
        order
    }

    fn unlink(&mut self, index: usize) {
        if let Some(parent) = self.nodes[index].parent.take() {
            self.nodes[parent].children.retain(|c| *c != index);
        }
    }
}

const BODY: usize = 0;

/// Tiny DOM: a `<body>`, anchors matched by exact selector string, and
/// containers looked up by id.
#[derive(Clone)]
pub(crate) struct FakeDocument {
    state: Rc<RefCell<DomState>>,
}

impl FakeDocument {
    pub(crate) fn new() -> Self {
        let state = DomState {
            nodes: vec![FakeNode::default()],
            ..DomState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Append an element matching `selector` to `<body>`.
    pub(crate) fn add_anchor(&self, selector: &str) -> FakeElement {
        let mut dom = self.state.borrow_mut();
        let index = dom.nodes.len();
        dom.nodes.push(FakeNode {
            selector: Some(selector.to_string()),
            parent: Some(BODY),
            ..FakeNode::default()
        });
        dom.nodes[BODY].children.push(index);
        FakeElement(index)
    }

    pub(crate) fn reject_selector(&self, selector: &str) {
        self.state
            .borrow_mut()
            .rejected_selectors
            .push(selector.to_string());
    }

    pub(crate) fn fail_create_root(&self, fail: bool) {
        self.state.borrow_mut().fail_create_root = fail;
    }

    /// Detach `element` (and everything in it), as a host re-render would.
    pub(crate) fn remove_subtree(&self, element: FakeElement) {
        self.state.borrow_mut().unlink(element.0);
    }

    pub(crate) fn count_by_id(&self, id: &str) -> usize {
        let dom = self.state.borrow();
        dom.walk()
            .into_iter()
            .filter(|i| dom.nodes[*i].id.as_deref() == Some(id))
            .count()
    }

    pub(crate) fn parent_of(&self, element: FakeElement) -> Option<FakeElement> {
        self.state.borrow().nodes[element.0].parent.map(FakeElement)
    }

    pub(crate) fn children_of(&self, element: FakeElement) -> Vec<FakeElement> {
        self.state.borrow().nodes[element.0]
            .children
            .iter()
            .copied()
            .map(FakeElement)
            .collect()
    }

    pub(crate) fn style_of(&self, element: FakeElement) -> Option<String> {
        self.state.borrow().nodes[element.0].style.clone()
    }

    pub(crate) fn rendered_in(&self, element: FakeElement) -> Option<FrontMatter> {
        self.state.borrow().nodes[element.0].rendered.clone()
    }

    /// Content currently displayed by the mounted container, if any.
    pub(crate) fn displayed(&self, container_id: &str) -> Option<FrontMatter> {
        let element = self.element_by_id(container_id)?;
        self.rendered_in(element)
    }

    pub(crate) fn roots_created(&self) -> usize {
        self.state.borrow().roots_created
    }

    pub(crate) fn live_roots(&self) -> usize {
        self.state.borrow().live_roots.len()
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.state.borrow().insert_calls
    }
}

impl HostDocument for FakeDocument {
    type Element = FakeElement;
    type Root = FakeRoot;

    fn query_selector(&self, selector: &str) -> Result<Option<FakeElement>, MountError> {
        let dom = self.state.borrow();
        if dom.rejected_selectors.iter().any(|s| s == selector) {
            return Err(MountError::InvalidSelector {
                selector: selector.to_string(),
                reason: "SyntaxError".to_string(),
            });
        }
        Ok(dom
            .walk()
            .into_iter()
            .find(|i| dom.nodes[*i].selector.as_deref() == Some(selector))
            .map(FakeElement))
    }

    fn element_by_id(&self, id: &str) -> Option<FakeElement> {
        let dom = self.state.borrow();
        dom.walk()
            .into_iter()
            .find(|i| dom.nodes[*i].id.as_deref() == Some(id))
            .map(FakeElement)
    }

    fn body(&self) -> Option<FakeElement> {
        Some(FakeElement(BODY))
    }

    fn create_container(&self, id: &str) -> Result<FakeElement, MountError> {
        let mut dom = self.state.borrow_mut();
        let index = dom.nodes.len();
        dom.nodes.push(FakeNode {
            id: Some(id.to_string()),
            ..FakeNode::default()
        });
        Ok(FakeElement(index))
    }

    fn insert(
        &self,
        anchor: &FakeElement,
        node: &FakeElement,
        insertion: Insertion,
    ) -> Result<(), MountError> {
        let mut dom = self.state.borrow_mut();
        dom.insert_calls += 1;
        dom.unlink(node.0);
        let (parent, position) = match insertion {
            Insertion::Append => (anchor.0, dom.nodes[anchor.0].children.len()),
            Insertion::Prepend => (anchor.0, 0),
            Insertion::Before | Insertion::After => {
                let parent = dom.nodes[anchor.0]
                    .parent
                    .ok_or_else(|| MountError::Insert("anchor has no parent".into()))?;
                let at = dom.nodes[parent]
                    .children
                    .iter()
                    .position(|c| *c == anchor.0)
                    .ok_or_else(|| MountError::Insert("anchor not among siblings".into()))?;
                let offset = if insertion == Insertion::After { 1 } else { 0 };
                (parent, at + offset)
            }
        };
        dom.nodes[parent].children.insert(position, node.0);
        dom.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    fn set_style(&self, element: &FakeElement, css: &str) -> Result<(), MountError> {
        self.state.borrow_mut().nodes[element.0].style = Some(css.to_string());
        Ok(())
    }

    fn detach(&self, element: &FakeElement) {
        self.state.borrow_mut().unlink(element.0);
    }

    fn create_root(&self, container: &FakeElement) -> Result<FakeRoot, MountError> {
        let mut dom = self.state.borrow_mut();
        if dom.fail_create_root {
            return Err(MountError::Render("root creation refused".into()));
        }
        dom.roots_created += 1;
        let serial = dom.roots_created;
        dom.live_roots.push(serial);
        Ok(FakeRoot {
            node: container.0,
            serial,
        })
    }

    fn render(&self, root: &mut FakeRoot, content: &FrontMatter) -> Result<(), MountError> {
        let mut dom = self.state.borrow_mut();
        if !dom.live_roots.contains(&root.serial) {
            return Err(MountError::Render("render on unmounted root".into()));
        }
        dom.nodes[root.node].rendered = Some(content.clone());
        Ok(())
    }

    fn unmount(&self, root: FakeRoot) {
        let mut dom = self.state.borrow_mut();
        dom.live_roots.retain(|serial| *serial != root.serial);
        dom.nodes[root.node].rendered = None;
    }
}
