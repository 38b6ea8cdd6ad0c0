//! The plugin object GROWI activates and deactivates.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::PluginConfig;
use crate::growi_api::ContentSource;
use crate::mount::{HostDocument, MountManager, MountOptions};
use crate::navigation::{
    NavigationSource, NavigationWatcher, Transition, TransitionHandler, WatchStrategy,
};
use crate::pipeline::ContentPipeline;
use crate::spawn::Spawn;

/// Navigation watcher, content pipeline and mount manager, wired together.
pub struct FrontMatterViewer<N, S, D>
where
    N: NavigationSource + 'static,
    D: HostDocument,
{
    name: String,
    watcher: NavigationWatcher<N>,
    pipeline: ContentPipeline<S, D>,
    mount: Rc<RefCell<MountManager<D>>>,
}

impl<N, S, D> FrontMatterViewer<N, S, D>
where
    N: NavigationSource + 'static,
    S: ContentSource + 'static,
    D: HostDocument + 'static,
{
    pub fn new(
        config: &PluginConfig,
        navigation: N,
        content: S,
        document: D,
        spawner: Rc<dyn Spawn>,
    ) -> Self {
        let mount = Rc::new(RefCell::new(MountManager::new(
            document,
            MountOptions::from(config),
        )));
        let pipeline = ContentPipeline::new(Rc::new(content), Rc::clone(&mount));

        let on_transition = pipeline.clone();
        let handler: TransitionHandler =
            Rc::new(move |transition: Transition| on_transition.on_transition(transition));
        let watcher = NavigationWatcher::new(navigation, handler, spawner);

        Self {
            name: config.plugin_name.clone(),
            watcher,
            pipeline,
            mount,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> WatchStrategy {
        self.watcher.strategy()
    }

    /// Start reacting to page transitions, beginning with the current page.
    pub fn activate(&self) {
        tracing::info!(plugin = %self.name, "activating front matter viewer");
        self.watcher.start();
    }

    /// Stop watching and remove the panel. Fetches still in flight are
    /// discarded when they complete.
    pub fn deactivate(&self) {
        tracing::info!(plugin = %self.name, "deactivating front matter viewer");
        self.watcher.stop();
        self.pipeline.retire(self.watcher.last_sequence());
    }

    pub fn is_panel_mounted(&self) -> bool {
        self.mount.borrow().is_mounted()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
