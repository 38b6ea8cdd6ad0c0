//! Browser bindings and GROWI plugin registration (wasm32 only).
//!
//! GROWI loads script plugins and calls `window.pluginActivators[name]
//! .activate()` / `.deactivate()`. The wasm start function builds the viewer
//! over the real browser APIs and publishes that pair.

mod document;
mod navigation;

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use js_sys::{Object, Reflect, JSON};
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::config::PluginConfig;
use crate::growi_api::GrowiApiClient;
use crate::logging;
use crate::plugin::FrontMatterViewer;
use crate::spawn::Spawn;

pub use document::{WebDocument, WebRoot};
pub use navigation::WebNavigation;

/// Global an embedding page may set to override the defaults.
const CONFIG_GLOBAL: &str = "frontMatterViewerConfig";
const ACTIVATORS_GLOBAL: &str = "pluginActivators";

/// Best-effort message of a thrown JS value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Runs futures on the browser's microtask queue.
pub struct WebSpawner;

impl Spawn for WebSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = register() {
        web_sys::console::error_1(&JsValue::from_str(&format!(
            "front matter viewer failed to register: {}",
            js_error_message(&e)
        )));
    }
}

/// The config override as JSON text: strings are taken as is, objects are
/// serialized.
fn read_config_override(window: &Window) -> Option<String> {
    let value = Reflect::get(window, &JsValue::from_str(CONFIG_GLOBAL)).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(json) = value.as_string() {
        return Some(json);
    }
    JSON::stringify(&value).ok().map(String::from)
}

/// `window.pluginActivators`, created when missing.
fn activators(window: &Window) -> Result<JsValue, JsValue> {
    let key = JsValue::from_str(ACTIVATORS_GLOBAL);
    let existing = Reflect::get(window, &key)?;
    if existing.is_object() {
        return Ok(existing);
    }
    let created: JsValue = Object::new().into();
    Reflect::set(window, &key, &created)?;
    Ok(created)
}

fn register() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    let (config, warnings) = PluginConfig::load(read_config_override(&window).as_deref());
    logging::init_logging(&config.log_filter);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let base_url = match &config.api_base_url {
        Some(url) => url.clone(),
        None => window.location().origin()?,
    };
    let content = GrowiApiClient::new(&base_url).map_err(|e| JsValue::from_str(&e))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let viewer = Rc::new(FrontMatterViewer::new(
        &config,
        WebNavigation::new(window.clone()),
        content,
        WebDocument::new(document),
        Rc::new(WebSpawner),
    ));

    let on_activate = Rc::clone(&viewer);
    let activate = Closure::<dyn Fn()>::new(move || on_activate.activate());
    let on_deactivate = Rc::clone(&viewer);
    let deactivate = Closure::<dyn Fn()>::new(move || on_deactivate.deactivate());

    let entry = Object::new();
    Reflect::set(&entry, &JsValue::from_str("activate"), activate.as_ref())?;
    Reflect::set(&entry, &JsValue::from_str("deactivate"), deactivate.as_ref())?;
    Reflect::set(
        &activators(&window)?,
        &JsValue::from_str(&config.plugin_name),
        &entry,
    )?;

    // Registered for the lifetime of the page
    activate.forget();
    deactivate.forget();

    tracing::info!(
        plugin = %config.plugin_name,
        api = %base_url,
        strategy = ?viewer.strategy(),
        "front matter viewer registered"
    );
    Ok(())
}
