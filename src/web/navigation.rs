//! `window.navigation` (Navigation API) as a [`NavigationSource`].

use std::cell::RefCell;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use web_sys::{EventTarget, Window};

use crate::navigation::{NavigateListener, NavigationSource};

use super::js_error_message;

/// Property set on the navigation object while a watcher is registered.
const LISTENING_FLAG: &str = "__growiFrontMatterViewerListening";

pub struct WebNavigation {
    window: Window,
    /// `window.navigation`, when the browser has it
    navigation: Option<EventTarget>,
    listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
}

impl WebNavigation {
    pub fn new(window: Window) -> Self {
        let navigation = Reflect::get(&window, &JsValue::from_str("navigation"))
            .ok()
            .filter(|value| value.is_object())
            .and_then(|value| value.dyn_into::<EventTarget>().ok());
        Self {
            window,
            navigation,
            listener: RefCell::new(None),
        }
    }
}

/// `event.destination.url` of a `navigate` event.
fn destination_url(event: &JsValue) -> Option<String> {
    let destination = Reflect::get(event, &JsValue::from_str("destination")).ok()?;
    Reflect::get(&destination, &JsValue::from_str("url"))
        .ok()?
        .as_string()
}

impl NavigationSource for WebNavigation {
    fn is_supported(&self) -> bool {
        self.navigation.is_some()
    }

    fn is_listening(&self) -> bool {
        self.navigation.as_ref().is_some_and(|navigation| {
            Reflect::get(navigation, &JsValue::from_str(LISTENING_FLAG))
                .ok()
                .and_then(|flag| flag.as_bool())
                .unwrap_or(false)
        })
    }

    fn set_listening(&self, listening: bool) {
        let Some(navigation) = &self.navigation else {
            return;
        };
        if let Err(e) = Reflect::set(
            navigation,
            &JsValue::from_str(LISTENING_FLAG),
            &JsValue::from_bool(listening),
        ) {
            tracing::warn!(error = %js_error_message(&e), "failed to set navigation listening flag");
        }
    }

    fn add_listener(&self, listener: NavigateListener) -> Result<(), String> {
        let Some(navigation) = &self.navigation else {
            return Err("window.navigation is not available".to_string());
        };
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            match destination_url(&event) {
                Some(url) => listener(&url),
                None => tracing::trace!("navigate event without destination url"),
            }
        });
        navigation
            .add_event_listener_with_callback("navigate", callback.as_ref().unchecked_ref())
            .map_err(|e| js_error_message(&e))?;
        // Replacing a previous closure is fine: start() never registers twice
        self.listener.replace(Some(callback));
        Ok(())
    }

    fn remove_listener(&self) {
        let Some(callback) = self.listener.take() else {
            return;
        };
        if let Some(navigation) = &self.navigation {
            if let Err(e) = navigation
                .remove_event_listener_with_callback("navigate", callback.as_ref().unchecked_ref())
            {
                tracing::warn!(error = %js_error_message(&e), "failed to remove navigate listener");
            }
        }
    }

    fn current_url(&self) -> Option<String> {
        self.window.location().href().ok()
    }
}
