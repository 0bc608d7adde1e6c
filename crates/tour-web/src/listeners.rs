//! RAII wrappers for DOM event listeners and one-shot timers
//!
//! Resize/scroll subscriptions and retry timers are scoped to "a step is
//! currently displayed". Wrapping them in guards that detach on drop makes
//! the teardown happen exactly once per attach, whichever path deactivates
//! the step.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// A DOM event subscription that is removed when the guard is dropped
pub struct ListenerGuard {
    target: web_sys::EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut()>,
}

impl ListenerGuard {
    pub fn new(
        target: web_sys::EventTarget,
        event: &'static str,
        callback: impl FnMut() + 'static,
    ) -> Result<Self, JsValue> {
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        Ok(Self {
            target,
            event,
            closure,
        })
    }

    /// Subscribe to a window-level event (`resize`, `scroll`, ...)
    pub fn on_window(event: &'static str, callback: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        Self::new(window.into(), event, callback)
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

/// A `setTimeout` that is cleared when the guard is dropped.
///
/// Dropping after the callback fired clears a stale handle, which the
/// browser ignores.
pub struct OneShotTimer {
    handle: i32,
    _closure: Closure<dyn FnMut()>,
}

impl OneShotTimer {
    pub fn new(delay_ms: i32, callback: impl FnOnce() + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let closure = Closure::once(callback);
        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms,
        )?;
        Ok(Self {
            handle,
            _closure: closure,
        })
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}
