//! Completion celebration: asset loading and playback gating
//!
//! The celebration is an optional capability, not a dependency: the runtime
//! fetches a JSON animation descriptor when the terminal step becomes
//! current, and an injected [`CelebrationRenderer`] plays it. A missing URL,
//! a failed fetch, or a missing renderer all degrade to immediate
//! completion with no visual celebration.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tour_core::TourError;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, Response};

/// How long the celebration is allowed to play before the tour completes
/// regardless
pub const CELEBRATION_DURATION_MS: i32 = 4000;

const FETCH_TIMEOUT_MS: i32 = 10_000;

/// Strategy for playing a loaded animation descriptor.
///
/// The completion signal is time-based: the runtime completes the tour after
/// [`CELEBRATION_DURATION_MS`] whether or not the renderer is still playing.
pub trait CelebrationRenderer {
    fn play(&self, data: &JsValue) -> Result<(), JsValue>;
}

/// Renderer backed by a JavaScript function injected by the embedder
pub struct JsCelebrationRenderer {
    play_fn: js_sys::Function,
}

impl JsCelebrationRenderer {
    pub fn new(play_fn: js_sys::Function) -> Self {
        Self { play_fn }
    }
}

impl CelebrationRenderer for JsCelebrationRenderer {
    fn play(&self, data: &JsValue) -> Result<(), JsValue> {
        self.play_fn.call1(&JsValue::NULL, data).map(|_| ())
    }
}

/// Celebration state owned by the tour runtime
pub(crate) struct Celebration {
    url: Option<String>,
    renderer: Option<Rc<dyn CelebrationRenderer>>,
    data: Rc<RefCell<Option<JsValue>>>,
    loading: Rc<Cell<bool>>,
}

impl Celebration {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            renderer: None,
            data: Rc::new(RefCell::new(None)),
            loading: Rc::new(Cell::new(false)),
        }
    }

    pub fn set_renderer(&mut self, renderer: Rc<dyn CelebrationRenderer>) {
        self.renderer = Some(renderer);
    }

    /// Use an already-loaded animation descriptor instead of fetching one.
    pub fn preload(&self, descriptor: JsValue) {
        *self.data.borrow_mut() = Some(descriptor);
    }

    /// Start fetching the descriptor if it is not already loaded or in
    /// flight. A result arriving after `current_generation` has moved past
    /// `generation` (the user navigated away) is dropped.
    pub fn prefetch(&self, generation: u64, current_generation: Rc<Cell<u64>>) {
        let Some(url) = self.url.clone() else {
            return;
        };
        if self.loading.get() || self.data.borrow().is_some() {
            return;
        }
        self.loading.set(true);

        let data = Rc::clone(&self.data);
        let loading = Rc::clone(&self.loading);
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_json(&url).await;
            loading.set(false);
            if current_generation.get() != generation {
                log::debug!("celebration asset arrived after navigation; ignoring");
                return;
            }
            match result {
                Ok(json) => {
                    *data.borrow_mut() = Some(json);
                }
                Err(err) => {
                    let err = TourError::AssetLoad {
                        message: format!("{err:?}"),
                    };
                    log::error!("{err}");
                }
            }
        });
    }

    /// The renderer and loaded descriptor, when both are available.
    ///
    /// Returned as owned handles so the caller can release its borrow of the
    /// runtime before handing control to embedder code.
    pub fn playback_parts(&self) -> Option<(Rc<dyn CelebrationRenderer>, JsValue)> {
        let renderer = self.renderer.clone()?;
        let data = self.data.borrow().clone()?;
        Some((renderer, data))
    }
}

/// Fetch a JSON document with an abort-on-timeout guard.
async fn fetch_json(url: &str) -> Result<JsValue, JsValue> {
    let opts = RequestInit::new();
    opts.set_method("GET");

    let abort_controller = AbortController::new()?;
    opts.set_signal(Some(&abort_controller.signal()));

    let request = Request::new_with_str_and_init(url, &opts)?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;

    let timeout_promise = js_sys::Promise::new(&mut |_, reject| {
        let abort_controller = abort_controller.clone();
        let timeout_closure = Closure::once(Box::new(move || {
            abort_controller.abort();
            let _ = reject.call1(&JsValue::null(), &JsValue::from_str("Request timeout"));
        }) as Box<dyn FnOnce()>);

        if window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                timeout_closure.as_ref().unchecked_ref(),
                FETCH_TIMEOUT_MS,
            )
            .is_ok()
        {
            timeout_closure.forget();
        }
    });

    let fetch_promise = window.fetch_with_request(&request);
    let result = js_sys::Promise::race(&js_sys::Array::of2(&fetch_promise, &timeout_promise));

    let resp_value = JsFuture::from(result).await?;
    let resp: Response = resp_value.dyn_into()?;

    if !resp.ok() {
        return Err(JsValue::from_str(&format!(
            "HTTP error! status: {}",
            resp.status()
        )));
    }

    let json = JsFuture::from(resp.json()?).await?;
    if !json.is_object() {
        return Err(JsValue::from_str("animation descriptor is not an object"));
    }
    Ok(json)
}
