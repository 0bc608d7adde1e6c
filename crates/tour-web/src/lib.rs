//! WASM bridge for the guided tour
//!
//! Exposes the [`Tour`] provider to JavaScript and wires the core state
//! machine to the browser: target resolution with a bounded retry,
//! resize/scroll re-measurement, the DOM overlay, localStorage-backed
//! completion records, and the optional completion celebration.
//!
//! One `Tour` instance serves one tour at a time; concurrent tours use
//! separate instances. All shared state lives behind a single
//! `Rc<RefCell<TourRuntime>>`; DOM callbacks hold weak references so a
//! dropped provider tears everything down.

pub mod celebration;
pub mod listeners;
pub mod overlay;
pub mod resolver;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use celebration::{Celebration, CelebrationRenderer, JsCelebrationRenderer, CELEBRATION_DURATION_MS};
use listeners::{ListenerGuard, OneShotTimer};
use overlay::{OverlayFrame, OverlayRenderer, Theme};
use tour_core::{ElementRect, StepAction, TourController, TourError, TourStep};
use tour_storage::LocalCompletionStore;

/// Delay before a first-visit auto-start, so the host page can finish
/// rendering
const AUTO_START_DELAY_MS: i32 = 1000;

/// Provider configuration supplied by the embedder
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourOptions {
    /// URL of a JSON animation descriptor played on completion
    pub celebration_url: Option<String>,
    pub theme: Theme,
}

/// How a tour ended, for dispatching the matching embedder callback
#[derive(Clone, Copy)]
enum TourEnd {
    Completed,
    Skipped,
}

struct TourRuntime {
    controller: TourController,
    store: LocalCompletionStore,
    overlay: OverlayRenderer,
    celebration: Celebration,
    /// JS step actions registered before the tour starts, keyed by step id
    actions: HashMap<String, js_sys::Function>,
    on_complete: Option<js_sys::Function>,
    on_skip: Option<js_sys::Function>,
    /// Set by the state machine's hooks; drained (and the matching callback
    /// invoked) once the runtime borrow has been released
    pending_end: Rc<Cell<Option<TourEnd>>>,
    /// Step id recorded by the step's `on_enter`; the registered JS action
    /// runs once the runtime borrow has been released
    pending_action: Rc<Cell<Option<String>>>,
    /// Last resolved target rect (document coordinates) for the active step
    active_rect: Option<ElementRect>,
    listeners: Vec<ListenerGuard>,
    settle_timer: Option<OneShotTimer>,
    retry_timer: Option<OneShotTimer>,
    celebration_timer: Option<OneShotTimer>,
    auto_start_timer: Option<OneShotTimer>,
    retry_pending: bool,
    /// Bumped on every step change or deactivation; deferred callbacks
    /// compare against it and drop themselves when stale
    generation: Rc<Cell<u64>>,
}

impl Drop for TourRuntime {
    fn drop(&mut self) {
        self.overlay.unmount();
    }
}

/// Weak handle the overlay's controls dispatch through
#[derive(Clone)]
pub(crate) struct TourHandle {
    runtime: Weak<RefCell<TourRuntime>>,
}

impl TourHandle {
    fn upgrade(&self) -> Option<Rc<RefCell<TourRuntime>>> {
        self.runtime.upgrade()
    }

    pub fn next(&self) {
        if let Some(rt) = self.upgrade() {
            rt.borrow_mut().controller.next_step();
            refresh(&rt);
        }
    }

    pub fn previous(&self) {
        if let Some(rt) = self.upgrade() {
            rt.borrow_mut().controller.previous_step();
            refresh(&rt);
        }
    }

    pub fn skip(&self) {
        if let Some(rt) = self.upgrade() {
            rt.borrow_mut().controller.skip_tour();
            refresh(&rt);
        }
    }

    pub fn complete_requested(&self) {
        if let Some(rt) = self.upgrade() {
            complete_requested(&rt);
        }
    }
}

/// Tear down per-step resources and re-render for the current state.
///
/// Called after every transition. Bumping the generation invalidates any
/// retry timer, settle timer, or in-flight celebration fetch from the
/// previous step.
fn refresh(rt: &Rc<RefCell<TourRuntime>>) {
    let show = {
        let mut guard = rt.borrow_mut();
        guard.generation.set(guard.generation.get() + 1);
        guard.retry_timer = None;
        guard.settle_timer = None;
        guard.retry_pending = false;
        guard.active_rect = None;
        guard.listeners.clear();

        if !guard.controller.is_active() {
            guard.celebration_timer = None;
            guard.overlay.unmount();
            false
        } else if guard
            .controller
            .current_step()
            .map_or(true, |step| step.target.trim().is_empty())
        {
            if let Some(step) = guard.controller.current_step() {
                let step_id = step.id.clone();
                log::error!("tour step '{step_id}' has no target selector; nothing to render");
            }
            guard.overlay.unmount();
            false
        } else {
            if guard.controller.is_last_step() {
                let generation = guard.generation.get();
                guard
                    .celebration
                    .prefetch(generation, Rc::clone(&guard.generation));
            }
            true
        }
    };

    fire_pending_action(rt);
    fire_pending_end(rt);
    if !show {
        return;
    }

    // First paint shows the centered card immediately; the real measurement
    // runs after a short settle delay.
    render_current(rt);
    schedule_settle(rt);
    attach_viewport_listeners(rt);
}

/// Build the `on_enter` recorder for one step. Recording the id instead of
/// calling the registered JS action keeps embedder code out of the runtime
/// borrow held during the transition.
fn deferred_action(pending: &Rc<Cell<Option<String>>>, step_id: &str) -> StepAction {
    let pending = Rc::clone(pending);
    let step_id = step_id.to_string();
    Rc::new(move || {
        pending.set(Some(step_id.clone()));
        Ok(())
    })
}

/// Invoke the JS action registered for the step that just became current.
/// Runs with no runtime borrow held; the action may re-enter the provider
/// freely.
fn fire_pending_action(rt: &Rc<RefCell<TourRuntime>>) {
    let (step_id, action) = {
        let guard = rt.borrow();
        let Some(step_id) = guard.pending_action.take() else {
            return;
        };
        let action = guard.actions.get(&step_id).cloned();
        (step_id, action)
    };
    if let Some(action) = action {
        if let Err(e) = action.call0(&JsValue::NULL) {
            let err = TourError::CallbackFailure {
                step_id,
                message: format!("{e:?}"),
            };
            log::error!("{err}");
        }
    }
}

/// Invoke the embedder's end-of-tour callback, if the last transition ended
/// the tour. Runs with no runtime borrow held; the callback may re-enter the
/// provider freely.
fn fire_pending_end(rt: &Rc<RefCell<TourRuntime>>) {
    let callback = {
        let guard = rt.borrow();
        match guard.pending_end.take() {
            Some(TourEnd::Completed) => guard.on_complete.clone(),
            Some(TourEnd::Skipped) => guard.on_skip.clone(),
            None => return,
        }
    };
    if let Some(callback) = callback {
        if let Err(err) = callback.call0(&JsValue::NULL) {
            log::error!("tour end callback failed: {err:?}");
        }
    }
}

fn render_current(rt: &Rc<RefCell<TourRuntime>>) {
    let handle = TourHandle {
        runtime: Rc::downgrade(rt),
    };
    let mut guard = rt.borrow_mut();
    let TourRuntime {
        controller,
        overlay,
        active_rect,
        retry_pending,
        ..
    } = &mut *guard;
    let Some(step) = controller.current_step() else {
        return;
    };
    let frame = OverlayFrame {
        step,
        step_number: controller.step_index(),
        total_steps: controller.total_steps(),
        is_first: controller.is_first_step(),
        is_last: controller.is_last_step(),
        rect: *active_rect,
        searching: *retry_pending,
    };
    if let Err(err) = overlay.render(&frame, &handle) {
        log::error!("overlay render failed: {err:?}");
    }
}

/// Locate the active step's target and repaint. On failure, schedules the
/// single 500ms retry (when allowed and not already pending), after which
/// the tooltip falls back to a centered placement.
fn resolve_and_render(rt: &Rc<RefCell<TourRuntime>>, allow_retry: bool) {
    let selector = {
        let guard = rt.borrow();
        match guard.controller.current_step() {
            Some(step) => step.target.clone(),
            None => return,
        }
    };

    match resolver::resolve(&selector) {
        Ok(target) => {
            resolver::scroll_into_view(&target.element);
            {
                let mut guard = rt.borrow_mut();
                guard.active_rect = Some(target.rect);
                guard.retry_pending = false;
            }
            render_current(rt);
        }
        Err(err) => {
            let schedule = allow_retry && !rt.borrow().retry_pending;
            if schedule {
                log::warn!("{err}; retrying in {}ms", resolver::RETRY_DELAY_MS);
                let mut guard = rt.borrow_mut();
                guard.retry_pending = true;
                let expected = guard.generation.get();
                let weak = Rc::downgrade(rt);
                guard.retry_timer = OneShotTimer::new(resolver::RETRY_DELAY_MS, move || {
                    let Some(rt) = weak.upgrade() else { return };
                    if rt.borrow().generation.get() != expected {
                        return;
                    }
                    rt.borrow_mut().retry_pending = false;
                    resolve_and_render(&rt, false);
                })
                .map_err(|e| log::error!("failed to schedule retry: {e:?}"))
                .ok();
                drop(guard);
            } else {
                log::warn!("{err}; falling back to a centered tooltip");
                let mut guard = rt.borrow_mut();
                guard.active_rect = None;
                guard.retry_pending = false;
                drop(guard);
            }
            render_current(rt);
        }
    }
}

fn schedule_settle(rt: &Rc<RefCell<TourRuntime>>) {
    let mut guard = rt.borrow_mut();
    let expected = guard.generation.get();
    let weak = Rc::downgrade(rt);
    guard.settle_timer = OneShotTimer::new(resolver::SETTLE_DELAY_MS, move || {
        let Some(rt) = weak.upgrade() else { return };
        if rt.borrow().generation.get() != expected {
            return;
        }
        resolve_and_render(&rt, true);
    })
    .map_err(|e| log::error!("failed to schedule measurement: {e:?}"))
    .ok();
}

fn attach_viewport_listeners(rt: &Rc<RefCell<TourRuntime>>) {
    let expected = rt.borrow().generation.get();
    let mut guards = Vec::with_capacity(2);
    for event in ["resize", "scroll"] {
        let weak = Rc::downgrade(rt);
        match ListenerGuard::on_window(event, move || {
            let Some(rt) = weak.upgrade() else { return };
            if rt.borrow().generation.get() != expected {
                return;
            }
            resolve_and_render(&rt, true);
        }) {
            Ok(guard) => guards.push(guard),
            Err(err) => log::error!("failed to attach {event} listener: {err:?}"),
        }
    }
    rt.borrow_mut().listeners = guards;
}

/// Complete triggered from the overlay's terminal control: play the
/// celebration when it is loaded, deferring the state transition behind the
/// fixed ceiling; otherwise complete immediately.
fn complete_requested(rt: &Rc<RefCell<TourRuntime>>) {
    let parts = {
        let guard = rt.borrow();
        if guard.controller.is_last_step() {
            guard.celebration.playback_parts()
        } else {
            None
        }
    };

    // The renderer is embedder code; call it with no runtime borrow held.
    let playing = match parts {
        Some((renderer, data)) => match renderer.play(&data) {
            Ok(()) => true,
            Err(err) => {
                let err = TourError::AssetLoad {
                    message: format!("{err:?}"),
                };
                log::error!("{err}");
                false
            }
        },
        None => false,
    };

    if !playing {
        rt.borrow_mut().controller.complete_tour();
        refresh(rt);
        return;
    }

    // The step is over visually; drop its listeners and timers so a scroll
    // or the pending settle pass cannot remount the tooltip over the
    // celebration.
    let mut guard = rt.borrow_mut();
    guard.overlay.unmount();
    guard.listeners.clear();
    guard.settle_timer = None;
    guard.retry_timer = None;
    guard.retry_pending = false;
    let expected = guard.generation.get();
    let weak = Rc::downgrade(rt);
    guard.celebration_timer = OneShotTimer::new(CELEBRATION_DURATION_MS, move || {
        let Some(rt) = weak.upgrade() else { return };
        if rt.borrow().generation.get() != expected {
            return;
        }
        rt.borrow_mut().controller.complete_tour();
        refresh(&rt);
    })
    .map_err(|e| log::error!("failed to schedule completion: {e:?}"))
    .ok();
}

fn start_with_steps(
    rt: &Rc<RefCell<TourRuntime>>,
    mut steps: Vec<TourStep>,
    tour_id: &str,
) -> Result<(), TourError> {
    {
        let mut guard = rt.borrow_mut();
        let TourRuntime {
            controller,
            actions,
            pending_action,
            ..
        } = &mut *guard;
        for step in &mut steps {
            if actions.contains_key(&step.id) {
                step.on_enter = Some(deferred_action(pending_action, &step.id));
            }
        }
        controller.start_tour(steps, tour_id)?;
    }
    refresh(rt);
    Ok(())
}

fn parse_steps(steps: JsValue) -> Result<Vec<TourStep>, JsValue> {
    serde_wasm_bindgen::from_value(steps)
        .map_err(|e| JsValue::from_str(&format!("invalid step list: {e}")))
}

fn to_js(err: TourError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        let _ = console_log::init_with_level(log::Level::Info);
    });
}

/// One guided tour provider, exposed to JavaScript
#[wasm_bindgen]
pub struct Tour {
    runtime: Rc<RefCell<TourRuntime>>,
}

#[wasm_bindgen]
impl Tour {
    /// Create a provider. `options` may be `undefined` or an object with
    /// `celebrationUrl` and `theme` overrides.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<Tour, JsValue> {
        init_logging();

        let options: TourOptions = if options.is_undefined() || options.is_null() {
            TourOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("invalid tour options: {e}")))?
        };

        let store = LocalCompletionStore::new();
        let pending_end = Rc::new(Cell::new(None));

        let mut controller = TourController::new(Box::new(store));
        let pending = Rc::clone(&pending_end);
        controller.set_on_complete(Rc::new(move || pending.set(Some(TourEnd::Completed))));
        let pending = Rc::clone(&pending_end);
        controller.set_on_skip(Rc::new(move || pending.set(Some(TourEnd::Skipped))));

        let runtime = TourRuntime {
            controller,
            store,
            overlay: OverlayRenderer::new(options.theme),
            celebration: Celebration::new(options.celebration_url),
            actions: HashMap::new(),
            on_complete: None,
            on_skip: None,
            pending_end,
            pending_action: Rc::new(Cell::new(None)),
            active_rect: None,
            listeners: Vec::new(),
            settle_timer: None,
            retry_timer: None,
            celebration_timer: None,
            auto_start_timer: None,
            retry_pending: false,
            generation: Rc::new(Cell::new(0)),
        };

        Ok(Tour {
            runtime: Rc::new(RefCell::new(runtime)),
        })
    }

    /// Register a side effect to run whenever the step with `step_id`
    /// becomes current. Must be called before the tour starts.
    #[wasm_bindgen(js_name = setStepAction)]
    pub fn set_step_action(&self, step_id: String, action: js_sys::Function) {
        self.runtime.borrow_mut().actions.insert(step_id, action);
    }

    /// Called after a tour finishes on its last step.
    #[wasm_bindgen(js_name = setOnComplete)]
    pub fn set_on_complete(&self, callback: js_sys::Function) {
        self.runtime.borrow_mut().on_complete = Some(callback);
    }

    /// Called after a tour is dismissed early.
    #[wasm_bindgen(js_name = setOnSkip)]
    pub fn set_on_skip(&self, callback: js_sys::Function) {
        self.runtime.borrow_mut().on_skip = Some(callback);
    }

    /// Inject the celebration playback strategy (e.g. a Lottie player).
    #[wasm_bindgen(js_name = setCelebrationRenderer)]
    pub fn set_celebration_renderer(&self, play: js_sys::Function) {
        let renderer: Rc<dyn CelebrationRenderer> = Rc::new(JsCelebrationRenderer::new(play));
        self.runtime
            .borrow_mut()
            .celebration
            .set_renderer(renderer);
    }

    /// Supply the celebration animation descriptor directly, skipping the
    /// URL fetch.
    #[wasm_bindgen(js_name = setCelebrationData)]
    pub fn set_celebration_data(&self, descriptor: JsValue) {
        self.runtime.borrow().celebration.preload(descriptor);
    }

    /// Start a tour. Fails on an empty step list or blank tour id, leaving
    /// any active tour untouched.
    #[wasm_bindgen(js_name = startTour)]
    pub fn start_tour(&self, steps: JsValue, tour_id: String) -> Result<(), JsValue> {
        let steps = parse_steps(steps)?;
        start_with_steps(&self.runtime, steps, &tour_id).map_err(to_js)
    }

    /// Start the tour after a short delay, but only on the first visit for
    /// this tour id (no completion record, never seen before). Returns
    /// whether a start was scheduled.
    #[wasm_bindgen(js_name = startIfFirstVisit)]
    pub fn start_if_first_visit(&self, steps: JsValue, tour_id: String) -> Result<bool, JsValue> {
        let steps = parse_steps(steps)?;
        if !self.runtime.borrow().store.should_auto_start(&tour_id) {
            return Ok(false);
        }

        let weak = Rc::downgrade(&self.runtime);
        let timer = OneShotTimer::new(AUTO_START_DELAY_MS, move || {
            let Some(rt) = weak.upgrade() else { return };
            if let Err(err) = start_with_steps(&rt, steps, &tour_id) {
                log::error!("deferred tour start failed: {err}");
            }
        })?;
        self.runtime.borrow_mut().auto_start_timer = Some(timer);
        Ok(true)
    }

    #[wasm_bindgen(js_name = nextStep)]
    pub fn next_step(&self) {
        self.runtime.borrow_mut().controller.next_step();
        refresh(&self.runtime);
    }

    #[wasm_bindgen(js_name = previousStep)]
    pub fn previous_step(&self) {
        self.runtime.borrow_mut().controller.previous_step();
        refresh(&self.runtime);
    }

    #[wasm_bindgen(js_name = skipTour)]
    pub fn skip_tour(&self) {
        self.runtime.borrow_mut().controller.skip_tour();
        refresh(&self.runtime);
    }

    /// Complete immediately, bypassing any celebration.
    #[wasm_bindgen(js_name = completeTour)]
    pub fn complete_tour(&self) {
        self.runtime.borrow_mut().controller.complete_tour();
        refresh(&self.runtime);
    }

    /// Clear the completion record and run the same tour from the top.
    #[wasm_bindgen(js_name = restartTour)]
    pub fn restart_tour(&self) -> Result<(), JsValue> {
        self.runtime
            .borrow_mut()
            .controller
            .restart_tour()
            .map_err(to_js)?;
        refresh(&self.runtime);
        Ok(())
    }

    /// Forget both the completion record and the first-visit marker for a
    /// tour id.
    #[wasm_bindgen(js_name = resetTour)]
    pub fn reset_tour(&self, tour_id: String) -> Result<(), JsValue> {
        self.runtime.borrow().store.reset(&tour_id).map_err(to_js)
    }

    /// The current step definition, or `null` when no tour is active.
    #[wasm_bindgen(js_name = getCurrentStep)]
    pub fn get_current_step(&self) -> JsValue {
        let guard = self.runtime.borrow();
        match guard.controller.current_step() {
            Some(step) => serde_wasm_bindgen::to_value(step).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(getter, js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.runtime.borrow().controller.is_active()
    }

    /// Zero-based index of the current step
    #[wasm_bindgen(getter, js_name = currentStep)]
    pub fn current_step(&self) -> usize {
        self.runtime.borrow().controller.step_index()
    }

    #[wasm_bindgen(getter, js_name = totalSteps)]
    pub fn total_steps(&self) -> usize {
        self.runtime.borrow().controller.total_steps()
    }

    #[wasm_bindgen(getter, js_name = isFirstStep)]
    pub fn is_first_step(&self) -> bool {
        self.runtime.borrow().controller.is_first_step()
    }

    #[wasm_bindgen(getter, js_name = isLastStep)]
    pub fn is_last_step(&self) -> bool {
        self.runtime.borrow().controller.is_last_step()
    }

    #[wasm_bindgen(js_name = isCompleted)]
    pub fn is_completed(&self, tour_id: String) -> bool {
        self.runtime.borrow().controller.is_completed(&tour_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tour_core::MemoryCompletionStore;

    #[test]
    fn test_enter_action_records_instead_of_re_entering() {
        let pending = Rc::new(Cell::new(None));
        let ctl = Rc::new(RefCell::new(TourController::new(Box::new(
            MemoryCompletionStore::new(),
        ))));

        let steps = vec![
            TourStep::new("intro", "#intro", "Intro", "First"),
            TourStep::new("menu", "#menu", "Menu", "Second")
                .with_on_enter(deferred_action(&pending, "menu")),
        ];
        ctl.borrow_mut().start_tour(steps, "t1").unwrap();
        assert!(pending.take().is_none());

        // on_enter fires inside this mutable borrow; the recorder must not
        // touch the controller, only note the step id for later dispatch
        ctl.borrow_mut().next_step();
        assert_eq!(ctl.borrow().step_index(), 1);
        assert_eq!(pending.take(), Some("menu".to_string()));
    }

    #[test]
    fn test_enter_action_is_recorded_again_on_revisit() {
        let pending = Rc::new(Cell::new(None));
        let action = deferred_action(&pending, "menu");
        action().unwrap();
        assert_eq!(pending.take(), Some("menu".to_string()));
        action().unwrap();
        assert_eq!(pending.take(), Some("menu".to_string()));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    struct NoopRenderer;

    impl CelebrationRenderer for NoopRenderer {
        fn play(&self, _data: &JsValue) -> Result<(), JsValue> {
            Ok(())
        }
    }

    #[wasm_bindgen_test]
    fn test_celebration_suspends_step_resources() {
        let tour = Tour::new(JsValue::UNDEFINED).unwrap();
        {
            let mut guard = tour.runtime.borrow_mut();
            guard.celebration.set_renderer(Rc::new(NoopRenderer));
            guard.celebration.preload(js_sys::Object::new().into());
        }

        let steps = vec![TourStep::new("only", "#no-such-element", "Only", "Body")];
        start_with_steps(&tour.runtime, steps, "celebration-suspend").unwrap();
        assert!(tour.is_active());
        assert!(!tour.runtime.borrow().listeners.is_empty());
        assert!(tour.runtime.borrow().settle_timer.is_some());

        complete_requested(&tour.runtime);

        let guard = tour.runtime.borrow();
        // no resize/scroll or settle callback may repaint the tooltip while
        // the celebration plays
        assert!(guard.listeners.is_empty());
        assert!(guard.settle_timer.is_none());
        assert!(guard.retry_timer.is_none());
        assert!(!guard.retry_pending);
        // completion itself is deferred behind the celebration timer
        assert!(guard.celebration_timer.is_some());
        assert!(guard.controller.is_active());
    }
}
