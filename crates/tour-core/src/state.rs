//! Step state machine for one tour instance
//!
//! `TourController` owns the ordered step list and the current index, and
//! applies the `Idle -> Active -> Idle` transitions. Completion is persisted
//! through an injected [`CompletionStore`]; one controller serves one tour at
//! a time, and concurrent tours use separate controller instances.
//!
//! Every transition is total: internal failures (persistence writes, step
//! actions) are logged and the transition still completes, and `step_index`
//! never leaves `0..steps.len()` while a tour is active.

use crate::errors::{TourError, TourResult};
use crate::types::{TourState, TourStep};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Key prefix for persisted completion records
pub const COMPLETION_KEY_PREFIX: &str = "tour-completed-";

/// Durable boolean completion flag, keyed by tour id.
///
/// Writes are idempotent (last write wins) and independent across tour ids.
pub trait CompletionStore {
    fn is_completed(&self, tour_id: &str) -> bool;
    fn mark_completed(&self, tour_id: &str) -> TourResult<()>;
    fn clear_completed(&self, tour_id: &str) -> TourResult<()>;
}

/// In-memory store for tests and native embedders
#[derive(Default)]
pub struct MemoryCompletionStore {
    completed: RefCell<HashSet<String>>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionStore for MemoryCompletionStore {
    fn is_completed(&self, tour_id: &str) -> bool {
        self.completed.borrow().contains(tour_id)
    }

    fn mark_completed(&self, tour_id: &str) -> TourResult<()> {
        self.completed.borrow_mut().insert(tour_id.to_string());
        Ok(())
    }

    fn clear_completed(&self, tour_id: &str) -> TourResult<()> {
        self.completed.borrow_mut().remove(tour_id);
        Ok(())
    }
}

/// Observer hook fired on skip or complete, so callers keep the analytics
/// distinction even though both write the same completion record
pub type TourHook = Rc<dyn Fn()>;

/// State machine for a single tour
pub struct TourController {
    state: TourState,
    store: Box<dyn CompletionStore>,
    on_complete: Option<TourHook>,
    on_skip: Option<TourHook>,
}

impl TourController {
    pub fn new(store: Box<dyn CompletionStore>) -> Self {
        Self {
            state: TourState::default(),
            store,
            on_complete: None,
            on_skip: None,
        }
    }

    pub fn set_on_complete(&mut self, hook: TourHook) {
        self.on_complete = Some(hook);
    }

    pub fn set_on_skip(&mut self, hook: TourHook) {
        self.on_skip = Some(hook);
    }

    /// Activate a tour. Starting while another tour is active forcibly
    /// resets to the new tour; there is no stacking.
    pub fn start_tour(&mut self, steps: Vec<TourStep>, tour_id: &str) -> TourResult<()> {
        if steps.is_empty() {
            return Err(TourError::invalid_input("tour has no steps"));
        }
        if tour_id.trim().is_empty() {
            return Err(TourError::invalid_input("tour id is empty"));
        }

        self.state = TourState {
            is_active: true,
            step_index: 0,
            steps,
            tour_id: tour_id.to_string(),
        };
        log::info!(
            "tour '{}' started with {} steps",
            self.state.tour_id,
            self.state.steps.len()
        );
        self.run_enter_action();
        Ok(())
    }

    /// Advance to the next step; at the last step this completes the tour.
    pub fn next_step(&mut self) {
        if !self.state.is_active {
            log::warn!("next_step called while no tour is active");
            return;
        }
        if self.state.step_index + 1 < self.state.steps.len() {
            self.state.step_index += 1;
            self.run_enter_action();
        } else {
            self.complete_tour();
        }
    }

    /// Go back one step; a no-op at the first step (no wrap-around).
    pub fn previous_step(&mut self) {
        if !self.state.is_active {
            log::warn!("previous_step called while no tour is active");
            return;
        }
        if self.state.step_index > 0 {
            self.state.step_index -= 1;
            self.run_enter_action();
        }
    }

    /// Dismiss the tour early. Persists the completion record best-effort
    /// and deactivates regardless of the write outcome.
    pub fn skip_tour(&mut self) {
        if !self.state.is_active {
            return;
        }
        self.persist_completion();
        self.state.is_active = false;
        if let Some(hook) = &self.on_skip {
            hook();
        }
    }

    /// Finish the tour successfully. Same persistence and deactivation as
    /// [`skip_tour`](Self::skip_tour), but fires the complete hook.
    pub fn complete_tour(&mut self) {
        if !self.state.is_active {
            return;
        }
        self.persist_completion();
        self.state.is_active = false;
        if let Some(hook) = &self.on_complete {
            hook();
        }
    }

    /// Clear the persisted record and run the same tour from the top.
    pub fn restart_tour(&mut self) -> TourResult<()> {
        if self.state.steps.is_empty() {
            return Err(TourError::invalid_input("no tour to restart"));
        }
        if let Err(err) = self.store.clear_completed(&self.state.tour_id) {
            log::error!("failed to clear completion record: {err}");
        }
        self.state.step_index = 0;
        self.state.is_active = true;
        self.run_enter_action();
        Ok(())
    }

    /// The step currently shown, or `None` when no tour is active.
    pub fn current_step(&self) -> Option<&TourStep> {
        if !self.state.is_active {
            return None;
        }
        self.state.steps.get(self.state.step_index)
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn step_index(&self) -> usize {
        self.state.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.state.steps.len()
    }

    pub fn is_first_step(&self) -> bool {
        self.state.step_index == 0
    }

    pub fn is_last_step(&self) -> bool {
        !self.state.steps.is_empty() && self.state.step_index == self.state.steps.len() - 1
    }

    pub fn tour_id(&self) -> &str {
        &self.state.tour_id
    }

    pub fn is_completed(&self, tour_id: &str) -> bool {
        self.store.is_completed(tour_id)
    }

    fn persist_completion(&self) {
        if self.state.tour_id.is_empty() {
            return;
        }
        if let Err(err) = self.store.mark_completed(&self.state.tour_id) {
            log::error!(
                "failed to persist completion for '{}': {err}",
                self.state.tour_id
            );
        }
    }

    fn run_enter_action(&self) {
        let Some(step) = self.current_step() else {
            return;
        };
        let Some(action) = &step.on_enter else {
            return;
        };
        if let Err(message) = action() {
            let err = TourError::CallbackFailure {
                step_id: step.id.clone(),
                message,
            };
            log::error!("{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FailingStore;

    impl CompletionStore for FailingStore {
        fn is_completed(&self, _tour_id: &str) -> bool {
            false
        }

        fn mark_completed(&self, _tour_id: &str) -> TourResult<()> {
            Err(TourError::persistence("storage unavailable"))
        }

        fn clear_completed(&self, _tour_id: &str) -> TourResult<()> {
            Err(TourError::persistence("storage unavailable"))
        }
    }

    fn steps(n: usize) -> Vec<TourStep> {
        (0..n)
            .map(|i| TourStep::new(format!("step-{i}"), format!("#target-{i}"), "Title", "Body"))
            .collect()
    }

    fn controller() -> TourController {
        TourController::new(Box::new(MemoryCompletionStore::new()))
    }

    #[test]
    fn test_start_tour_activates_at_first_step() {
        let mut ctl = controller();
        ctl.start_tour(steps(3), "t1").unwrap();
        assert!(ctl.is_active());
        assert_eq!(ctl.step_index(), 0);
        assert_eq!(ctl.total_steps(), 3);
        assert!(ctl.is_first_step());
        assert!(!ctl.is_last_step());
        assert_eq!(ctl.current_step().unwrap().id, "step-0");
    }

    #[test]
    fn test_start_tour_rejects_empty_steps() {
        let mut ctl = controller();
        let err = ctl.start_tour(Vec::new(), "t1").unwrap_err();
        assert!(matches!(err, TourError::InvalidInput { .. }));
        assert!(!ctl.is_active());
        assert_eq!(ctl.total_steps(), 0);
    }

    #[test]
    fn test_start_tour_rejects_blank_tour_id() {
        let mut ctl = controller();
        assert!(ctl.start_tour(steps(2), "  ").is_err());
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_start_tour_runs_first_step_action() {
        let fired = Rc::new(Cell::new(0));
        let fired_in_action = Rc::clone(&fired);
        let mut tour = steps(2);
        tour[0] = tour[0].clone().with_on_enter(Rc::new(move || {
            fired_in_action.set(fired_in_action.get() + 1);
            Ok(())
        }));

        let mut ctl = controller();
        ctl.start_tour(tour, "t1").unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_failing_step_action_does_not_block_transition() {
        let mut tour = steps(2);
        tour[1] = tour[1]
            .clone()
            .with_on_enter(Rc::new(|| Err("boom".to_string())));

        let mut ctl = controller();
        ctl.start_tour(tour, "t1").unwrap();
        ctl.next_step();
        assert_eq!(ctl.step_index(), 1);
        assert!(ctl.is_active());
    }

    #[test]
    fn test_next_step_increments_until_last() {
        let mut ctl = controller();
        ctl.start_tour(steps(3), "t1").unwrap();
        ctl.next_step();
        assert_eq!(ctl.step_index(), 1);
        ctl.next_step();
        assert_eq!(ctl.step_index(), 2);
        assert!(ctl.is_last_step());
    }

    #[test]
    fn test_next_step_at_last_completes() {
        let completed = Rc::new(Cell::new(false));
        let completed_hook = Rc::clone(&completed);

        let mut ctl = controller();
        ctl.set_on_complete(Rc::new(move || completed_hook.set(true)));
        ctl.start_tour(steps(2), "t1").unwrap();
        ctl.next_step();
        ctl.next_step();

        assert!(!ctl.is_active());
        assert!(completed.get());
        assert!(ctl.is_completed("t1"));
    }

    #[test]
    fn test_next_step_while_inactive_is_a_no_op() {
        let mut ctl = controller();
        ctl.next_step();
        assert!(!ctl.is_active());
        assert_eq!(ctl.step_index(), 0);
    }

    #[test]
    fn test_previous_step_decrements_and_stops_at_zero() {
        let mut ctl = controller();
        ctl.start_tour(steps(3), "t1").unwrap();
        ctl.next_step();
        ctl.previous_step();
        assert_eq!(ctl.step_index(), 0);
        ctl.previous_step();
        assert_eq!(ctl.step_index(), 0);
        assert!(ctl.is_active());
    }

    #[test]
    fn test_skip_persists_and_fires_skip_hook_only() {
        let skipped = Rc::new(Cell::new(false));
        let completed = Rc::new(Cell::new(false));
        let skip_hook = Rc::clone(&skipped);
        let complete_hook = Rc::clone(&completed);

        let mut ctl = controller();
        ctl.set_on_skip(Rc::new(move || skip_hook.set(true)));
        ctl.set_on_complete(Rc::new(move || complete_hook.set(true)));
        ctl.start_tour(steps(3), "t1").unwrap();
        ctl.skip_tour();

        assert!(!ctl.is_active());
        assert!(skipped.get());
        assert!(!completed.get());
        assert!(ctl.is_completed("t1"));
    }

    #[test]
    fn test_skip_and_complete_are_idempotent() {
        let mut ctl = controller();
        ctl.start_tour(steps(2), "t1").unwrap();
        ctl.skip_tour();
        ctl.skip_tour();
        ctl.complete_tour();
        assert!(!ctl.is_active());
        assert!(ctl.is_completed("t1"));
    }

    #[test]
    fn test_persistence_failure_still_deactivates() {
        let mut ctl = TourController::new(Box::new(FailingStore));
        ctl.start_tour(steps(2), "t1").unwrap();
        ctl.skip_tour();
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_current_step_absent_when_inactive() {
        let mut ctl = controller();
        assert!(ctl.current_step().is_none());
        ctl.start_tour(steps(1), "t1").unwrap();
        ctl.complete_tour();
        assert!(ctl.current_step().is_none());
    }

    #[test]
    fn test_starting_new_tour_resets_active_one() {
        let mut ctl = controller();
        ctl.start_tour(steps(3), "first").unwrap();
        ctl.next_step();
        ctl.start_tour(steps(2), "second").unwrap();
        assert!(ctl.is_active());
        assert_eq!(ctl.step_index(), 0);
        assert_eq!(ctl.total_steps(), 2);
        assert_eq!(ctl.tour_id(), "second");
        // abandoning the first tour is not a completion
        assert!(!ctl.is_completed("first"));
    }

    #[test]
    fn test_restart_clears_record_and_reactivates() {
        let mut ctl = controller();
        ctl.start_tour(steps(2), "t1").unwrap();
        ctl.complete_tour();
        assert!(ctl.is_completed("t1"));

        ctl.restart_tour().unwrap();
        assert!(ctl.is_active());
        assert_eq!(ctl.step_index(), 0);
        assert!(!ctl.is_completed("t1"));
    }
}
