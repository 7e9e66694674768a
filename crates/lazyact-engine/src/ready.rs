//! Document ready-state helpers

use lazyact_dom::ReadyState;

use crate::Runtime;

impl Runtime {
    /// Run `task` once the document is in one of `states`
    ///
    /// Runs synchronously if it already is; otherwise on the first matching
    /// transition.
    pub fn on_ready_state(&mut self, states: &[ReadyState], task: impl FnOnce(&mut Runtime) + 'static) {
        if states.contains(&self.document().ready_state()) {
            task(self);
            return;
        }
        self.ready_waiters.push((states.to_vec(), Box::new(task)));
    }

    /// Run `task` when the document becomes interactive
    pub fn on_interactive(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.on_ready_state(&[ReadyState::Interactive], task);
    }

    /// Alias of [`Runtime::on_interactive`]
    pub fn on_ready(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.on_interactive(task);
    }

    /// Run `task` once the document and its subresources have loaded
    pub fn on_complete(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.on_ready_state(&[ReadyState::Complete], task);
    }

    /// Host notification of a ready-state transition
    pub fn set_ready_state(&mut self, state: ReadyState) {
        if !self.document_mut().set_ready_state(state) {
            return;
        }
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.ready_waiters)
            .into_iter()
            .partition(|(states, _)| states.contains(&state));
        self.ready_waiters = waiting;

        for (_, task) in ready {
            task(self);
        }
    }
}
