/// Run an action when the guard goes out of scope, on every exit path.
///
/// Independent cleanups get independent guards so one cannot mask another:
/// the scratch directory (a `tempfile::TempDir`) and the best-effort
/// service restart each drop on their own.
pub struct Deferred<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> Deferred<F> {
    pub fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }

    /// Disarm the guard; the action will not run.
    pub fn cancel(mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for Deferred<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn action_runs_on_scope_exit() {
        let fired = Cell::new(false);
        {
            let _guard = Deferred::new(|| fired.set(true));
            assert!(!fired.get());
        }
        assert!(fired.get());
    }

    #[test]
    fn action_runs_on_early_return() {
        fn inner(fired: &Cell<bool>) -> Result<(), ()> {
            let _guard = Deferred::new(|| fired.set(true));
            Err(())
        }
        let fired = Cell::new(false);
        let _ = inner(&fired);
        assert!(fired.get());
    }

    #[test]
    fn cancelled_guard_does_not_fire() {
        let fired = Cell::new(false);
        let guard = Deferred::new(|| fired.set(true));
        guard.cancel();
        assert!(!fired.get());
    }

    #[test]
    fn guards_compose_independently() {
        let order = std::cell::RefCell::new(Vec::new());
        {
            let _outer = Deferred::new(|| order.borrow_mut().push("outer"));
            let _inner = Deferred::new(|| order.borrow_mut().push("inner"));
        }
        // Reverse declaration order, like any Drop.
        assert_eq!(*order.borrow(), vec!["inner", "outer"]);
    }
}
