//! Page-state reset utilities
//!
//! Page-scoped state must never outlive its page or leak from one job into
//! another. [`PageReset`] runs a callback exactly once when the page is torn
//! down. [`ResetOnChange`] additionally runs it whenever a watched key
//! changes. [`Scoped`] owns the state directly and clears it on key change.

/// Tracks a key and reports changes
#[derive(Debug, Clone)]
pub struct KeyWatch<K> {
    last: Option<K>,
    skip_initial: bool,
}

impl<K: PartialEq> KeyWatch<K> {
    pub fn new(skip_initial: bool) -> Self {
        Self { last: None, skip_initial }
    }

    /// Record `key`, returning true when a reset is due.
    ///
    /// The first observation counts as a change unless `skip_initial` is set.
    pub fn changed(&mut self, key: K) -> bool {
        match &self.last {
            None => {
                self.last = Some(key);
                !self.skip_initial
            }
            Some(prev) if *prev == key => false,
            Some(_) => {
                self.last = Some(key);
                true
            }
        }
    }

    pub fn current(&self) -> Option<&K> {
        self.last.as_ref()
    }
}

/// Runs its callback once, on drop
pub struct PageReset<F: FnMut()> {
    callback: F,
}

impl<F: FnMut()> PageReset<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut()> Drop for PageReset<F> {
    fn drop(&mut self) {
        (self.callback)();
    }
}

/// Runs its callback when the watched key changes and on drop
pub struct ResetOnChange<K, F: FnMut()> {
    watch: KeyWatch<K>,
    callback: F,
}

impl<K: PartialEq, F: FnMut()> ResetOnChange<K, F> {
    pub fn new(callback: F) -> Self {
        Self {
            watch: KeyWatch::new(false),
            callback,
        }
    }

    pub fn skip_initial(callback: F) -> Self {
        Self {
            watch: KeyWatch::new(true),
            callback,
        }
    }

    /// Feed the current key; returns whether the callback ran
    pub fn observe(&mut self, key: K) -> bool {
        let fire = self.watch.changed(key);
        if fire {
            (self.callback)();
        }
        fire
    }
}

impl<K, F: FnMut()> Drop for ResetOnChange<K, F> {
    fn drop(&mut self) {
        (self.callback)();
    }
}

/// State owned by one page and keyed by the entity it shows
#[derive(Debug)]
pub struct Scoped<K, S> {
    watch: KeyWatch<K>,
    state: S,
}

impl<K: PartialEq, S: Default> Scoped<K, S> {
    pub fn new() -> Self {
        Self {
            watch: KeyWatch::new(true),
            state: S::default(),
        }
    }

    /// Enter the page for `key`, clearing state left by another key
    pub fn enter(&mut self, key: K) -> &mut S {
        if self.watch.changed(key) {
            tracing::debug!("Page key changed, clearing page state");
            self.state = S::default();
        }
        &mut self.state
    }

    /// Leave the page
    pub fn leave(&mut self) {
        self.watch = KeyWatch::new(true);
        self.state = S::default();
    }

    pub fn key(&self) -> Option<&K> {
        self.watch.current()
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<K: PartialEq, S: Default> Default for Scoped<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_page_reset_runs_once_on_drop() {
        let calls = Cell::new(0);
        {
            let _guard = PageReset::new(|| calls.set(calls.get() + 1));
            assert_eq!(calls.get(), 0);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_skip_initial() {
        let calls = Cell::new(0);
        {
            let mut reset = ResetOnChange::skip_initial(|| calls.set(calls.get() + 1));
            assert!(!reset.observe("job-a"));
            assert_eq!(calls.get(), 0);

            assert!(!reset.observe("job-a"));
            assert!(reset.observe("job-b"));
            assert!(reset.observe("job-a"));
            assert_eq!(calls.get(), 2);
        }
        // Unmount resets too
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_initial_observation_fires_by_default() {
        let calls = Cell::new(0);
        let mut reset = ResetOnChange::new(|| calls.set(calls.get() + 1));
        assert!(reset.observe(1));
        assert!(!reset.observe(1));
        drop(reset);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_scoped_state_cleared_between_keys() {
        let mut page: Scoped<u32, Vec<&str>> = Scoped::new();
        page.enter(1).push("job one data");
        page.enter(1).push("more");
        assert_eq!(page.state().len(), 2);

        assert!(page.enter(2).is_empty());
        page.enter(2).push("job two data");

        page.leave();
        assert!(page.key().is_none());
        assert!(page.state().is_empty());
    }
}
