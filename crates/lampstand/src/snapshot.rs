//! Optimistic state updates that can be rolled back.
//!
//! [`Optimistic::apply`] changes the state immediately and hands back a
//! [`Snapshot`] of what it replaced. Once the remote side has answered, the
//! caller either commits the change or rolls the state back to the snapshot.

/// State captured before an optimistic change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a snapshot must be committed or rolled back"]
pub struct Snapshot<S> {
    state: S,
    version: u64,
}

impl<S> Snapshot<S> {
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Version of the state this snapshot was taken from.
    pub const fn version(&self) -> u64 {
        self.version
    }
}

/// A value with optimistic update support.
#[derive(Debug, Clone, Default)]
pub struct Optimistic<S> {
    state: S,
    version: u64,
    pending: usize,
}

impl<S: Clone> Optimistic<S> {
    pub const fn new(state: S) -> Self {
        Self {
            state,
            version: 0,
            pending: 0,
        }
    }

    pub const fn get(&self) -> &S {
        &self.state
    }

    /// Incremented by every change, including rollbacks.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of applied changes not yet committed or rolled back.
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Apply `change` now and return the state it replaced.
    pub fn apply(&mut self, change: impl FnOnce(&mut S)) -> Snapshot<S> {
        let snapshot = Snapshot {
            state: self.state.clone(),
            version: self.version,
        };
        change(&mut self.state);
        self.version += 1;
        self.pending += 1;
        snapshot
    }

    /// Keep the optimistic change.
    pub fn commit(&mut self, _snapshot: Snapshot<S>) {
        self.pending = self.pending.saturating_sub(1);
    }

    /// Restore the state captured in `snapshot`.
    pub fn rollback(&mut self, snapshot: Snapshot<S>) {
        self.state = snapshot.state;
        self.version += 1;
        self.pending = self.pending.saturating_sub(1);
    }

    /// Replace the state outright, e.g. with an authoritative server copy.
    pub fn update(&mut self, state: S) {
        self.state = state;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    struct Account {
        tier: &'static str,
        credits: u32,
    }

    #[test]
    fn test_commit_keeps_change() {
        let mut account = Optimistic::new(Account {
            tier: "free",
            credits: 0,
        });

        let snapshot = account.apply(|a| a.tier = "plus");
        assert_eq!(account.get().tier, "plus");
        assert_eq!(account.pending(), 1);

        account.commit(snapshot);
        assert_eq!(account.get().tier, "plus");
        assert_eq!(account.pending(), 0);
        assert_eq!(account.version(), 1);
    }

    #[test]
    fn test_rollback_restores_exact_state() {
        let before = Account {
            tier: "free",
            credits: 7,
        };
        let mut account = Optimistic::new(before.clone());

        let snapshot = account.apply(|a| {
            a.tier = "pro";
            a.credits += 100;
        });
        assert_eq!(snapshot.state(), &before);
        assert_eq!(snapshot.version(), 0);

        account.rollback(snapshot);
        assert_eq!(account.get(), &before);
        assert_eq!(account.version(), 2);
        assert_eq!(account.pending(), 0);
    }

    #[test]
    fn test_update_replaces_state() {
        let mut account = Optimistic::<Account>::default();
        account.update(Account {
            tier: "plus",
            credits: 1,
        });
        assert_eq!(account.get().credits, 1);
        assert_eq!(account.version(), 1);
    }
}
