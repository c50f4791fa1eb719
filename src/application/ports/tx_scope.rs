/// Where a repository write runs
///
/// `NoTransaction` writes are independent: a failure between two of them can leave
/// a counter out of step with its attachment. `WithinTransaction` threads the
/// caller's transaction through every write so they commit or roll back together.
pub enum TxScope<'a, T> {
    NoTransaction,
    WithinTransaction(&'a mut T),
}

impl<'a, T> TxScope<'a, T> {
    /// Borrow this scope for one more write without giving it up
    pub fn reborrow(&mut self) -> TxScope<'_, T> {
        match self {
            TxScope::NoTransaction => TxScope::NoTransaction,
            TxScope::WithinTransaction(tx) => TxScope::WithinTransaction(&mut **tx),
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self, TxScope::WithinTransaction(_))
    }
}

impl<'a, T> From<&'a mut T> for TxScope<'a, T> {
    fn from(tx: &'a mut T) -> Self {
        TxScope::WithinTransaction(tx)
    }
}

impl<T> std::fmt::Debug for TxScope<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxScope::NoTransaction => write!(f, "NoTransaction"),
            TxScope::WithinTransaction(_) => write!(f, "WithinTransaction"),
        }
    }
}

/// Capability required by the raw counter and lifecycle primitives
///
/// Only this crate can mint one, so the primitives are reachable only through the
/// attachment lifecycle transitions.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleToken {
    _private: (),
}

impl LifecycleToken {
    pub(crate) const fn issue() -> Self {
        Self { _private: () }
    }
}
