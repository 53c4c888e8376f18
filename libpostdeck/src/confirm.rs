//! Confirmation gate asked before a multi-item run starts

/// Synchronous yes/no prompt carrying the number of items about to be
/// published
pub trait ConfirmationGate: Send + Sync {
    fn confirm(&self, item_count: usize) -> bool;
}

/// Gate that always says yes (`--yes`, scripted runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm(&self, _item_count: usize) -> bool {
        true
    }
}

/// Gate that always says no (non-interactive sessions without `--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl ConfirmationGate for AlwaysDecline {
    fn confirm(&self, _item_count: usize) -> bool {
        false
    }
}

impl<F> ConfirmationGate for F
where
    F: Fn(usize) -> bool + Send + Sync,
{
    fn confirm(&self, item_count: usize) -> bool {
        self(item_count)
    }
}
