/// Asks the user to approve a destructive action. Blocks until answered;
/// `false` (including a dismissed prompt) aborts with no state change.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// An answer collected before the operation ran, e.g. a flag in a request.
#[derive(Debug, Clone, Copy)]
pub struct Preconfirmed(pub bool);

impl Confirm for Preconfirmed {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}
