//! Cancellation scopes bounding how long reads may block.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// A deadline and/or explicit cancellation signal.
///
/// Clones share the same cancellation token, so cancelling any clone expires
/// all of them. Expiry is sticky: once the deadline has passed or the token
/// has been cancelled, the scope stays expired.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Point in time after which the scope is expired.
    deadline: Option<Instant>,
    /// Explicit cancellation signal.
    token: CancellationToken,
}

impl Scope {
    /// Create a scope that only expires when cancelled.
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Create a scope that expires `timeout` from now.
    ///
    /// A timeout too large to be represented as a deadline yields a scope
    /// without deadline.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use execreg_io::scope::Scope;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let scope = Scope::with_timeout(Duration::ZERO);
    ///     assert!(scope.is_expired());
    /// }
    /// ```
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            token: CancellationToken::new(),
        }
    }

    /// Create a scope that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Create an unbounded scope that is cancelled together with `parent`.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            deadline: None,
            token: parent.child_token(),
        }
    }

    /// Return a copy of this scope that also expires after `timeout`,
    /// keeping whichever deadline comes first.
    pub fn timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(current), Some(candidate)) => Some(current.min(candidate)),
            (current, candidate) => current.or(candidate),
        };
        Self {
            deadline,
            token: self.token.clone(),
        }
    }

    /// Cancel this scope and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Deadline of this scope, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` for scopes without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the scope has already expired.
    pub fn is_expired(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Wait until the scope expires.
    ///
    /// Never resolves for an unbounded scope that is never cancelled.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl From<CancellationToken> for Scope {
    fn from(token: CancellationToken) -> Self {
        Self {
            deadline: None,
            token,
        }
    }
}
