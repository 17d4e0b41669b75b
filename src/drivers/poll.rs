//! Polling loops.
//!
//! Every wait in the driver (MDIO owner bit, PHY reset completion, TX
//! completion) is a loop on a hardware status bit. On the GXP these loops are
//! unbounded: a wedged device hangs the caller, which is acceptable in a
//! single-threaded boot environment. [`Poller`] keeps that as the default and
//! adds an optional attempt limit and a backoff policy, so callers (and tests)
//! can turn a hang into an error.

use core::fmt;

use crate::drivers::timer::DelayFn;

/// What to do between two failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Re-check immediately (CPU spin hint only).
    Spin,
    /// Wait `us` microseconds using `delay`.
    Delay { us: u32, delay: DelayFn },
}

/// A polling loop ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    /// Number of failed checks before giving up
    pub attempts: u32,
}

impl fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "condition not met after {} attempts", self.attempts)
    }
}

/// Polling policy: optional attempt limit plus backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    limit: Option<u32>,
    backoff: Backoff,
}

impl Default for Poller {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Poller {
    /// Poll forever, spinning between attempts.
    pub const fn unbounded() -> Self {
        Self {
            limit: None,
            backoff: Backoff::Spin,
        }
    }

    /// Give up after `attempts` failed checks.
    pub const fn bounded(attempts: u32) -> Self {
        Self {
            limit: Some(attempts),
            backoff: Backoff::Spin,
        }
    }

    /// Replace the backoff policy.
    pub const fn with_backoff(self, backoff: Backoff) -> Self {
        Self {
            limit: self.limit,
            backoff,
        }
    }

    /// Attempt limit, `None` when unbounded
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub const fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Call `done` until it returns `true`.
    ///
    /// The condition is always checked at least once, and checked before any
    /// backoff, so a condition that already holds costs a single call.
    pub fn poll_until<F>(&self, mut done: F) -> Result<(), PollTimeout>
    where
        F: FnMut() -> bool,
    {
        let mut attempts: u32 = 0;
        loop {
            if done() {
                return Ok(());
            }

            attempts = attempts.saturating_add(1);
            if let Some(limit) = self.limit
                && attempts >= limit
            {
                return Err(PollTimeout { attempts });
            }

            match self.backoff {
                Backoff::Spin => core::hint::spin_loop(),
                Backoff::Delay { us, delay } => delay(us),
            }
        }
    }
}
