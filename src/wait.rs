//! Wait/retry policy
//!
//! Chosen once per attaching handle. `Spin` busy-polls the shared atomics
//! until the operation's precondition holds; `NoWait` evaluates the
//! condition exactly once and reports "nothing available" as an empty
//! result, leaving retry scheduling to the caller.

/// Retry policy for a stalled claim, commit or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Busy-poll until satisfied. CPU-bound, lowest latency.
    Spin,
    /// Evaluate once and return an empty result if unsatisfied.
    NoWait,
}

impl WaitMode {
    /// Construct from the per-attacher spin flag.
    #[inline]
    pub fn from_spin(spin: bool) -> Self {
        if spin {
            WaitMode::Spin
        } else {
            WaitMode::NoWait
        }
    }

    #[inline]
    pub fn is_spin(self) -> bool {
        matches!(self, WaitMode::Spin)
    }
}

/// Busy-poll `attempt` until it produces a value.
#[inline]
pub(crate) fn spin_until<T>(mut attempt: impl FnMut() -> Option<T>) -> T {
    loop {
        if let Some(value) = attempt() {
            return value;
        }
        core::hint::spin_loop();
    }
}
