//! Microsecond delays.
//!
//! The UMAC clock sequence needs short fixed settling delays (2 µs) and the
//! polling loops can optionally back off between attempts. The driver takes
//! the delay as a plain function pointer ([`DelayFn`]) so a board can plug in
//! its own timer, and tests can plug in a no-op.
//!
//! [`spin_delay_us`] is the fallback: an uncalibrated busy loop that needs
//! no timer peripheral. Boards with a running timer should pass their own
//! [`DelayFn`] instead.

/// A function that blocks for at least the given number of microseconds.
pub type DelayFn = fn(u32);

/// Busy-loop iterations per microsecond.
///
/// Not measured on hardware. Errs long: the wait reaches `us` as long as one
/// iteration takes at least 5 ns.
const SPIN_LOOPS_PER_US: u32 = 200;

/// Busy-wait for roughly `us` microseconds.
///
/// Uncalibrated; boards with a running timer should not rely on it.
pub fn spin_delay_us(us: u32) {
    for _ in 0..us.saturating_mul(SPIN_LOOPS_PER_US) {
        core::hint::spin_loop();
    }
}

/// A delay that returns immediately.
pub fn no_delay(_us: u32) {}
