//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` backs the coordination logic with real resources: wall
//! clock time that advances naturally, OS cryptographic RNG via getrandom,
//! and tokio sleeps for the game-expiry timers. Production behavior is
//! therefore non-deterministic; tests substitute their own environments.

use std::time::Duration;

use parlor_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional: session ids and game
/// tokens come from this source, and a server without functioning
/// randomness cannot mint unguessable identifiers. RNG failure indicates
/// OS-level trouble and is not worth limping through.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable for identifier minting");
    }

    #[allow(clippy::expect_used)]
    fn wall_clock_ms(&self) -> u64 {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)");
        u64::try_from(elapsed.as_millis())
            .expect("invariant: millisecond timestamps fit in u64 for the next 500M years")
    }
}
