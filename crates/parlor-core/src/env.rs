//! Environment abstraction for deterministic testing.
//!
//! Decouples coordination logic from system resources (time, randomness).
//! Tests implement this with seeded RNGs and fixed clocks; production uses
//! the server crate's system environment.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// Implementations MUST guarantee:
///
/// - `wall_clock_ms()` never goes backwards within a single execution
///   context
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Sleeps for the specified duration.
    ///
    /// The only async method in the trait; used by runtime code for the
    /// game-expiry timers, never by coordination logic.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for minting session ids and game-id tokens.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Milliseconds since the Unix epoch.
    ///
    /// Used for the serializable `last_move_ms` timestamp carried in game
    /// snapshots.
    fn wall_clock_ms(&self) -> u64;
}
