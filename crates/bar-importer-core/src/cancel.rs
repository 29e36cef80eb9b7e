//! Cooperative cancellation shared between a caller and the network call it
//! is waiting on. Clones observe the same signal; `cancelled()` resolves
//! immediately if the token was already cancelled.

pub use tokio_util::sync::CancellationToken;
