//! # Delivery Redis
//!
//! Low-level Redis client for the edge gateway.
//!
//! ## Design Principles
//!
//! - **No business logic** - pure infrastructure layer
//! - **No dependencies** on other delivery-* crates
//! - **Atomic counting** - windowed counters are created and expired in a
//!   single server-side step, so concurrent gateway instances never lose an
//!   update
//!
//! ## Example
//!
//! ```rust,no_run
//! use delivery_redis::RedisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RedisClient::connect("redis://localhost:6379").await?;
//!
//!     // First hit creates the key with a 60 second TTL
//!     let count = client.incr_with_expiry("rate:edge:203.0.113.5-store", 60).await?;
//!     assert!(count >= 1);
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::RedisClient;

// Re-export commonly used types
pub use redis::RedisError;

/// Result type for Redis operations
pub type Result<T> = std::result::Result<T, RedisError>;
