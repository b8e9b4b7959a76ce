//! Coordination store backend implementations

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;
