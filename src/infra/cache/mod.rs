//! Cache adapters for resolved banner content.

mod memory;
mod redis_cache;

pub use memory::MemoryBannerCache;
pub use redis_cache::RedisBannerCache;
