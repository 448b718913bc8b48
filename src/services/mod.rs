mod store;
mod redis_service;
mod memory_store;
pub mod consistency;

pub use store::EntityStore;
pub use redis_service::RedisService;
pub use memory_store::MemoryStore;
