pub mod app_config;
pub mod booking_repo;
pub mod context_store;
pub mod database;
pub mod memory_repo;
pub mod redis_store;

pub use booking_repo::PgBookingRepository;
pub use context_store::MemoryContextStore;
pub use database::DbClient;
pub use memory_repo::MemoryBookingRepository;
pub use redis_store::RedisContextStore;
