pub mod blocklist_sync;
pub mod cache_maintenance;
pub mod runner;

pub use blocklist_sync::BlocklistSyncJob;
pub use cache_maintenance::CacheMaintenanceJob;
pub use runner::JobRunner;
