pub mod config_service;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use paths::{PathError, PolyAgentPaths};
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};
