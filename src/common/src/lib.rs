pub mod cli;
pub mod config;
pub mod storage;

pub use config::Configuration;
pub use storage::BucketStores;
