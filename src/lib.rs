pub mod app;
pub mod config;
pub mod handler;
pub mod speech;
pub mod storage;
pub mod synthesis;
pub mod version;
