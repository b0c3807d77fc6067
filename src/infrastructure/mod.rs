pub mod config;
pub mod credential_store;
pub mod error;
pub mod identity;
pub mod notifier;
pub mod productivity_client;
pub mod productivity_repository;
pub mod session_store;
pub mod storage;
