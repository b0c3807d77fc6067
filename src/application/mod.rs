use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod bootstrap;
pub mod commands;
pub mod loopback;
pub mod persistence_bridge;
pub mod presentation;
pub mod productivity;
pub mod timer_service;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
