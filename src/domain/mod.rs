pub mod format;
pub mod messages;
pub mod models;
pub mod timer;
