pub mod log_sender;
pub mod signal;
pub mod webhook_sender;
