pub mod audit;
pub mod notifications;
pub mod passwords;
pub mod secrets;
