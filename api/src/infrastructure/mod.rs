pub mod crypto;
pub mod db;
pub mod notifications;
pub mod storage;
