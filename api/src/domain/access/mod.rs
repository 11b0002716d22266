pub mod ability;
pub mod role;
