mod core;
mod s3_port_impl;
mod storage_port_impl;
pub use core::*;
pub mod fs {
    pub use super::storage_port_impl::*;
}
pub mod s3 {
    pub use super::s3_port_impl::*;
}
