pub mod access;
pub mod errors;
pub mod pagination;
pub mod ports;
pub mod services;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;
