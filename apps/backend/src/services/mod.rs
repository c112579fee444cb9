//! Backend services

pub mod ai;
pub mod session;
