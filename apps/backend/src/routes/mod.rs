//! HTTP route handlers

pub mod auth;
pub mod notes;
pub mod questions;
pub mod review;
pub mod sessions;
pub mod users;
