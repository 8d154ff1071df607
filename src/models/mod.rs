pub mod client;
pub mod common;
pub mod plan;
pub mod service;
pub mod subscription;
