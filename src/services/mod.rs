pub mod cache;
pub mod change_detector;
pub mod database;
pub mod invalidator;
pub mod pricing;
pub mod subscription;
pub mod tasks;
