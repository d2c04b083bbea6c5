pub mod broadcast;
pub mod core;
pub mod error;
