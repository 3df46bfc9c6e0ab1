pub mod classify;
pub mod config;
pub mod plan;
pub mod render;
pub mod status;

mod input;
