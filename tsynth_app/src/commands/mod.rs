pub mod banks;
pub mod common;
pub mod config;
#[cfg(feature = "device")]
pub mod play;
pub mod render;
