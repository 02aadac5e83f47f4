//! Vireo - render-thread resource lifecycle and background scene loading

pub mod core;
pub mod loader;
pub mod render;
pub mod resource;
pub mod scene;
pub mod sync;
