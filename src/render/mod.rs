//! Render-loop driver state

pub mod context;

pub use context::RenderContext;
