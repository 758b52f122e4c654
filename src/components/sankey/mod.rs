mod chart;
mod export;
mod layout;
mod render;
mod state;
pub mod theme;
mod types;

#[cfg(test)]
pub(crate) use chart::recording;
pub use chart::{CanvasBackend, ChartBackend, DiagramRenderer, RenderStatus};
pub use export::EXPORT_FILENAME;
