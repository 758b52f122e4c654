mod component;
mod form;

pub use component::SankeyPanel;
