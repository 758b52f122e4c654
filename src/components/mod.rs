pub mod panel;
pub mod sankey;
