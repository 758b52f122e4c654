//! Style values as the canvas needs them, and everything a chart is built from.

use crate::config::{NodeAlign, StyleConfig, TextWeight};
use crate::host::ThemeMode;

use super::layout::SankeyLayout;
use super::theme;

#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
	pub size: f64,
	pub weight: TextWeight,
	pub color: String,
	pub show_value: bool,
}

/// Style on the scales the layout and canvas work with.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledStyle {
	pub align: NodeAlign,
	/// Node width as a fraction of the diagram width.
	pub node_width_ratio: f64,
	/// Vertical gap as a fraction of the diagram height.
	pub node_padding_ratio: f64,
	pub node_opacity: f64,
	pub link_opacity: f64,
	pub label: LabelStyle,
	pub palette: &'static [&'static str],
}

impl ScaledStyle {
	pub fn from_config(style: &StyleConfig) -> Self {
		let unit = |v: f64, scale: f64| if v.is_finite() { (v / scale).clamp(0.0, 1.0) } else { 0.0 };
		Self {
			align: style.node_align,
			node_width_ratio: unit(style.node_width, 1000.0),
			node_padding_ratio: unit(style.node_padding_ratio, 1000.0),
			node_opacity: unit(style.node_opacity, 100.0),
			link_opacity: unit(style.link_opacity, 100.0),
			label: LabelStyle {
				size: if style.text_size.is_finite() && style.text_size > 0.0 {
					style.text_size
				} else {
					StyleConfig::default().text_size
				},
				weight: style.text_weight,
				color: style.text_color.clone(),
				show_value: style.show_node_value,
			},
			palette: theme::palette(style.color_theme),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
	Start,
	End,
}

impl TextAlign {
	pub fn as_canvas(self) -> &'static str {
		match self {
			TextAlign::Start => "start",
			TextAlign::End => "end",
		}
	}
}

/// Everything a chart backend needs to draw one diagram.
#[derive(Clone, Debug)]
pub struct ChartSpec {
	pub layout: SankeyLayout,
	pub style: ScaledStyle,
	pub theme: ThemeMode,
}
