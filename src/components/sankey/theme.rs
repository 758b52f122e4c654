//! Node palettes and the light/dark page colors.

use crate::host::ThemeMode;

const WARM: &[&str] = &[
	"#FF5733", "#C70039", "#900C3F", "#581845", "#1B4F72", "#2E86C1", "#AED6F1", "#A569BD",
	"#196F3D", "#F1C40F", "#FFC300", "#DAF7A6", "#FFC0CB", "#808000", "#0000FF", "#008080",
	"#800080", "#FFA500", "#00FFFF", "#FF00FF",
];

const SOFT: &[&str] = &[
	"#5B8FF9", "#5AD8A6", "#5D7092", "#F6BD16", "#E8684A", "#6DC8EC", "#9270CA", "#FF9D4D",
	"#269A99", "#FF99C3",
];

const CATEGORY: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Palettes selectable in the form, in index order.
pub const PALETTES: [&[&str]; 3] = [WARM, SOFT, CATEGORY];

/// Palette for a stored theme index; unknown indices use the first one.
pub fn palette(index: usize) -> &'static [&'static str] {
	PALETTES.get(index).copied().unwrap_or(WARM)
}

pub fn background(mode: ThemeMode) -> &'static str {
	match mode {
		ThemeMode::Light => "#ffffff",
		ThemeMode::Dark => "#1a1a2e",
	}
}

/// Tooltip box fill and text colors.
pub fn tooltip_colors(mode: ThemeMode) -> (&'static str, &'static str) {
	match mode {
		ThemeMode::Light => ("rgba(255, 255, 255, 0.95)", "#333333"),
		ThemeMode::Dark => ("rgba(30, 30, 50, 0.95)", "#f0f0f0"),
	}
}
