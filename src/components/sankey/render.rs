//! Canvas drawing of one laid-out diagram.

use web_sys::CanvasRenderingContext2d;

use super::state::SankeyState;
use super::theme;
use super::types::TextAlign;

const DIMMED: f64 = 0.25;
const LINE_HEIGHT: f64 = 1.2;

fn hex_to_rgba(hex: &str, alpha: f64) -> String {
	let hex = hex.trim_start_matches('#');
	let channel = |i: usize| hex.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok()).unwrap_or(0);
	format!("rgba({}, {}, {}, {})", channel(0), channel(2), channel(4), alpha)
}

pub fn render(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let layout = state.layout();
	ctx.set_global_alpha(1.0);
	ctx.set_fill_style_str(theme::background(state.spec.theme));
	ctx.fill_rect(0.0, 0.0, layout.width, layout.height);
	draw_links(state, ctx);
	draw_nodes(state, ctx);
	draw_labels(state, ctx);
	draw_tooltip(state, ctx);
}

fn node_color(state: &SankeyState, idx: usize) -> &'static str {
	let palette = state.spec.style.palette;
	palette[idx % palette.len()]
}

fn draw_links(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let layout = state.layout();
	let base = state.spec.style.link_opacity;
	let has_highlight = state.has_active_highlight();

	for (i, link) in layout.links.iter().enumerate() {
		if link.width <= 0.0 {
			continue;
		}
		let (x0, x1) = layout.link_ends(link);
		let xm = (x0 + x1) / 2.0;
		let half = link.width / 2.0;

		let alpha = if !has_highlight {
			base
		} else if state.is_link_highlighted(i) {
			(base + 0.2).min(1.0)
		} else {
			base * DIMMED
		};

		// band outline: top edge forward, bottom edge back
		ctx.begin_path();
		ctx.move_to(x0, link.y0 - half);
		ctx.bezier_curve_to(xm, link.y0 - half, xm, link.y1 - half, x1, link.y1 - half);
		ctx.line_to(x1, link.y1 + half);
		ctx.bezier_curve_to(xm, link.y1 + half, xm, link.y0 + half, x0, link.y0 + half);
		ctx.close_path();
		ctx.set_fill_style_str(&hex_to_rgba(node_color(state, link.source), alpha));
		ctx.fill();
	}
}

fn draw_nodes(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let layout = state.layout();
	let opacity = state.spec.style.node_opacity;
	let has_highlight = state.has_active_highlight();

	for (i, node) in layout.nodes.iter().enumerate() {
		let alpha = if has_highlight && !state.is_node_highlighted(i) {
			opacity * 0.6
		} else {
			opacity
		};
		ctx.set_fill_style_str(&hex_to_rgba(node_color(state, i), alpha));
		ctx.fill_rect(node.x0, node.y0, node.x1 - node.x0, (node.y1 - node.y0).max(1.0));

		if state.is_node_highlighted(i) {
			ctx.set_stroke_style_str(&hex_to_rgba(node_color(state, i), 1.0));
			ctx.set_line_width(2.0);
			ctx.stroke_rect(node.x0, node.y0, node.x1 - node.x0, (node.y1 - node.y0).max(1.0));
		}
	}
}

fn draw_labels(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let label = &state.spec.style.label;
	ctx.set_fill_style_str(&label.color);
	ctx.set_font(&format!("{} {}px sans-serif", label.weight.as_str(), label.size));
	ctx.set_text_baseline("middle");

	let mut placed: Vec<(f64, f64, f64, f64)> = Vec::new();
	for i in 0..state.layout().nodes.len() {
		let text = state.label_text(i);
		let lines: Vec<&str> = text.lines().collect();
		let (x, y, align) = state.label_anchor(i);
		let line_height = label.size * LINE_HEIGHT;
		let top = y - line_height * (lines.len() as f64 - 1.0) / 2.0;

		// hide labels that would overlap one already drawn
		let width = lines
			.iter()
			.filter_map(|l| ctx.measure_text(l).ok())
			.map(|m| m.width())
			.fold(0.0, f64::max);
		let left = match align {
			TextAlign::Start => x,
			TextAlign::End => x - width,
		};
		let rect = (left, top - line_height / 2.0, width, line_height * lines.len() as f64);
		let overlaps = placed.iter().any(|p| {
			rect.0 < p.0 + p.2 && p.0 < rect.0 + rect.2 && rect.1 < p.1 + p.3 && p.1 < rect.1 + rect.3
		});
		if overlaps {
			continue;
		}
		placed.push(rect);

		ctx.set_text_align(align.as_canvas());
		for (n, line) in lines.iter().enumerate() {
			let _ = ctx.fill_text(line, x, top + n as f64 * line_height);
		}
	}
}

fn draw_tooltip(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let Some(lines) = state.tooltip() else {
		return;
	};
	let (bg, fg) = theme::tooltip_colors(state.spec.theme);
	let (px, py) = state.hover.pointer;
	let layout = state.layout();

	ctx.set_font("12px sans-serif");
	ctx.set_text_align("start");
	ctx.set_text_baseline("top");
	let width = lines
		.iter()
		.filter_map(|l| ctx.measure_text(l).ok())
		.map(|m| m.width())
		.fold(0.0, f64::max)
		+ 16.0;
	let height = lines.len() as f64 * 16.0 + 12.0;
	let x = (px + 12.0).min(layout.width - width).max(0.0);
	let y = (py + 12.0).min(layout.height - height).max(0.0);

	ctx.set_fill_style_str(bg);
	ctx.fill_rect(x, y, width, height);
	ctx.set_stroke_style_str("rgba(0, 0, 0, 0.15)");
	ctx.set_line_width(1.0);
	ctx.stroke_rect(x, y, width, height);
	ctx.set_fill_style_str(fg);
	for (n, line) in lines.iter().enumerate() {
		let _ = ctx.fill_text(line, x + 8.0, y + 6.0 + n as f64 * 16.0);
	}
}

#[cfg(test)]
mod tests {
	use super::hex_to_rgba;

	#[test]
	fn hex_colors_gain_alpha() {
		assert_eq!(hex_to_rgba("#FF5733", 0.5), "rgba(255, 87, 51, 0.5)");
		assert_eq!(hex_to_rgba("zz", 1.0), "rgba(0, 0, 0, 1)");
	}
}
