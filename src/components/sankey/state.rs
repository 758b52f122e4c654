//! Pointer hover over a drawn diagram: what is under the cursor, what gets
//! highlighted, and the label and tooltip text.

use super::layout::SankeyLayout;
use super::types::{ChartSpec, TextAlign};

pub const LABEL_OFFSET: f64 = 8.0;

/// What the pointer is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverTarget {
	Node(usize),
	Link(usize),
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub target: Option<HoverTarget>,
	pub pointer: (f64, f64),
}

/// One rendered diagram plus its interaction state.
pub struct SankeyState {
	pub spec: ChartSpec,
	pub hover: HoverState,
}

impl SankeyState {
	pub fn new(spec: ChartSpec) -> Self {
		Self {
			spec,
			hover: HoverState::default(),
		}
	}

	pub fn layout(&self) -> &SankeyLayout {
		&self.spec.layout
	}

	pub fn target_at(&self, x: f64, y: f64) -> Option<HoverTarget> {
		let layout = self.layout();
		layout
			.node_at(x, y)
			.map(HoverTarget::Node)
			.or_else(|| layout.link_at(x, y).map(HoverTarget::Link))
	}

	/// Moves the pointer; returns whether the highlighted set changed.
	pub fn hover_at(&mut self, x: f64, y: f64) -> bool {
		self.hover.pointer = (x, y);
		let target = self.target_at(x, y);
		let changed = self.hover.target != target;
		self.hover.target = target;
		changed
	}

	pub fn clear_hover(&mut self) -> bool {
		self.hover.target.take().is_some()
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.target.is_some()
	}

	pub fn is_node_highlighted(&self, idx: usize) -> bool {
		matches!(self.hover.target, Some(HoverTarget::Node(n)) if n == idx)
	}

	/// A hovered node lights every link touching it by name; a hovered link
	/// lights only itself.
	pub fn is_link_highlighted(&self, idx: usize) -> bool {
		let layout = self.layout();
		match self.hover.target {
			Some(HoverTarget::Link(l)) => l == idx,
			Some(HoverTarget::Node(n)) => {
				let name = &layout.nodes[n].name;
				let link = &layout.links[idx];
				&layout.nodes[link.source].name == name || &layout.nodes[link.target].name == name
			}
			None => false,
		}
	}

	pub fn label_text(&self, idx: usize) -> String {
		let node = &self.layout().nodes[idx];
		if self.spec.style.label.show_value {
			format!("{}\n{}", node.name, node.value)
		} else {
			node.name.clone()
		}
	}

	/// Anchor point and alignment: rightmost nodes label inward on their
	/// left, all others label on their right.
	pub fn label_anchor(&self, idx: usize) -> (f64, f64, TextAlign) {
		let layout = self.layout();
		let node = &layout.nodes[idx];
		let y = (node.y0 + node.y1) / 2.0;
		if layout.is_terminal(idx) {
			(node.x0 - LABEL_OFFSET, y, TextAlign::End)
		} else {
			(node.x1 + LABEL_OFFSET, y, TextAlign::Start)
		}
	}

	/// Tooltip lines for the hovered element.
	pub fn tooltip(&self) -> Option<Vec<String>> {
		let layout = self.layout();
		match self.hover.target? {
			HoverTarget::Node(n) => {
				let node = &layout.nodes[n];
				Some(vec![node.name.clone(), format!("{}", node.value)])
			}
			HoverTarget::Link(l) => {
				let link = &layout.links[l];
				Some(vec![link.path.clone(), format!("{}", link.value)])
			}
		}
	}
}
