//! Sankey geometry: node columns, stacked node heights and link bands.

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::NodeAlign;
use crate::projection::FlowTuple;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	pub name: String,
	/// `max(sum of incoming, sum of outgoing)`.
	pub value: f64,
	pub column: usize,
	pub x0: f64,
	pub x1: f64,
	pub y0: f64,
	pub y1: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutLink {
	pub source: usize,
	pub target: usize,
	pub value: f64,
	pub path: String,
	pub width: f64,
	/// Band center where it leaves the source node.
	pub y0: f64,
	/// Band center where it enters the target node.
	pub y1: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
	pub width: f64,
	pub height: f64,
	pub node_width_ratio: f64,
	pub node_padding_ratio: f64,
	pub align: NodeAlign,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyLayout {
	pub nodes: Vec<LayoutNode>,
	pub links: Vec<LayoutLink>,
	pub width: f64,
	pub height: f64,
	pub columns: usize,
}

fn flow_value(v: f64) -> f64 {
	if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

fn intern(index: &mut HashMap<String, usize>, nodes: &mut Vec<LayoutNode>, name: &str) -> usize {
	if let Some(&i) = index.get(name) {
		return i;
	}
	let i = nodes.len();
	index.insert(name.to_string(), i);
	nodes.push(LayoutNode {
		name: name.to_string(),
		value: 0.0,
		column: 0,
		x0: 0.0,
		x1: 0.0,
		y0: 0.0,
		y1: 0.0,
	});
	i
}

/// Splits `next` into the edges of a depth-first forest plus cross edges,
/// and a count of the back edges left out. What remains has no cycles.
fn acyclic(next: &[Vec<usize>]) -> (Vec<Vec<usize>>, usize) {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		New,
		Open,
		Done,
	}

	let n = next.len();
	let mut mark = vec![Mark::New; n];
	let mut kept = vec![Vec::new(); n];
	let mut dropped = 0;
	for root in 0..n {
		if mark[root] != Mark::New {
			continue;
		}
		mark[root] = Mark::Open;
		let mut stack = vec![(root, 0)];
		while let Some(&(node, edge)) = stack.last() {
			let Some(&m) = next[node].get(edge) else {
				mark[node] = Mark::Done;
				stack.pop();
				continue;
			};
			let top = stack.len() - 1;
			stack[top].1 += 1;
			match mark[m] {
				Mark::Open => dropped += 1,
				Mark::New => {
					kept[node].push(m);
					mark[m] = Mark::Open;
					stack.push((m, 0));
				}
				Mark::Done => kept[node].push(m),
			}
		}
	}
	(kept, dropped)
}

/// Longest-path level of every node following the acyclic `next`.
fn levels(next: &[Vec<usize>]) -> Vec<usize> {
	let n = next.len();
	let mut level = vec![0; n];
	let mut current: Vec<usize> = (0..n).collect();
	let mut depth = 0;
	while !current.is_empty() && depth <= n {
		let mut queued = vec![false; n];
		let mut upcoming = Vec::new();
		for &node in &current {
			level[node] = depth;
			for &m in &next[node] {
				if !queued[m] {
					queued[m] = true;
					upcoming.push(m);
				}
			}
		}
		current = upcoming;
		depth += 1;
	}
	level
}

impl SankeyLayout {
	/// Lays out one link per tuple. Self-loops are not drawn.
	pub fn compute(dataset: &[FlowTuple], opts: &LayoutOptions) -> Self {
		let mut index = HashMap::new();
		let mut nodes = Vec::new();
		let mut links = Vec::with_capacity(dataset.len());

		for tuple in dataset {
			if tuple.source == tuple.target {
				debug!("skipping self-loop on {}", tuple.source);
				continue;
			}
			let source = intern(&mut index, &mut nodes, &tuple.source);
			let target = intern(&mut index, &mut nodes, &tuple.target);
			links.push(LayoutLink {
				source,
				target,
				value: flow_value(tuple.value),
				path: tuple.path.clone(),
				width: 0.0,
				y0: 0.0,
				y1: 0.0,
			});
		}

		let mut layout = Self {
			nodes,
			links,
			width: opts.width,
			height: opts.height,
			columns: 0,
		};
		if layout.nodes.is_empty() {
			return layout;
		}
		layout.assign_values();
		layout.assign_columns(opts.align);
		layout.assign_positions(opts);
		layout.assign_link_offsets();
		layout
	}

	fn assign_values(&mut self) {
		let n = self.nodes.len();
		let (mut incoming, mut outgoing) = (vec![0.0; n], vec![0.0; n]);
		for link in &self.links {
			outgoing[link.source] += link.value;
			incoming[link.target] += link.value;
		}
		for (i, node) in self.nodes.iter_mut().enumerate() {
			node.value = f64::max(incoming[i], outgoing[i]);
		}
	}

	fn assign_columns(&mut self, align: NodeAlign) {
		let n = self.nodes.len();
		let mut targets = vec![Vec::new(); n];
		for link in &self.links {
			targets[link.source].push(link.target);
		}
		// Links that close a cycle are still drawn but do not move columns.
		let (targets, dropped) = acyclic(&targets);
		if dropped > 0 {
			warn!("cyclic flows are not supported; {dropped} link(s) ignored for column placement");
		}
		let mut sources = vec![Vec::new(); n];
		for (source, ends) in targets.iter().enumerate() {
			for &target in ends {
				sources[target].push(source);
			}
		}
		let depth = levels(&targets);
		let height = levels(&sources);
		let max_depth = depth.iter().copied().max().unwrap_or(0);

		for (i, node) in self.nodes.iter_mut().enumerate() {
			let column = match align {
				NodeAlign::Left => depth[i],
				NodeAlign::Right => max_depth.saturating_sub(height[i]),
				NodeAlign::Justify if targets[i].is_empty() => max_depth,
				NodeAlign::Justify => depth[i],
				NodeAlign::Center if !sources[i].is_empty() => depth[i],
				NodeAlign::Center => targets[i]
					.iter()
					.map(|&t| depth[t])
					.min()
					.map_or(0, |d| d.saturating_sub(1)),
			};
			node.column = column.min(max_depth);
		}
		self.columns = self.nodes.iter().map(|n| n.column).max().unwrap_or(0) + 1;
	}

	fn assign_positions(&mut self, opts: &LayoutOptions) {
		let node_width = opts.node_width_ratio * self.width;
		let kx = if self.columns > 1 {
			(self.width - node_width) / (self.columns - 1) as f64
		} else {
			0.0
		};

		let mut columns = vec![Vec::new(); self.columns];
		for (i, node) in self.nodes.iter_mut().enumerate() {
			node.x0 = node.column as f64 * kx;
			node.x1 = node.x0 + node_width;
			columns[node.column].push(i);
		}

		let max_count = columns.iter().map(Vec::len).max().unwrap_or(0);
		let mut padding = opts.node_padding_ratio * self.height;
		if max_count > 1 {
			padding = padding.min(self.height * 0.5 / (max_count - 1) as f64);
		}

		let ky = columns
			.iter()
			.filter_map(|members| {
				let total: f64 = members.iter().map(|&i| self.nodes[i].value).sum();
				(total > 0.0).then(|| (self.height - (members.len() - 1) as f64 * padding) / total)
			})
			.fold(f64::INFINITY, f64::min);
		let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };

		for members in &columns {
			let mut y = 0.0;
			for &i in members {
				let node = &mut self.nodes[i];
				node.y0 = y;
				node.y1 = y + node.value * ky;
				y = node.y1 + padding;
			}
			let used = y - padding;
			let offset = ((self.height - used) / 2.0).max(0.0);
			for &i in members {
				self.nodes[i].y0 += offset;
				self.nodes[i].y1 += offset;
			}
		}

		for link in &mut self.links {
			link.width = link.value * ky;
		}
	}

	fn assign_link_offsets(&mut self) {
		let n = self.nodes.len();
		let (mut outgoing, mut incoming) = (vec![Vec::new(); n], vec![Vec::new(); n]);
		for (i, link) in self.links.iter().enumerate() {
			outgoing[link.source].push(i);
			incoming[link.target].push(i);
		}

		for node in 0..n {
			let nodes = &self.nodes;
			let links = &self.links;
			let by_y = |a: &usize, b: &usize, end: fn(&LayoutLink) -> usize| {
				let (ya, yb) = (nodes[end(&links[*a])].y0, nodes[end(&links[*b])].y0);
				ya.total_cmp(&yb).then(a.cmp(b))
			};
			outgoing[node].sort_by(|a, b| by_y(a, b, |l| l.target));
			incoming[node].sort_by(|a, b| by_y(a, b, |l| l.source));

			let mut sy = self.nodes[node].y0;
			for &i in &outgoing[node] {
				let link = &mut self.links[i];
				link.y0 = sy + link.width / 2.0;
				sy += link.width;
			}
			let mut ty = self.nodes[node].y0;
			for &i in &incoming[node] {
				let link = &mut self.links[i];
				link.y1 = ty + link.width / 2.0;
				ty += link.width;
			}
		}
	}

	/// Whether the node sits in the rightmost column.
	pub fn is_terminal(&self, node: usize) -> bool {
		self.nodes[node].column + 1 == self.columns
	}

	/// End points of a link band's center line.
	pub fn link_ends(&self, link: &LayoutLink) -> (f64, f64) {
		(self.nodes[link.source].x1, self.nodes[link.target].x0)
	}

	/// Center of a link band at horizontal position `x`, if the band spans it.
	pub fn link_center_at(&self, link: &LayoutLink, x: f64) -> Option<f64> {
		let (x0, x3) = self.link_ends(link);
		if x3 <= x0 || x < x0 || x > x3 {
			return None;
		}
		let xm = (x0 + x3) / 2.0;
		let bezier = |t: f64, a: f64, b: f64, c: f64, d: f64| {
			let u = 1.0 - t;
			u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
		};
		let (mut lo, mut hi) = (0.0, 1.0);
		for _ in 0..24 {
			let mid = (lo + hi) / 2.0;
			if bezier(mid, x0, xm, xm, x3) < x {
				lo = mid;
			} else {
				hi = mid;
			}
		}
		let t = (lo + hi) / 2.0;
		Some(bezier(t, link.y0, link.y0, link.y1, link.y1))
	}

	pub fn node_at(&self, x: f64, y: f64) -> Option<usize> {
		self.nodes
			.iter()
			.position(|n| x >= n.x0 && x <= n.x1 && y >= n.y0 && y <= n.y1)
	}

	/// Topmost link band under the point.
	pub fn link_at(&self, x: f64, y: f64) -> Option<usize> {
		self.links.iter().enumerate().rev().find_map(|(i, link)| {
			let center = self.link_center_at(link, x)?;
			((y - center).abs() <= (link.width / 2.0).max(1.0)).then_some(i)
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn tuple(source: &str, target: &str, value: f64) -> FlowTuple {
		FlowTuple {
			source: source.into(),
			target: target.into(),
			value,
			path: format!("{source} -> {target} -> {value}"),
		}
	}

	fn options(align: NodeAlign) -> LayoutOptions {
		LayoutOptions {
			width: 1000.0,
			height: 500.0,
			node_width_ratio: 0.02,
			node_padding_ratio: 0.08,
			align,
		}
	}

	fn columns(layout: &SankeyLayout) -> Vec<(&str, usize)> {
		layout.nodes.iter().map(|n| (n.name.as_str(), n.column)).collect()
	}

	#[test]
	fn chain_spreads_across_columns() {
		let data = [tuple("A", "B", 10.0), tuple("B", "C", 5.0)];
		let layout = SankeyLayout::compute(&data, &options(NodeAlign::Right));

		assert_eq!(columns(&layout), [("A", 0), ("B", 1), ("C", 2)]);
		assert_eq!(layout.columns, 3);
		assert!(layout.is_terminal(2));
		assert!(!layout.is_terminal(1));

		let values: Vec<f64> = layout.nodes.iter().map(|n| n.value).collect();
		assert_eq!(values, [10.0, 10.0, 5.0]);

		let b = &layout.nodes[1];
		assert_eq!((b.x0, b.x1), (490.0, 510.0));
		let c = &layout.nodes[2];
		assert_eq!((c.y0, c.y1), (125.0, 375.0));
		assert_eq!(layout.links[0].width, 500.0);
		assert_eq!(layout.links[1].width, 250.0);
	}

	#[test]
	fn alignment_moves_dangling_nodes() {
		let data = [
			tuple("A", "B", 1.0),
			tuple("A", "C", 1.0),
			tuple("C", "D", 1.0),
			tuple("E", "D", 1.0),
		];
		let col = |align| {
			let layout = SankeyLayout::compute(&data, &options(align));
			layout.nodes.iter().map(|n| n.column).collect::<Vec<_>>()
		};

		//            A  B  C  D  E
		assert_eq!(col(NodeAlign::Left), [0, 1, 1, 2, 0]);
		assert_eq!(col(NodeAlign::Right), [0, 2, 1, 2, 1]);
		assert_eq!(col(NodeAlign::Justify), [0, 2, 1, 2, 0]);
		assert_eq!(col(NodeAlign::Center), [0, 1, 1, 2, 1]);
	}

	#[test]
	fn duplicate_pairs_stack_as_parallel_links() {
		let data = [tuple("A", "B", 3.0), tuple("A", "B", 1.0)];
		let layout = SankeyLayout::compute(&data, &options(NodeAlign::Left));

		assert_eq!(layout.nodes.len(), 2);
		assert_eq!(layout.links.len(), 2);
		assert_eq!(layout.nodes[0].value, 4.0);

		let (first, second) = (&layout.links[0], &layout.links[1]);
		assert_eq!(first.width, 375.0);
		assert_eq!(second.width, 125.0);
		assert_eq!(first.y0, 187.5);
		assert_eq!(second.y0, 437.5);
	}

	#[test]
	fn self_loops_and_bad_values_are_tolerated() {
		let data = [tuple("A", "A", 5.0), tuple("A", "B", -2.0)];
		let layout = SankeyLayout::compute(&data, &options(NodeAlign::Right));
		assert_eq!(layout.links.len(), 1);
		assert_eq!(layout.links[0].value, 0.0);
		assert_eq!(layout.links[0].width, 0.0);

		assert_eq!(SankeyLayout::compute(&[], &options(NodeAlign::Right)).columns, 0);
	}

	#[test]
	fn cycles_leave_no_empty_columns() {
		let data = [tuple("A", "B", 1.0), tuple("B", "A", 1.0)];
		for align in NodeAlign::ALL {
			let layout = SankeyLayout::compute(&data, &options(align));
			assert_eq!(layout.columns, 2, "{align:?}");
			assert_eq!(columns(&layout), [("A", 0), ("B", 1)], "{align:?}");
			assert_eq!(layout.links.len(), 2);
		}

		let data = [tuple("A", "B", 1.0), tuple("B", "C", 1.0), tuple("C", "A", 1.0), tuple("C", "D", 1.0)];
		let layout = SankeyLayout::compute(&data, &options(NodeAlign::Left));
		assert_eq!(columns(&layout), [("A", 0), ("B", 1), ("C", 2), ("D", 3)]);
		assert_eq!(layout.columns, 4);
	}

	#[test]
	fn hit_testing_finds_nodes_and_bands() {
		let data = [tuple("A", "B", 10.0), tuple("B", "C", 5.0)];
		let layout = SankeyLayout::compute(&data, &options(NodeAlign::Right));

		assert_eq!(layout.node_at(10.0, 250.0), Some(0));
		assert_eq!(layout.node_at(300.0, 10.0), None);
		assert_eq!(layout.link_at(255.0, 250.0), Some(0));
		assert_eq!(layout.link_at(745.0, 250.0), Some(1));
		assert_eq!(layout.link_at(745.0, 20.0), None);
	}
}
