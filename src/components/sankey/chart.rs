//! Diagram lifecycle: every render tears down the previous chart before
//! a new one is built on the backend.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::export;
use super::layout::{LayoutOptions, SankeyLayout};
use super::render;
use super::state::SankeyState;
use super::types::{ChartSpec, ScaledStyle};
use crate::config::StyleConfig;
use crate::error::{ExportError, RenderError};
use crate::host::ThemeMode;
use crate::projection::{FlowTuple, ProjectedDataset};

/// A drawn diagram.
pub trait Chart {
	fn hover_at(&mut self, x: f64, y: f64);
	fn clear_hover(&mut self);
	fn export_png(&self, filename: &str) -> Result<(), ExportError>;
	fn destroy(&mut self);
}

/// Something charts can be drawn on.
pub trait ChartBackend {
	type Chart: Chart;

	/// Drawing area in pixels.
	fn extent(&self) -> (f64, f64);

	fn create(&self, spec: ChartSpec) -> Result<Self::Chart, RenderError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderStatus {
	#[default]
	Idle,
	Rendering,
	Rendered,
	Errored,
}

/// Owns at most one live chart.
pub struct DiagramRenderer<B: ChartBackend> {
	backend: B,
	current: Option<B::Chart>,
	last: Option<(ProjectedDataset, StyleConfig)>,
	status: RenderStatus,
}

impl<B: ChartBackend> DiagramRenderer<B> {
	pub fn new(backend: B) -> Self {
		Self {
			backend,
			current: None,
			last: None,
			status: RenderStatus::Idle,
		}
	}

	pub fn status(&self) -> RenderStatus {
		self.status
	}

	pub fn render(&mut self, dataset: &[FlowTuple], style: &StyleConfig, theme: ThemeMode) -> Result<(), RenderError> {
		self.status = RenderStatus::Rendering;
		if let Some(mut old) = self.current.take() {
			old.destroy();
		}

		let scaled = ScaledStyle::from_config(style);
		let (width, height) = self.backend.extent();
		let layout = SankeyLayout::compute(
			dataset,
			&LayoutOptions {
				width,
				height,
				node_width_ratio: scaled.node_width_ratio,
				node_padding_ratio: scaled.node_padding_ratio,
				align: scaled.align,
			},
		);
		debug!(
			"drawing {} nodes, {} links at {width}x{height}",
			layout.nodes.len(),
			layout.links.len()
		);

		match self.backend.create(ChartSpec {
			layout,
			style: scaled,
			theme,
		}) {
			Ok(chart) => {
				self.current = Some(chart);
				self.last = Some((dataset.to_vec(), style.clone()));
				self.status = RenderStatus::Rendered;
				Ok(())
			}
			Err(err) => {
				self.status = RenderStatus::Errored;
				Err(err)
			}
		}
	}

	/// Re-renders the last dataset, e.g. after a resize or theme switch.
	/// `Ok(false)` when nothing was rendered yet.
	pub fn redraw(&mut self, theme: ThemeMode) -> Result<bool, RenderError> {
		let Some((dataset, style)) = self.last.take() else {
			return Ok(false);
		};
		let result = self.render(&dataset, &style, theme);
		if self.last.is_none() {
			self.last = Some((dataset, style));
		}
		result.map(|()| true)
	}

	pub fn hover_at(&mut self, x: f64, y: f64) {
		if let Some(chart) = self.current.as_mut() {
			chart.hover_at(x, y);
		}
	}

	pub fn clear_hover(&mut self) {
		if let Some(chart) = self.current.as_mut() {
			chart.clear_hover();
		}
	}

	pub fn export_png(&self, filename: &str) -> Result<(), ExportError> {
		self.current
			.as_ref()
			.ok_or(ExportError::NothingRendered)?
			.export_png(filename)
	}
}

/// Draws on a `<canvas>` attached once the component mounts.
#[derive(Clone, Default)]
pub struct CanvasBackend {
	canvas: Rc<RefCell<Option<HtmlCanvasElement>>>,
}

impl CanvasBackend {
	pub fn attach(&self, canvas: HtmlCanvasElement) {
		*self.canvas.borrow_mut() = Some(canvas);
	}

	pub fn resize(&self, width: f64, height: f64) {
		if let Some(canvas) = self.canvas.borrow().as_ref() {
			canvas.set_width(width.max(0.0) as u32);
			canvas.set_height(height.max(0.0) as u32);
		}
	}
}

impl ChartBackend for CanvasBackend {
	type Chart = CanvasChart;

	fn extent(&self) -> (f64, f64) {
		self.canvas
			.borrow()
			.as_ref()
			.map(|c| (c.width() as f64, c.height() as f64))
			.unwrap_or((0.0, 0.0))
	}

	fn create(&self, spec: ChartSpec) -> Result<CanvasChart, RenderError> {
		let canvas = self.canvas.borrow().clone().ok_or(RenderError::NotMounted)?;
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.map_err(|e| RenderError::Context(format!("{e:?}")))?
			.ok_or_else(|| RenderError::Context("2d context missing".into()))?
			.dyn_into()
			.map_err(|_| RenderError::Context("not a 2d context".into()))?;

		let chart = CanvasChart {
			canvas,
			ctx,
			state: SankeyState::new(spec),
		};
		chart.draw();
		Ok(chart)
	}
}

pub struct CanvasChart {
	canvas: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
	state: SankeyState,
}

impl CanvasChart {
	fn draw(&self) {
		render::render(&self.state, &self.ctx);
	}
}

impl Chart for CanvasChart {
	fn hover_at(&mut self, x: f64, y: f64) {
		// the tooltip follows the pointer, so redraw while anything is lit
		if self.state.hover_at(x, y) || self.state.has_active_highlight() {
			self.draw();
		}
	}

	fn clear_hover(&mut self) {
		if self.state.clear_hover() {
			self.draw();
		}
	}

	fn export_png(&self, filename: &str) -> Result<(), ExportError> {
		export::download_png(&self.canvas, filename)
	}

	fn destroy(&mut self) {
		self.ctx
			.clear_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);
	}
}


#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::recording::RecordingBackend;
	use super::*;

	fn dataset() -> ProjectedDataset {
		vec![FlowTuple {
			source: "A".into(),
			target: "B".into(),
			value: 3.0,
			path: "A -> B -> 3".into(),
		}]
	}

	#[test]
	fn second_render_disposes_the_first_chart_before_building() {
		let backend = RecordingBackend::default();
		let mut renderer = DiagramRenderer::new(backend.clone());
		let style = StyleConfig::default();

		renderer.render(&dataset(), &style, ThemeMode::Light).unwrap();
		renderer.render(&dataset(), &style, ThemeMode::Light).unwrap();

		assert_eq!(*backend.events.borrow(), ["create 0", "destroy 0", "create 1"]);
		assert_eq!(renderer.status(), RenderStatus::Rendered);
	}

	#[test]
	fn failed_construction_reports_errored() {
		let backend = RecordingBackend::default();
		let mut renderer = DiagramRenderer::new(backend.clone());
		backend.fail.set(true);

		let err = renderer
			.render(&dataset(), &StyleConfig::default(), ThemeMode::Light)
			.unwrap_err();
		assert_eq!(err, RenderError::NotMounted);
		assert_eq!(renderer.status(), RenderStatus::Errored);
		assert_eq!(renderer.export_png("x.png"), Err(ExportError::NothingRendered));
	}

	#[test]
	fn style_reaches_the_chart_rescaled() {
		let backend = RecordingBackend::default();
		let mut renderer = DiagramRenderer::new(backend.clone());
		let style = StyleConfig {
			link_opacity: 50.0,
			node_width: 100.0,
			..StyleConfig::default()
		};
		renderer.render(&dataset(), &style, ThemeMode::Dark).unwrap();

		let specs = backend.specs.borrow();
		let spec = &specs[0];
		assert_eq!(spec.style.link_opacity, 0.5);
		assert_eq!(spec.theme, ThemeMode::Dark);
		let a = &spec.layout.nodes[0];
		assert_eq!(a.x1 - a.x0, 80.0);
	}

	#[test]
	fn redraw_reuses_last_dataset() {
		let backend = RecordingBackend::default();
		let mut renderer = DiagramRenderer::new(backend.clone());
		assert_eq!(renderer.redraw(ThemeMode::Light), Ok(false));

		renderer
			.render(&dataset(), &StyleConfig::default(), ThemeMode::Light)
			.unwrap();
		assert_eq!(renderer.redraw(ThemeMode::Dark), Ok(true));
		assert_eq!(backend.created(), 2);
		assert_eq!(backend.specs.borrow()[1].layout.links.len(), 1);
	}

	#[test]
	fn export_needs_a_chart() {
		let backend = RecordingBackend::default();
		let mut renderer = DiagramRenderer::new(backend.clone());
		assert_eq!(renderer.export_png("x.png"), Err(ExportError::NothingRendered));

		renderer
			.render(&dataset(), &StyleConfig::default(), ThemeMode::Light)
			.unwrap();
		renderer.export_png("x.png").unwrap();
		assert_eq!(backend.events.borrow().last().unwrap(), "export 0 x.png");
	}
}
