//! One panel instance: configuration, selector options and the diagram,
//! wired to a host.
//!
//! The UI only forwards events here and mirrors [`PanelState`]; every
//! failure ends up as a flag on that state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use log::{debug, error, info, warn};

use crate::components::sankey::{ChartBackend, DiagramRenderer, RenderStatus};
use crate::config::{ConfigEdit, ConfigStore, Configuration, DataRange};
use crate::debounce::{DEBOUNCE_MS, Debouncer, Delay, Generation, Ticket};
use crate::error::{ExportError, HostError, MappingError, ProjectionError};
use crate::host::{DashboardMode, FieldDescriptor, HostDataProvider, Subscription, TableInfo, ThemeMode};
use crate::projection::{ProjectedDataset, project};
use crate::resolver::CategoryResolver;

/// What the diagram area shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChartStatus {
	/// No table or not all three columns chosen.
	#[default]
	Unconfigured,
	Rendering,
	Rendered {
		rows: usize,
	},
	/// A host call or the drawing itself failed; any earlier diagram stays.
	Failed(String),
}

/// Snapshot the UI renders from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PanelState {
	pub mode: DashboardMode,
	pub theme: ThemeMode,
	pub config: Configuration,
	pub tables: Vec<TableInfo>,
	pub ranges: Vec<DataRange>,
	pub categories: Vec<FieldDescriptor>,
	pub chart: ChartStatus,
	pub warning: Option<MappingError>,
	pub warning_dismissed: bool,
}

impl PanelState {
	/// The mapping warning, unless the user closed it.
	pub fn visible_warning(&self) -> Option<&MappingError> {
		self.warning.as_ref().filter(|_| !self.warning_dismissed)
	}

	fn set_warning(&mut self, warning: Option<MappingError>) {
		if self.warning != warning {
			self.warning_dismissed = false;
		}
		self.warning = warning;
	}
}

/// Spawns session work on the caller's executor.
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

pub struct PanelSession<B: ChartBackend> {
	host: Rc<dyn HostDataProvider>,
	store: RefCell<ConfigStore>,
	resolver: CategoryResolver,
	debouncer: Debouncer,
	/// Advanced by every collaborator's configuration.
	remote: Generation,
	renderer: RefCell<DiagramRenderer<B>>,
	drawn_rows: Cell<usize>,
	state: RefCell<PanelState>,
	listener: RefCell<Option<Box<dyn Fn(&PanelState)>>>,
}

impl<B: ChartBackend> PanelSession<B> {
	pub fn new(host: Rc<dyn HostDataProvider>, backend: B, delay: impl Delay + 'static) -> Self {
		Self {
			host,
			store: RefCell::new(ConfigStore::default()),
			resolver: CategoryResolver::default(),
			debouncer: Debouncer::new(delay, DEBOUNCE_MS),
			remote: Generation::default(),
			renderer: RefCell::new(DiagramRenderer::new(backend)),
			drawn_rows: Cell::new(0),
			state: RefCell::new(PanelState::default()),
			listener: RefCell::new(None),
		}
	}

	pub fn state(&self) -> PanelState {
		self.state.borrow().clone()
	}

	/// Called with a fresh snapshot after every state change.
	pub fn set_listener(&self, listener: impl Fn(&PanelState) + 'static) {
		*self.listener.borrow_mut() = Some(Box::new(listener));
	}

	fn update(&self, change: impl FnOnce(&mut PanelState)) {
		change(&mut self.state.borrow_mut());
		let snapshot = self.state.borrow().clone();
		if let Some(listener) = self.listener.borrow().as_ref() {
			listener(&snapshot);
		}
	}

	/// Mirrors the store into the state and flags a duplicate mapping right
	/// away, before any projection is scheduled.
	fn sync_config(&self) {
		let config = self.store.borrow().get().clone();
		let warning = match config.column_mapping() {
			Err(err) if !err.is_unconfigured() => Some(err),
			_ => None,
		};
		self.update(|s| {
			s.config = config;
			s.set_warning(warning);
		});
	}

	/// Loads tables, theme and configuration, then draws once.
	pub async fn start(&self) {
		let mode = self.host.mode();
		self.update(|s| s.mode = mode);

		match self.host.theme().await {
			Ok(theme) => self.update(|s| s.theme = theme),
			Err(err) => warn!("theme unavailable, staying light: {err}"),
		}

		let tables = match self.host.list_tables().await {
			Ok(tables) => tables,
			Err(err) => return self.fail(&err),
		};
		self.store
			.borrow_mut()
			.set_default_table(tables.first().map(|t| t.table_id.clone()));
		self.update(|s| s.tables = tables);

		let loading = self.remote.advance();
		let stored = if mode == DashboardMode::Create {
			None
		} else {
			match self.host.load_config().await {
				Ok(stored) => stored,
				Err(err) => return self.fail(&err),
			}
		};
		if loading.is_current() {
			let mut store = self.store.borrow_mut();
			match stored {
				Some(config) => store.load(config),
				None => {
					store.reset();
				}
			}
		} else {
			debug!("keeping a collaborator's configuration over the persisted one");
		}
		info!("panel started in {mode:?} mode on table `{}`", self.store.borrow().get().table_id);
		self.sync_config();

		self.refresh_scope().await;
		let ticket = self.debouncer.immediate();
		self.refresh(ticket).await;
	}

	/// Applies one form edit; moving to another table or range forgets the
	/// column mappings and reloads the selector options.
	pub async fn edit(&self, edit: ConfigEdit) {
		let scope_changed = {
			let mut store = self.store.borrow_mut();
			let scope_changed = store.get().changes_scope(&edit);
			store.set(edit);
			if scope_changed {
				store.clear_mappings();
			}
			scope_changed
		};
		self.sync_config();

		let pending = self.debouncer.trigger();
		if scope_changed {
			self.refresh_scope().await;
		}
		if let Some(ticket) = pending.await {
			self.refresh(ticket).await;
		}
	}

	/// A collaborator saved a configuration; it replaces ours wholesale.
	pub async fn on_remote_config(&self, config: Configuration) {
		self.remote.advance();
		let scope_changed = self.store.borrow().get().scope_differs(&config);
		self.store.borrow_mut().load(config);
		info!("configuration replaced by a collaborator");
		self.sync_config();

		let ticket = self.debouncer.immediate();
		if scope_changed {
			self.refresh_scope().await;
		}
		self.refresh(ticket).await;
	}

	/// Table data changed underneath us; re-project without waiting.
	pub async fn on_data_changed(&self) {
		let ticket = self.debouncer.immediate();
		self.refresh(ticket).await;
	}

	pub fn on_theme_changed(&self, theme: ThemeMode) {
		self.update(|s| s.theme = theme);
		self.redraw();
	}

	/// Lays the last dataset out again, e.g. after a resize.
	pub fn redraw(&self) {
		let theme = self.state.borrow().theme;
		let result = self.renderer.borrow_mut().redraw(theme);
		if let Err(err) = result {
			error!("redraw failed: {err}");
			self.update(|s| s.chart = ChartStatus::Failed(err.to_string()));
		}
	}

	/// Restores the defaults on the first table and persists them.
	pub async fn reset(&self) {
		self.store.borrow_mut().reset();
		self.sync_config();
		let ticket = self.debouncer.immediate();
		self.refresh_scope().await;
		self.save().await;
		self.refresh(ticket).await;
	}

	pub async fn save(&self) {
		let saving = self.store.borrow().save(self.host.as_ref());
		match saving.await {
			Ok(()) => info!("configuration saved"),
			Err(err) => self.fail(&err),
		}
	}

	pub fn dismiss_warning(&self) {
		self.update(|s| s.warning_dismissed = true);
	}

	pub fn hover_at(&self, x: f64, y: f64) {
		self.renderer.borrow_mut().hover_at(x, y);
	}

	pub fn clear_hover(&self) {
		self.renderer.borrow_mut().clear_hover();
	}

	/// Export problems are logged only; the diagram is unaffected.
	pub fn export_png(&self, filename: &str) -> Result<(), ExportError> {
		self.renderer
			.borrow()
			.export_png(filename)
			.inspect_err(|err| error!("export failed: {err}"))
	}

	async fn refresh_scope(&self) {
		let (table_id, range) = {
			let store = self.store.borrow();
			(store.get().table_id.clone(), store.get().data_range.clone())
		};
		if table_id.is_empty() {
			self.update(|s| {
				s.ranges = vec![DataRange::All];
				s.categories.clear();
			});
			return;
		}

		match self.resolver.refresh(self.host.as_ref(), &table_id, &range).await {
			None => {}
			Some(Ok(options)) => self.update(|s| {
				s.ranges = options.ranges;
				s.categories = options.categories;
			}),
			Some(Err(err)) => self.fail(&err),
		}
	}

	/// Validates, projects and draws, unless `ticket` goes stale meanwhile.
	async fn refresh(&self, ticket: Ticket) {
		let config = self.store.borrow().get().clone();
		let mapping = match config.column_mapping() {
			Ok(mapping) => mapping,
			Err(err) => return self.report_mapping(err),
		};

		self.update(|s| s.chart = ChartStatus::Rendering);
		let result = project(self.host.as_ref(), &config.table_id, &config.data_range, &mapping).await;
		if !ticket.is_current() {
			debug!("discarding projection for a superseded configuration");
			return;
		}

		match result {
			Ok(dataset) => self.draw(&dataset, &config),
			Err(ProjectionError::Mapping(err)) => self.report_mapping(err),
			Err(ProjectionError::Host(err)) => self.fail(&err),
		}
	}

	fn draw(&self, dataset: &ProjectedDataset, config: &Configuration) {
		let theme = self.state.borrow().theme;
		let result = self.renderer.borrow_mut().render(dataset, &config.style, theme);
		match result {
			Ok(()) => {
				let rows = dataset.len();
				self.drawn_rows.set(rows);
				self.update(|s| {
					s.chart = ChartStatus::Rendered { rows };
					s.set_warning(None);
				});
				self.host.notify_rendered();
			}
			Err(err) => {
				error!("diagram construction failed: {err}");
				self.update(|s| s.chart = ChartStatus::Failed(err.to_string()));
			}
		}
	}

	/// Rendering is suppressed; whatever is on screen stays.
	fn report_mapping(&self, err: MappingError) {
		let chart = match self.renderer.borrow().status() {
			RenderStatus::Rendered => ChartStatus::Rendered {
				rows: self.drawn_rows.get(),
			},
			_ => ChartStatus::Unconfigured,
		};
		let warning = if err.is_unconfigured() {
			None
		} else {
			warn!("not drawing: {err}");
			Some(err)
		};
		self.update(|s| {
			s.chart = chart;
			s.set_warning(warning);
		});
	}

	fn fail(&self, err: &HostError) {
		error!("{err}");
		self.update(|s| s.chart = ChartStatus::Failed(err.to_string()));
	}
}

impl<B: ChartBackend + 'static> PanelSession<B> {
	/// Subscribes to host notifications. Dropping the handles detaches the
	/// session again.
	pub fn subscribe(self: &Rc<Self>, spawn: Spawner) -> Vec<Subscription> {
		let weak = Rc::downgrade(self);

		let on_config = {
			let (weak, spawn) = (weak.clone(), spawn.clone());
			self.host.on_config_change(Box::new(move |config| {
				if let Some(session) = weak.upgrade() {
					spawn(Box::pin(async move { session.on_remote_config(config).await }));
				}
			}))
		};
		let on_data = {
			let weak = weak.clone();
			self.host.on_data_change(Box::new(move || {
				if let Some(session) = weak.upgrade() {
					spawn(Box::pin(async move { session.on_data_changed().await }));
				}
			}))
		};
		let on_theme = self.host.on_theme_change(Box::new(move |theme| {
			if let Some(session) = weak.upgrade() {
				session.on_theme_changed(theme);
			}
		}));

		vec![on_config, on_data, on_theme]
	}
}
