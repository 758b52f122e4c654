//! In-memory host used by the pipeline tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use super::{
	DashboardMode, FieldDescriptor, FieldType, HostDataProvider, Subscription, TableInfo, ThemeMode,
};
use crate::config::{Configuration, DataRange};
use crate::debounce::Delay;
use crate::debounce::testing::ManualDelay;
use crate::error::HostError;

#[derive(Clone, Debug, Default)]
pub struct MemoryView {
	pub id: String,
	pub name: String,
	pub fields: Vec<String>,
	pub records: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
	pub id: String,
	pub name: String,
	pub fields: Vec<FieldDescriptor>,
	pub records: Vec<(String, HashMap<String, String>)>,
	pub views: Vec<MemoryView>,
}

impl MemoryTable {
	pub fn new(id: &str, field_names: &[&str]) -> Self {
		Self {
			id: id.into(),
			name: format!("Table {id}"),
			fields: field_names
				.iter()
				.enumerate()
				.map(|(i, name)| FieldDescriptor {
					field_id: format!("fld{i}"),
					field_name: (*name).into(),
					field_type: FieldType::Text,
				})
				.collect(),
			..Self::default()
		}
	}

	/// Appends a record whose cells follow the field order.
	pub fn row(mut self, cells: &[&str]) -> Self {
		let record_id = format!("rec{}", self.records.len());
		let cells = self
			.fields
			.iter()
			.zip(cells)
			.map(|(f, c)| (f.field_id.clone(), (*c).to_string()))
			.collect();
		self.records.push((record_id, cells));
		self
	}

	pub fn view(mut self, id: &str, fields: &[usize], records: &[usize]) -> Self {
		self.views.push(MemoryView {
			id: id.into(),
			name: format!("View {id}"),
			fields: fields.iter().map(|&i| self.fields[i].field_id.clone()).collect(),
			records: records.iter().map(|&i| self.records[i].0.clone()).collect(),
		});
		self
	}
}

type Listeners<F> = Rc<RefCell<Vec<(usize, Rc<F>)>>>;

fn live<F: ?Sized>(listeners: &Listeners<F>) -> Vec<Rc<F>> {
	listeners.borrow().iter().map(|(_, f)| f.clone()).collect()
}

#[derive(Default)]
pub struct MemoryHost {
	pub mode: Cell<DashboardMode>,
	pub tables: RefCell<Vec<MemoryTable>>,
	pub stored: RefCell<Option<Configuration>>,
	pub saved: RefCell<Vec<Configuration>>,
	pub theme: Cell<ThemeMode>,
	pub fail_cells: Cell<bool>,
	pub cell_reads: Cell<usize>,
	pub rendered: Cell<usize>,
	/// When set, field lookups and configuration loads wait for the delay
	/// to elapse.
	pub gate: RefCell<Option<ManualDelay>>,
	config_listeners: Listeners<dyn Fn(Configuration)>,
	data_listeners: Listeners<dyn Fn()>,
	theme_listeners: Listeners<dyn Fn(ThemeMode)>,
	next_listener: Cell<usize>,
}

impl MemoryHost {
	pub fn with_tables(tables: Vec<MemoryTable>) -> Self {
		Self {
			tables: RefCell::new(tables),
			..Self::default()
		}
	}

	/// Delivers a collaborator's configuration to every live listener.
	pub fn push_remote_config(&self, config: Configuration) {
		for listener in live(&self.config_listeners) {
			listener(config.clone());
		}
	}

	/// Tells every live listener that table data changed.
	pub fn push_data_change(&self) {
		for listener in live(&self.data_listeners) {
			listener();
		}
	}

	/// Switches the theme and tells every live listener.
	pub fn push_theme(&self, theme: ThemeMode) {
		self.theme.set(theme);
		for listener in live(&self.theme_listeners) {
			listener(theme);
		}
	}

	/// Live listeners of any kind.
	pub fn listener_count(&self) -> usize {
		self.config_listeners.borrow().len() + self.data_listeners.borrow().len() + self.theme_listeners.borrow().len()
	}

	fn listen<F: ?Sized + 'static>(&self, listeners: &Listeners<F>, callback: Rc<F>) -> Subscription {
		let id = self.next_listener.get();
		self.next_listener.set(id + 1);
		listeners.borrow_mut().push((id, callback));
		let listeners = listeners.clone();
		Subscription::new(move || listeners.borrow_mut().retain(|(i, _)| *i != id))
	}

	async fn wait_for_gate(&self) {
		let gate = self.gate.borrow().as_ref().map(|delay| delay.sleep(0));
		if let Some(gate) = gate {
			gate.await;
		}
	}

	fn table(&self, table_id: &str) -> Result<MemoryTable, HostError> {
		self.tables
			.borrow()
			.iter()
			.find(|t| t.id == table_id)
			.cloned()
			.ok_or_else(|| HostError::TableNotFound(table_id.into()))
	}

	fn view<'a>(table: &'a MemoryTable, range: &DataRange) -> Result<Option<&'a MemoryView>, HostError> {
		match range {
			DataRange::All => Ok(None),
			DataRange::View { view_id, .. } => table
				.views
				.iter()
				.find(|v| &v.id == view_id)
				.map(Some)
				.ok_or_else(|| HostError::Call {
					call: "getViewById",
					message: format!("view {view_id} not found"),
				}),
		}
	}
}

#[async_trait(?Send)]
impl HostDataProvider for MemoryHost {
	fn mode(&self) -> DashboardMode {
		self.mode.get()
	}

	async fn list_tables(&self) -> Result<Vec<TableInfo>, HostError> {
		Ok(self
			.tables
			.borrow()
			.iter()
			.map(|t| TableInfo {
				table_id: t.id.clone(),
				table_name: t.name.clone(),
			})
			.collect())
	}

	async fn data_ranges(&self, table_id: &str) -> Result<Vec<DataRange>, HostError> {
		let table = self.table(table_id)?;
		Ok(table
			.views
			.iter()
			.map(|v| DataRange::View {
				view_id: v.id.clone(),
				view_name: v.name.clone(),
			})
			.collect())
	}

	async fn fields(&self, table_id: &str, range: &DataRange) -> Result<Vec<FieldDescriptor>, HostError> {
		self.wait_for_gate().await;
		let table = self.table(table_id)?;
		Ok(match Self::view(&table, range)? {
			None => table.fields.clone(),
			Some(view) => table
				.fields
				.iter()
				.filter(|f| view.fields.contains(&f.field_id))
				.cloned()
				.collect(),
		})
	}

	async fn record_ids(&self, table_id: &str, range: &DataRange) -> Result<Vec<String>, HostError> {
		let table = self.table(table_id)?;
		Ok(match Self::view(&table, range)? {
			None => table.records.iter().map(|(id, _)| id.clone()).collect(),
			Some(view) => view.records.clone(),
		})
	}

	async fn cell_string(&self, table_id: &str, field_id: &str, record_id: &str) -> Result<String, HostError> {
		if self.fail_cells.get() {
			return Err(HostError::Call {
				call: "getCellString",
				message: "network unreachable".into(),
			});
		}
		self.cell_reads.set(self.cell_reads.get() + 1);
		let table = self.table(table_id)?;
		Ok(table
			.records
			.iter()
			.find(|(id, _)| id == record_id)
			.and_then(|(_, cells)| cells.get(field_id).cloned())
			.unwrap_or_default())
	}

	async fn load_config(&self) -> Result<Option<Configuration>, HostError> {
		self.wait_for_gate().await;
		Ok(self.stored.borrow().clone())
	}

	async fn save_config(&self, config: &Configuration) -> Result<(), HostError> {
		self.saved.borrow_mut().push(config.clone());
		*self.stored.borrow_mut() = Some(config.clone());
		Ok(())
	}

	fn on_config_change(&self, callback: Box<dyn Fn(Configuration)>) -> Subscription {
		self.listen(&self.config_listeners, Rc::from(callback))
	}

	fn on_data_change(&self, callback: Box<dyn Fn()>) -> Subscription {
		self.listen(&self.data_listeners, Rc::from(callback))
	}

	async fn theme(&self) -> Result<ThemeMode, HostError> {
		Ok(self.theme.get())
	}

	fn on_theme_change(&self, callback: Box<dyn Fn(ThemeMode)>) -> Subscription {
		self.listen(&self.theme_listeners, Rc::from(callback))
	}

	fn notify_rendered(&self) {
		self.rendered.set(self.rendered.get() + 1);
	}
}
