//! The host platform seen as an injected capability.
//!
//! Every component receives a `&dyn HostDataProvider` instead of reaching
//! for the page globals, so tests run against [`memory::MemoryHost`].

mod lark;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Configuration, DataRange};
use crate::error::HostError;

pub use lark::LarkHost;

/// A table offered in the source selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
	pub table_id: String,
	pub table_name: String,
}

/// Host field types the selectors distinguish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FieldType {
	Text,
	Number,
	SingleSelect,
	MultiSelect,
	DateTime,
	Checkbox,
	User,
	Phone,
	Url,
	Email,
	Other(i64),
}

impl From<i64> for FieldType {
	fn from(code: i64) -> Self {
		match code {
			1 => FieldType::Text,
			2 => FieldType::Number,
			3 => FieldType::SingleSelect,
			4 => FieldType::MultiSelect,
			5 => FieldType::DateTime,
			7 => FieldType::Checkbox,
			11 => FieldType::User,
			13 => FieldType::Phone,
			15 => FieldType::Url,
			99005 => FieldType::Email,
			other => FieldType::Other(other),
		}
	}
}

impl From<FieldType> for i64 {
	fn from(kind: FieldType) -> Self {
		match kind {
			FieldType::Text => 1,
			FieldType::Number => 2,
			FieldType::SingleSelect => 3,
			FieldType::MultiSelect => 4,
			FieldType::DateTime => 5,
			FieldType::Checkbox => 7,
			FieldType::User => 11,
			FieldType::Phone => 13,
			FieldType::Url => 15,
			FieldType::Email => 99005,
			FieldType::Other(code) => code,
		}
	}
}

impl FieldType {
	/// Short glyph shown in front of the field name in selectors.
	pub fn badge(self) -> &'static str {
		match self {
			FieldType::Text => "Aa",
			FieldType::Number => "#",
			FieldType::SingleSelect | FieldType::MultiSelect => "☰",
			FieldType::DateTime => "◷",
			FieldType::Checkbox => "☑",
			FieldType::User => "@",
			FieldType::Phone => "☏",
			FieldType::Url => "⛓",
			FieldType::Email => "✉",
			FieldType::Other(_) => "·",
		}
	}
}

/// A column of the selected table or view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
	pub field_id: String,
	pub field_name: String,
	pub field_type: FieldType,
}

/// Where the dashboard block currently lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DashboardMode {
	/// First configuration of a freshly added block.
	#[default]
	Create,
	/// Editing an existing block.
	Config,
	/// Read-only dashboard.
	View,
	/// Read-only, maximised.
	FullScreen,
}

impl DashboardMode {
	/// Whether the configuration form is shown.
	pub fn is_editing(self) -> bool {
		matches!(self, DashboardMode::Create | DashboardMode::Config)
	}
}

/// Ambient light/dark theme of the host page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
	#[default]
	Light,
	Dark,
}

/// Live host subscription; unsubscribes exactly once, explicitly or on drop.
pub struct Subscription {
	off: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub fn new(off: impl FnOnce() + 'static) -> Self {
		Self {
			off: Some(Box::new(off)),
		}
	}

	/// A subscription with nothing to tear down.
	pub fn noop() -> Self {
		Self { off: None }
	}

	pub fn unsubscribe(mut self) {
		self.release();
	}

	fn release(&mut self) {
		if let Some(off) = self.off.take() {
			off();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release();
	}
}

/// Table access, configuration persistence and change notifications.
#[async_trait(?Send)]
pub trait HostDataProvider {
	fn mode(&self) -> DashboardMode;

	async fn list_tables(&self) -> Result<Vec<TableInfo>, HostError>;

	/// Data ranges the host offers for `table_id`.
	async fn data_ranges(&self, table_id: &str) -> Result<Vec<DataRange>, HostError>;

	/// Field set of the table, or the view's visible fields.
	async fn fields(&self, table_id: &str, range: &DataRange) -> Result<Vec<FieldDescriptor>, HostError>;

	/// Record ids of the table, or the view's visible records, in display order.
	async fn record_ids(&self, table_id: &str, range: &DataRange) -> Result<Vec<String>, HostError>;

	/// String representation of one cell.
	async fn cell_string(&self, table_id: &str, field_id: &str, record_id: &str) -> Result<String, HostError>;

	/// Persisted configuration, `None` when the block was never saved.
	async fn load_config(&self) -> Result<Option<Configuration>, HostError>;

	async fn save_config(&self, config: &Configuration) -> Result<(), HostError>;

	/// Fires with the new configuration when a collaborator saves one.
	fn on_config_change(&self, callback: Box<dyn Fn(Configuration)>) -> Subscription;

	/// Fires when the underlying table data changes.
	fn on_data_change(&self, callback: Box<dyn Fn()>) -> Subscription;

	async fn theme(&self) -> Result<ThemeMode, HostError>;

	fn on_theme_change(&self, callback: Box<dyn Fn(ThemeMode)>) -> Subscription;

	/// Tells the host the block finished drawing.
	fn notify_rendered(&self);
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use super::*;

	#[test]
	fn subscription_releases_once() {
		let calls = Rc::new(Cell::new(0));
		let counter = calls.clone();
		let sub = Subscription::new(move || counter.set(counter.get() + 1));
		sub.unsubscribe();
		assert_eq!(calls.get(), 1);

		let counter = calls.clone();
		drop(Subscription::new(move || counter.set(counter.get() + 1)));
		assert_eq!(calls.get(), 2);
	}

	#[test]
	fn field_type_codes() {
		let field: FieldDescriptor =
			serde_json::from_str(r#"{"fieldId":"f","fieldName":"Amount","fieldType":2}"#).unwrap();
		assert_eq!(field.field_type, FieldType::Number);
		assert_eq!(FieldType::from(42), FieldType::Other(42));
		assert_eq!(i64::from(FieldType::Url), 15);
	}
}
