//! Panel configuration: the single value the form edits, the host persists
//! and the projection pipeline reads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HostError, MappingError};
use crate::host::HostDataProvider;

/// Which rows and fields of a table feed the diagram.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataRange {
	/// Every record and field of the table.
	#[default]
	#[serde(rename = "ALL")]
	All,
	/// Only what a filtered view shows.
	#[serde(rename = "VIEW")]
	View {
		/// View identifier.
		#[serde(rename = "viewId")]
		view_id: String,
		/// Display name, informational only.
		#[serde(rename = "viewName", default)]
		view_name: String,
	},
}

impl DataRange {
	/// Stable key for selectors: `"ALL"` or the view id.
	pub fn key(&self) -> &str {
		match self {
			DataRange::All => "ALL",
			DataRange::View { view_id, .. } => view_id,
		}
	}

	/// Two ranges select the same rows when their keys match.
	pub fn same_scope(&self, other: &DataRange) -> bool {
		self.key() == other.key()
	}
}

/// Column alignment of nodes without outgoing (or incoming) links.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAlign {
	/// Nodes sit at their depth from the sources.
	Left,
	/// Nodes sit at their distance from the sinks.
	#[default]
	Right,
	/// Sources and sinks hug their neighbours.
	Center,
	/// Sinks are pushed to the last column.
	Justify,
}

impl NodeAlign {
	/// All alignments, in selector order.
	pub const ALL: [NodeAlign; 4] = [
		NodeAlign::Right,
		NodeAlign::Left,
		NodeAlign::Center,
		NodeAlign::Justify,
	];

	/// Persisted / selector value.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeAlign::Left => "left",
			NodeAlign::Right => "right",
			NodeAlign::Center => "center",
			NodeAlign::Justify => "justify",
		}
	}

	/// Parses a selector value.
	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|a| a.as_str() == value)
	}
}

/// Label font weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextWeight {
	/// Regular weight.
	#[default]
	Normal,
	/// Heavier than the inherited weight.
	Bolder,
	/// Lighter than the inherited weight.
	Lighter,
}

impl TextWeight {
	/// All weights, in selector order.
	pub const ALL: [TextWeight; 3] = [TextWeight::Normal, TextWeight::Bolder, TextWeight::Lighter];

	/// CSS `font-weight` keyword.
	pub fn as_str(self) -> &'static str {
		match self {
			TextWeight::Normal => "normal",
			TextWeight::Bolder => "bolder",
			TextWeight::Lighter => "lighter",
		}
	}

	/// Parses a selector value.
	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|w| w.as_str() == value)
	}
}

/// Visual parameters, stored on the user-facing scales.
///
/// `node_width` and `node_padding_ratio` are per mille of the diagram
/// extent, opacities are percentages. The renderer rescales them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
	pub node_align: NodeAlign,
	pub node_width: f64,
	pub node_padding_ratio: f64,
	pub node_opacity: f64,
	pub link_opacity: f64,
	pub text_size: f64,
	pub text_weight: TextWeight,
	pub text_color: String,
	#[serde(rename = "selectedTheme")]
	pub color_theme: usize,
	pub show_node_value: bool,
}

impl Default for StyleConfig {
	fn default() -> Self {
		Self {
			node_align: NodeAlign::Right,
			node_width: 20.0,
			node_padding_ratio: 80.0,
			node_opacity: 100.0,
			link_opacity: 80.0,
			text_size: 15.0,
			text_weight: TextWeight::Normal,
			text_color: "#000000".into(),
			color_theme: 0,
			show_node_value: false,
		}
	}
}

/// Everything the user selected for one panel instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
	pub table_id: String,
	pub data_range: DataRange,
	#[serde(rename = "source_col")]
	pub source_column: Option<String>,
	#[serde(rename = "target_col")]
	pub target_column: Option<String>,
	#[serde(rename = "value_col")]
	pub value_column: Option<String>,
	#[serde(flatten)]
	pub style: StyleConfig,
}

/// A diagram role a column can be mapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnRole {
	/// Flow origin.
	Source,
	/// Flow destination.
	Target,
	/// Flow weight.
	Value,
}

impl fmt::Display for ColumnRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ColumnRole::Source => "source",
			ColumnRole::Target => "target",
			ColumnRole::Value => "value",
		})
	}
}

/// Three distinct field ids, one per role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
	pub source: String,
	pub target: String,
	pub value: String,
}

impl ColumnMapping {
	/// Field ids paired with their roles.
	pub fn roles(&self) -> [(ColumnRole, &str); 3] {
		[
			(ColumnRole::Source, self.source.as_str()),
			(ColumnRole::Target, self.target.as_str()),
			(ColumnRole::Value, self.value.as_str()),
		]
	}
}

/// A single form edit. The form emits one of these per changed control.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigEdit {
	Table(String),
	DataRange(DataRange),
	SourceColumn(Option<String>),
	TargetColumn(Option<String>),
	ValueColumn(Option<String>),
	NodeAlign(NodeAlign),
	NodeWidth(f64),
	NodePaddingRatio(f64),
	NodeOpacity(f64),
	LinkOpacity(f64),
	TextSize(f64),
	TextWeight(TextWeight),
	TextColor(String),
	ColorTheme(usize),
	ShowNodeValue(bool),
}

impl Configuration {
	/// Shallow-merges one edit. No validation happens here.
	pub fn apply(&mut self, edit: ConfigEdit) {
		let style = &mut self.style;
		match edit {
			ConfigEdit::Table(id) => self.table_id = id,
			ConfigEdit::DataRange(range) => self.data_range = range,
			ConfigEdit::SourceColumn(id) => self.source_column = id,
			ConfigEdit::TargetColumn(id) => self.target_column = id,
			ConfigEdit::ValueColumn(id) => self.value_column = id,
			ConfigEdit::NodeAlign(align) => style.node_align = align,
			ConfigEdit::NodeWidth(v) => style.node_width = v,
			ConfigEdit::NodePaddingRatio(v) => style.node_padding_ratio = v,
			ConfigEdit::NodeOpacity(v) => style.node_opacity = v,
			ConfigEdit::LinkOpacity(v) => style.link_opacity = v,
			ConfigEdit::TextSize(v) => style.text_size = v,
			ConfigEdit::TextWeight(w) => style.text_weight = w,
			ConfigEdit::TextColor(c) => style.text_color = c,
			ConfigEdit::ColorTheme(i) => style.color_theme = i,
			ConfigEdit::ShowNodeValue(b) => style.show_node_value = b,
		}
	}

	/// Whether `edit` would move this configuration to another table or range.
	pub fn changes_scope(&self, edit: &ConfigEdit) -> bool {
		match edit {
			ConfigEdit::Table(id) => *id != self.table_id,
			ConfigEdit::DataRange(range) => !range.same_scope(&self.data_range),
			_ => false,
		}
	}

	/// Whether `other` reads from a different table or range.
	pub fn scope_differs(&self, other: &Configuration) -> bool {
		self.table_id != other.table_id || !self.data_range.same_scope(&other.data_range)
	}

	/// Forgets the three column mappings.
	pub fn clear_mappings(&mut self) {
		self.source_column = None;
		self.target_column = None;
		self.value_column = None;
	}

	/// The mapping, if a table and three pairwise distinct columns are set.
	pub fn column_mapping(&self) -> Result<ColumnMapping, MappingError> {
		if self.table_id.is_empty() {
			return Err(MappingError::NoTable);
		}
		let (Some(source), Some(target), Some(value)) = (
			self.source_column.as_deref(),
			self.target_column.as_deref(),
			self.value_column.as_deref(),
		) else {
			return Err(MappingError::Incomplete);
		};
		if [source, target, value].iter().any(|id| id.is_empty()) {
			return Err(MappingError::Incomplete);
		}

		let duplicate = |first, second| Err(MappingError::Duplicate { first, second });
		if source == target {
			return duplicate(ColumnRole::Source, ColumnRole::Target);
		}
		if source == value {
			return duplicate(ColumnRole::Source, ColumnRole::Value);
		}
		if target == value {
			return duplicate(ColumnRole::Target, ColumnRole::Value);
		}

		Ok(ColumnMapping {
			source: source.into(),
			target: target.into(),
			value: value.into(),
		})
	}
}

/// Owner of the one live [`Configuration`].
#[derive(Debug, Default)]
pub struct ConfigStore {
	current: Configuration,
	default_table: Option<String>,
}

impl ConfigStore {
	pub fn get(&self) -> &Configuration {
		&self.current
	}

	pub fn set(&mut self, edit: ConfigEdit) {
		self.current.apply(edit);
	}

	/// Drops the column mappings, which name fields of the old table or range.
	pub fn clear_mappings(&mut self) {
		self.current.clear_mappings();
	}

	/// Table selected by [`reset`](Self::reset).
	pub fn set_default_table(&mut self, table_id: Option<String>) {
		self.default_table = table_id;
	}

	/// Restores the built-in defaults on the default table.
	pub fn reset(&mut self) -> &Configuration {
		self.current = Configuration {
			table_id: self.default_table.clone().unwrap_or_default(),
			..Configuration::default()
		};
		&self.current
	}

	/// Replaces the whole value, last writer wins.
	pub fn load(&mut self, config: Configuration) {
		self.current = config;
	}

	/// Persists a snapshot of the current value; edits made while the host
	/// is saving are not part of it.
	pub fn save<'h>(&self, host: &'h dyn HostDataProvider) -> impl Future<Output = Result<(), HostError>> + use<'h> {
		let config = self.current.clone();
		async move { host.save_config(&config).await }
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn mapped(source: &str, target: &str, value: &str) -> Configuration {
		Configuration {
			table_id: "tbl".into(),
			source_column: Some(source.into()),
			target_column: Some(target.into()),
			value_column: Some(value.into()),
			..Configuration::default()
		}
	}

	#[test]
	fn restores_legacy_blob_and_defaults_missing_fields() {
		let blob = r##"{
			"tableId": "tblA",
			"source_col": "fld1",
			"target_col": null,
			"value_col": "fld3",
			"nodeWidth": 15,
			"linkOpacity": 40,
			"textWeight": "bolder",
			"nodeAlign": "justify",
			"textColor": "#ff0000",
			"selectedTheme": 2
		}"##;
		let config: Configuration = serde_json::from_str(blob).unwrap();

		assert_eq!(config.table_id, "tblA");
		assert_eq!(config.data_range, DataRange::All);
		assert_eq!(config.source_column.as_deref(), Some("fld1"));
		assert_eq!(config.target_column, None);
		assert_eq!(config.style.node_width, 15.0);
		assert_eq!(config.style.node_padding_ratio, 80.0);
		assert_eq!(config.style.link_opacity, 40.0);
		assert_eq!(config.style.node_opacity, 100.0);
		assert_eq!(config.style.text_weight, TextWeight::Bolder);
		assert_eq!(config.style.node_align, NodeAlign::Justify);
		assert_eq!(config.style.color_theme, 2);
		assert!(!config.style.show_node_value);
	}

	#[test]
	fn persists_flat_layout() {
		let mut config = mapped("a", "b", "c");
		config.data_range = DataRange::View {
			view_id: "vew1".into(),
			view_name: "Open".into(),
		};
		let value = serde_json::to_value(&config).unwrap();

		assert_eq!(value["source_col"], "a");
		assert_eq!(value["nodePaddingRatio"], 80.0);
		assert_eq!(value["selectedTheme"], 0);
		assert_eq!(value["dataRange"]["type"], "VIEW");
		assert_eq!(value["dataRange"]["viewId"], "vew1");

		let back: Configuration = serde_json::from_value(value).unwrap();
		assert_eq!(back, config);
	}

	#[test]
	fn apply_touches_only_the_edited_field() {
		let mut config = mapped("a", "b", "c");
		let before = config.clone();
		config.apply(ConfigEdit::LinkOpacity(30.0));

		assert_eq!(config.style.link_opacity, 30.0);
		assert_eq!(config.source_column, before.source_column);
		assert_eq!(config.style.node_width, before.style.node_width);
	}

	#[test]
	fn every_coinciding_pair_is_rejected() {
		let cases = [
			(("x", "x", "v"), ColumnRole::Source, ColumnRole::Target),
			(("x", "t", "x"), ColumnRole::Source, ColumnRole::Value),
			(("s", "x", "x"), ColumnRole::Target, ColumnRole::Value),
			(("x", "x", "x"), ColumnRole::Source, ColumnRole::Target),
		];
		for ((s, t, v), first, second) in cases {
			assert_eq!(
				mapped(s, t, v).column_mapping(),
				Err(MappingError::Duplicate { first, second })
			);
		}
	}

	#[test]
	fn incomplete_or_tableless_is_unconfigured() {
		let mut config = mapped("a", "b", "c");
		config.value_column = None;
		let err = config.column_mapping().unwrap_err();
		assert_eq!(err, MappingError::Incomplete);
		assert!(err.is_unconfigured());

		let tableless = Configuration::default();
		assert_eq!(tableless.column_mapping(), Err(MappingError::NoTable));
	}

	#[test]
	fn distinct_columns_map() {
		let mapping = mapped("a", "b", "c").column_mapping().unwrap();
		assert_eq!(mapping.source, "a");
		assert_eq!(mapping.target, "b");
		assert_eq!(mapping.value, "c");
	}

	#[test]
	fn scope_changes_are_detected() {
		let config = mapped("a", "b", "c");
		assert!(config.changes_scope(&ConfigEdit::Table("other".into())));
		assert!(!config.changes_scope(&ConfigEdit::Table("tbl".into())));
		assert!(config.changes_scope(&ConfigEdit::DataRange(DataRange::View {
			view_id: "v".into(),
			view_name: String::new(),
		})));
		assert!(!config.changes_scope(&ConfigEdit::DataRange(DataRange::All)));
		assert!(!config.changes_scope(&ConfigEdit::TextSize(12.0)));
	}

	#[test]
	fn reset_keeps_only_default_table() {
		let mut store = ConfigStore::default();
		store.load(mapped("a", "b", "c"));
		store.set(ConfigEdit::TextSize(30.0));
		store.set_default_table(Some("first".into()));

		let reset = store.reset().clone();
		assert_eq!(
			reset,
			Configuration {
				table_id: "first".into(),
				..Configuration::default()
			}
		);
	}
}
