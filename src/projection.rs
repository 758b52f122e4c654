//! Row projection: table rows to `(source, target, value, path)` tuples.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::config::{ColumnMapping, ColumnRole, DataRange};
use crate::error::{MappingError, ProjectionError};
use crate::host::{FieldDescriptor, HostDataProvider};

/// One edge contribution, one per visible row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowTuple {
	pub source: String,
	pub target: String,
	pub value: f64,
	pub path: String,
}

/// Every tuple of one projection run, in row order.
pub type ProjectedDataset = Vec<FlowTuple>;

/// Numeric value of a raw cell string.
///
/// Takes the longest leading decimal number, like a float parse in the
/// browser would; text without one, and non-finite results, count as 0.
pub fn parse_value(raw: &str) -> f64 {
	let text = raw.trim_start();
	let bytes = text.as_bytes();
	let mut end = 0;
	let mut best = None;

	if matches!(bytes.first(), Some(b'+' | b'-')) {
		end = 1;
	}
	let mut seen_digit = false;
	let mut seen_dot = false;
	let mut seen_exp = false;
	while end < bytes.len() {
		match bytes[end] {
			b'0'..=b'9' => {
				seen_digit = true;
				end += 1;
				best = Some(end);
			}
			b'.' if !seen_dot && !seen_exp => {
				seen_dot = true;
				end += 1;
			}
			b'e' | b'E' if seen_digit && !seen_exp => {
				seen_exp = true;
				end += 1;
				if matches!(bytes.get(end), Some(b'+' | b'-')) {
					end += 1;
				}
			}
			_ => break,
		}
	}

	best.and_then(|end| text[..end].parse::<f64>().ok())
		.filter(|v| v.is_finite())
		.unwrap_or(0.0)
}

fn field_name<'a>(fields: &'a [FieldDescriptor], (role, field_id): (ColumnRole, &str)) -> Result<&'a str, MappingError> {
	fields
		.iter()
		.find(|f| f.field_id == field_id)
		.map(|f| f.field_name.as_str())
		.ok_or_else(|| MappingError::UnknownField {
			role,
			field_id: field_id.into(),
		})
}

/// Reads every visible row of `table_id` and builds one [`FlowTuple`] per row.
///
/// The caller guarantees the mapping is complete and pairwise distinct.
/// Rows are not aggregated.
pub async fn project(
	host: &dyn HostDataProvider,
	table_id: &str,
	range: &DataRange,
	mapping: &ColumnMapping,
) -> Result<ProjectedDataset, ProjectionError> {
	let fields = host.fields(table_id, range).await?;
	let record_ids = host.record_ids(table_id, range).await?;

	let [source, target, value] = mapping.roles().map(|role| field_name(&fields, role));
	let (source, target, value) = (source?, target?, value?);

	let mut dataset = Vec::with_capacity(record_ids.len());
	for record_id in &record_ids {
		let mut row: HashMap<&str, String> = HashMap::with_capacity(fields.len());
		for field in &fields {
			let cell = host.cell_string(table_id, &field.field_id, record_id).await?;
			row.insert(field.field_name.as_str(), cell);
		}

		let cell = |name: &str| row.get(name).cloned().unwrap_or_default();
		let (from, to, raw) = (cell(source), cell(target), cell(value));
		dataset.push(FlowTuple {
			path: format!("{from} -> {to} -> {raw}"),
			value: parse_value(&raw),
			source: from,
			target: to,
		});
	}

	debug!("projected {} rows from table {table_id}", dataset.len());
	Ok(dataset)
}
