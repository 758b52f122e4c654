//! Error types for the panel pipeline.

use thiserror::Error;

use crate::config::ColumnRole;

/// Failures reported by the host data provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
	/// A host call rejected or threw.
	#[error("host call `{call}` failed: {message}")]
	Call {
		/// Name of the host method.
		call: &'static str,
		/// Message extracted from the rejection.
		message: String,
	},

	/// The host SDK globals are missing from the page.
	#[error("host SDK unavailable: {0}")]
	Unavailable(String),

	/// The requested table does not exist.
	#[error("table `{0}` not found")]
	TableNotFound(String),

	/// A host payload could not be decoded.
	#[error("malformed host payload: {0}")]
	Payload(String),
}

/// Reasons the three column mappings cannot drive a projection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
	/// No table is selected yet.
	#[error("no table selected")]
	NoTable,

	/// At least one of the three roles has no column.
	#[error("source, target and value columns are not all selected")]
	Incomplete,

	/// Two roles point at the same column.
	#[error("the {first} and {second} columns must be different")]
	Duplicate {
		/// First role sharing the column.
		first: ColumnRole,
		/// Second role sharing the column.
		second: ColumnRole,
	},

	/// A stored column id is not in the current field set.
	#[error("the {role} column `{field_id}` no longer exists, please select it again")]
	UnknownField {
		/// Role whose column vanished.
		role: ColumnRole,
		/// The stale field id.
		field_id: String,
	},
}

impl MappingError {
	/// Whether this state means "not configured yet" rather than a user mistake.
	pub fn is_unconfigured(&self) -> bool {
		matches!(self, MappingError::NoTable | MappingError::Incomplete)
	}
}

/// Failures while turning table rows into flow tuples.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
	/// The column mapping does not resolve against the field set.
	#[error(transparent)]
	Mapping(#[from] MappingError),

	/// A host fetch failed mid-projection.
	#[error(transparent)]
	Host(#[from] HostError),
}

/// Failures constructing a diagram.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
	/// No canvas is attached yet.
	#[error("diagram canvas is not mounted")]
	NotMounted,

	/// The canvas refused to hand out a 2d context.
	#[error("canvas context unavailable: {0}")]
	Context(String),
}

/// Failures exporting the diagram to an image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
	/// Nothing has been rendered yet.
	#[error("no diagram has been rendered")]
	NothingRendered,

	/// The canvas could not be serialised.
	#[error("rasterization failed: {0}")]
	Rasterize(String),

	/// The download link could not be triggered.
	#[error("download failed: {0}")]
	Download(String),
}
