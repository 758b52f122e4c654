//! Selector options for the current table and range.

use futures::try_join;
use log::debug;

use crate::config::DataRange;
use crate::debounce::Generation;
use crate::error::HostError;
use crate::host::{FieldDescriptor, HostDataProvider};

/// Ranges and categories offered for one table/range pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeOptions {
	pub ranges: Vec<DataRange>,
	pub categories: Vec<FieldDescriptor>,
}

/// Data ranges of `table_id`, always starting with [`DataRange::All`].
pub async fn resolve_ranges(host: &dyn HostDataProvider, table_id: &str) -> Result<Vec<DataRange>, HostError> {
	let mut ranges = vec![DataRange::All];
	for range in host.data_ranges(table_id).await? {
		if !ranges.iter().any(|r| r.same_scope(&range)) {
			ranges.push(range);
		}
	}
	Ok(ranges)
}

/// Columns selectable for `range`: every field for ALL, the view's visible
/// fields otherwise.
pub async fn resolve_categories(
	host: &dyn HostDataProvider,
	table_id: &str,
	range: &DataRange,
) -> Result<Vec<FieldDescriptor>, HostError> {
	host.fields(table_id, range).await
}

/// Resolves options and discards answers that arrive after a newer request.
#[derive(Debug, Default)]
pub struct CategoryResolver {
	latest: Generation,
}

impl CategoryResolver {
	/// `None` when a later `refresh` started before this one finished.
	pub async fn refresh(
		&self,
		host: &dyn HostDataProvider,
		table_id: &str,
		range: &DataRange,
	) -> Option<Result<ScopeOptions, HostError>> {
		let ticket = self.latest.advance();
		let result = try_join!(
			resolve_ranges(host, table_id),
			resolve_categories(host, table_id, range)
		)
		.map(|(ranges, categories)| ScopeOptions { ranges, categories });

		if !ticket.is_current() {
			debug!("discarding stale options for table {table_id}");
			return None;
		}
		Some(result)
	}
}
