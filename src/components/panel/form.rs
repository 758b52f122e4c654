//! Configuration controls; each change is sent as one [`ConfigEdit`].

use std::rc::Rc;

use leptos::prelude::*;

use crate::components::sankey::theme::PALETTES;
use crate::config::{ColumnRole, ConfigEdit, Configuration, DataRange, NodeAlign, StyleConfig, TextWeight};
use crate::session::PanelState;

/// Emits one edit per changed control.
pub type EditHandler = Rc<dyn Fn(ConfigEdit)>;

const PALETTE_NAMES: [&str; PALETTES.len()] = ["Warm", "Soft", "Category"];

fn column_of(config: &Configuration, role: ColumnRole) -> Option<&str> {
	match role {
		ColumnRole::Source => config.source_column.as_deref(),
		ColumnRole::Target => config.target_column.as_deref(),
		ColumnRole::Value => config.value_column.as_deref(),
	}
}

fn column_edit(role: ColumnRole, field_id: Option<String>) -> ConfigEdit {
	match role {
		ColumnRole::Source => ConfigEdit::SourceColumn(field_id),
		ColumnRole::Target => ConfigEdit::TargetColumn(field_id),
		ColumnRole::Value => ConfigEdit::ValueColumn(field_id),
	}
}

fn column_select(label: &'static str, role: ColumnRole, state: RwSignal<PanelState>, edit: EditHandler) -> impl IntoView {
	let options = move || {
		state.with(|s| {
			let selected = column_of(&s.config, role).unwrap_or_default().to_string();
			s.categories
				.iter()
				.map(|f| {
					view! {
						<option value=f.field_id.clone() selected=f.field_id == selected>
							{format!("{} {}", f.field_type.badge(), f.field_name)}
						</option>
					}
				})
				.collect_view()
		})
	};

	view! {
		<label class="form-row">
			<span>{label}</span>
			<select
				prop:value=move || state.with(|s| column_of(&s.config, role).unwrap_or_default().to_string())
				on:change=move |ev| {
					let value = event_target_value(&ev);
					edit(column_edit(role, Some(value).filter(|v| !v.is_empty())));
				}
			>
				<option value="">"Select a column"</option>
				{options}
			</select>
		</label>
	}
}

fn number_input(
	label: &'static str,
	max: f64,
	read: fn(&StyleConfig) -> f64,
	make: fn(f64) -> ConfigEdit,
	state: RwSignal<PanelState>,
	edit: EditHandler,
) -> impl IntoView {
	view! {
		<label class="form-row">
			<span>{label}</span>
			<input
				type="number"
				min="0"
				max=max.to_string()
				prop:value=move || state.with(|s| read(&s.config.style).to_string())
				on:input=move |ev| {
					if let Ok(value) = event_target_value(&ev).parse::<f64>() {
						edit(make(value));
					}
				}
			/>
		</label>
	}
}

/// Table, range, column and style controls plus save/reset.
#[component]
pub fn ConfigForm(
	state: RwSignal<PanelState>,
	edit: EditHandler,
	on_save: Rc<dyn Fn()>,
	on_reset: Rc<dyn Fn()>,
) -> impl IntoView {
	let table_options = move || {
		state.with(|s| {
			s.tables
				.iter()
				.map(|t| {
					view! {
						<option value=t.table_id.clone() selected=t.table_id == s.config.table_id>
							{t.table_name.clone()}
						</option>
					}
				})
				.collect_view()
		})
	};
	let range_options = move || {
		state.with(|s| {
			s.ranges
				.iter()
				.map(|r| {
					let label = match r {
						DataRange::All => "All records".to_string(),
						DataRange::View { view_name, .. } => view_name.clone(),
					};
					view! {
						<option value=r.key().to_string() selected=r.same_scope(&s.config.data_range)>
							{label}
						</option>
					}
				})
				.collect_view()
		})
	};

	let edit_table = edit.clone();
	let edit_range = edit.clone();
	let edit_theme = edit.clone();
	let edit_weight = edit.clone();
	let edit_align = edit.clone();
	let edit_color = edit.clone();
	let edit_show = edit.clone();

	view! {
		<form class="config-form" on:submit=|ev| ev.prevent_default()>
			<label class="form-row">
				<span>"Data source"</span>
				<select
					prop:value=move || state.with(|s| s.config.table_id.clone())
					on:change=move |ev| edit_table(ConfigEdit::Table(event_target_value(&ev)))
				>
					{table_options}
				</select>
			</label>
			<label class="form-row">
				<span>"Data range"</span>
				<select
					prop:value=move || state.with(|s| s.config.data_range.key().to_string())
					on:change=move |ev| {
						let key = event_target_value(&ev);
						let range = state.with_untracked(|s| s.ranges.iter().find(|r| r.key() == key).cloned());
						if let Some(range) = range {
							edit_range(ConfigEdit::DataRange(range));
						}
					}
				>
					{range_options}
				</select>
			</label>

			{column_select("Source", ColumnRole::Source, state, edit.clone())}
			{column_select("Target", ColumnRole::Target, state, edit.clone())}
			{column_select("Value", ColumnRole::Value, state, edit.clone())}

			<label class="form-row">
				<span>"Color theme"</span>
				<select
					prop:value=move || state.with(|s| s.config.style.color_theme.to_string())
					on:change=move |ev| {
						if let Ok(index) = event_target_value(&ev).parse() {
							edit_theme(ConfigEdit::ColorTheme(index));
						}
					}
				>
					{PALETTE_NAMES
						.into_iter()
						.enumerate()
						.map(|(i, name)| view! { <option value=i.to_string()>{name}</option> })
						.collect_view()}
				</select>
			</label>

			{number_input("Node width", 1000.0, |s: &StyleConfig| s.node_width, ConfigEdit::NodeWidth, state, edit.clone())}
			{number_input(
				"Node spacing",
				1000.0,
				|s: &StyleConfig| s.node_padding_ratio,
				ConfigEdit::NodePaddingRatio,
				state,
				edit.clone(),
			)}
			{number_input("Node opacity", 100.0, |s: &StyleConfig| s.node_opacity, ConfigEdit::NodeOpacity, state, edit.clone())}
			{number_input("Link opacity", 100.0, |s: &StyleConfig| s.link_opacity, ConfigEdit::LinkOpacity, state, edit.clone())}
			{number_input("Label size", 100.0, |s: &StyleConfig| s.text_size, ConfigEdit::TextSize, state, edit)}

			<label class="form-row">
				<span>"Label weight"</span>
				<select
					prop:value=move || state.with(|s| s.config.style.text_weight.as_str())
					on:change=move |ev| {
						if let Some(weight) = TextWeight::parse(&event_target_value(&ev)) {
							edit_weight(ConfigEdit::TextWeight(weight));
						}
					}
				>
					{TextWeight::ALL
						.into_iter()
						.map(|w| view! { <option value=w.as_str()>{w.as_str()}</option> })
						.collect_view()}
				</select>
			</label>
			<label class="form-row">
				<span>"Node alignment"</span>
				<select
					prop:value=move || state.with(|s| s.config.style.node_align.as_str())
					on:change=move |ev| {
						if let Some(align) = NodeAlign::parse(&event_target_value(&ev)) {
							edit_align(ConfigEdit::NodeAlign(align));
						}
					}
				>
					{NodeAlign::ALL
						.into_iter()
						.map(|a| view! { <option value=a.as_str()>{a.as_str()}</option> })
						.collect_view()}
				</select>
			</label>
			<label class="form-row">
				<span>"Label color"</span>
				<input
					type="color"
					prop:value=move || state.with(|s| s.config.style.text_color.clone())
					on:input=move |ev| edit_color(ConfigEdit::TextColor(event_target_value(&ev)))
				/>
			</label>
			<label class="form-row">
				<span>"Show node values"</span>
				<input
					type="checkbox"
					prop:checked=move || state.with(|s| s.config.style.show_node_value)
					on:change=move |ev| edit_show(ConfigEdit::ShowNodeValue(event_target_checked(&ev)))
				/>
			</label>

			<div class="form-actions">
				<button type="button" on:click=move |_| on_save()>"Save"</button>
				<button type="button" on:click=move |_| on_reset()>"Reset"</button>
			</div>
		</form>
	}
}
