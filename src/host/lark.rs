//! [`HostDataProvider`] over the `bitable` / `dashboard` globals the base
//! platform injects into the page.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use log::{info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::{
	DashboardMode, FieldDescriptor, FieldType, HostDataProvider, Subscription, TableInfo, ThemeMode,
};
use crate::config::{Configuration, DataRange};
use crate::error::HostError;

#[derive(Deserialize)]
struct FieldMeta {
	id: String,
	name: String,
	#[serde(rename = "type")]
	field_type: i64,
}

#[derive(Deserialize)]
struct DashboardConfig {
	#[serde(rename = "customConfig", default)]
	custom_config: Option<serde_json::Value>,
}

/// Bindings to the base platform's JS SDK.
pub struct LarkHost {
	bitable: JsValue,
	dashboard: JsValue,
	tables: RefCell<HashMap<String, JsValue>>,
}

impl LarkHost {
	/// Looks up the SDK globals on the page.
	pub fn connect() -> Result<Self, HostError> {
		let global = js_sys::global();
		let lookup = |name: &str| {
			Reflect::get(&global, &JsValue::from_str(name))
				.ok()
				.filter(|v| !v.is_undefined() && !v.is_null())
				.ok_or_else(|| HostError::Unavailable(format!("`{name}` is not defined")))
		};
		let host = Self {
			bitable: lookup("bitable")?,
			dashboard: lookup("dashboard")?,
			tables: RefCell::new(HashMap::new()),
		};
		info!("host SDK connected, mode {:?}", host.mode());
		Ok(host)
	}

	async fn table(&self, table_id: &str) -> Result<JsValue, HostError> {
		if let Some(table) = self.tables.borrow().get(table_id) {
			return Ok(table.clone());
		}
		let base = prop(&self.bitable, "base")?;
		let table = call_async(&base, "getTableById", &[JsValue::from_str(table_id)]).await?;
		if table.is_undefined() || table.is_null() {
			return Err(HostError::TableNotFound(table_id.into()));
		}
		self.tables.borrow_mut().insert(table_id.into(), table.clone());
		Ok(table)
	}

	async fn view(&self, table: &JsValue, view_id: &str) -> Result<JsValue, HostError> {
		call_async(table, "getViewById", &[JsValue::from_str(view_id)]).await
	}
}

#[async_trait(?Send)]
impl HostDataProvider for LarkHost {
	fn mode(&self) -> DashboardMode {
		let state = prop(&self.dashboard, "state")
			.ok()
			.and_then(|v| v.as_string())
			.unwrap_or_default();
		match state.as_str() {
			"Config" => DashboardMode::Config,
			"View" => DashboardMode::View,
			"FullScreen" => DashboardMode::FullScreen,
			_ => DashboardMode::Create,
		}
	}

	async fn list_tables(&self) -> Result<Vec<TableInfo>, HostError> {
		let base = prop(&self.bitable, "base")?;
		let tables: Array = call_async(&base, "getTableList", &[])
			.await?
			.dyn_into()
			.map_err(|_| HostError::Payload("getTableList did not return an array".into()))?;

		let mut out = Vec::with_capacity(tables.length() as usize);
		for table in tables.iter() {
			let table_id = prop(&table, "id")?
				.as_string()
				.ok_or_else(|| HostError::Payload("table without id".into()))?;
			let table_name = call_async(&table, "getName", &[])
				.await?
				.as_string()
				.unwrap_or_default();
			self.tables.borrow_mut().insert(table_id.clone(), table);
			out.push(TableInfo {
				table_id,
				table_name,
			});
		}
		Ok(out)
	}

	async fn data_ranges(&self, table_id: &str) -> Result<Vec<DataRange>, HostError> {
		let ranges = call_async(&self.dashboard, "getTableDataRange", &[JsValue::from_str(table_id)]).await?;
		from_js("getTableDataRange", &ranges)
	}

	async fn fields(&self, table_id: &str, range: &DataRange) -> Result<Vec<FieldDescriptor>, HostError> {
		let table = self.table(table_id).await?;
		let metas: Vec<FieldMeta> = from_js(
			"getFieldMetaList",
			&call_async(&table, "getFieldMetaList", &[]).await?,
		)?;

		let visible: Option<Vec<String>> = match range {
			DataRange::All => None,
			DataRange::View { view_id, .. } => {
				let view = self.view(&table, view_id).await?;
				Some(from_js(
					"getVisibleFieldIdList",
					&call_async(&view, "getVisibleFieldIdList", &[]).await?,
				)?)
			}
		};

		Ok(metas
			.into_iter()
			.filter(|m| visible.as_ref().is_none_or(|ids| ids.contains(&m.id)))
			.map(|m| FieldDescriptor {
				field_id: m.id,
				field_name: m.name,
				field_type: FieldType::from(m.field_type),
			})
			.collect())
	}

	async fn record_ids(&self, table_id: &str, range: &DataRange) -> Result<Vec<String>, HostError> {
		let table = self.table(table_id).await?;
		let ids: Vec<Option<String>> = match range {
			DataRange::All => from_js(
				"getRecordIdList",
				&call_async(&table, "getRecordIdList", &[]).await?,
			)?,
			DataRange::View { view_id, .. } => {
				let view = self.view(&table, view_id).await?;
				from_js(
					"getVisibleRecordIdList",
					&call_async(&view, "getVisibleRecordIdList", &[]).await?,
				)?
			}
		};
		Ok(ids.into_iter().flatten().collect())
	}

	async fn cell_string(&self, table_id: &str, field_id: &str, record_id: &str) -> Result<String, HostError> {
		let table = self.table(table_id).await?;
		let cell = call_async(
			&table,
			"getCellString",
			&[JsValue::from_str(field_id), JsValue::from_str(record_id)],
		)
		.await?;
		Ok(cell.as_string().unwrap_or_default())
	}

	async fn load_config(&self) -> Result<Option<Configuration>, HostError> {
		let raw = call_async(&self.dashboard, "getConfig", &[]).await?;
		let config: DashboardConfig = from_js("getConfig", &raw)?;
		match config.custom_config {
			None | Some(serde_json::Value::Null) => Ok(None),
			Some(custom) => serde_json::from_value(custom)
				.map(Some)
				.map_err(|e| HostError::Payload(format!("customConfig: {e}"))),
		}
	}

	async fn save_config(&self, config: &Configuration) -> Result<(), HostError> {
		let payload = serde_json::json!({
			"customConfig": config,
			"dataConditions": [],
		});
		call_async(&self.dashboard, "saveConfig", &[to_js(&payload)?]).await?;
		Ok(())
	}

	fn on_config_change(&self, callback: Box<dyn Fn(Configuration)>) -> Subscription {
		subscribe(&self.dashboard, "onConfigChange", move |event| {
			let custom = prop(&event, "data").and_then(|data| prop(&data, "customConfig"));
			match custom.and_then(|c| from_js::<Configuration>("onConfigChange", &c)) {
				Ok(config) => callback(config),
				Err(err) => warn!("ignoring config change: {err}"),
			}
		})
	}

	fn on_data_change(&self, callback: Box<dyn Fn()>) -> Subscription {
		subscribe(&self.dashboard, "onDataChange", move |_| callback())
	}

	async fn theme(&self) -> Result<ThemeMode, HostError> {
		let bridge = prop(&self.bitable, "bridge")?;
		let theme = call_async(&bridge, "getTheme", &[]).await?;
		Ok(parse_theme(&theme))
	}

	fn on_theme_change(&self, callback: Box<dyn Fn(ThemeMode)>) -> Subscription {
		let Ok(bridge) = prop(&self.bitable, "bridge") else {
			return Subscription::noop();
		};
		subscribe(&bridge, "onThemeChange", move |event| {
			let theme = prop(&event, "data")
				.and_then(|data| prop(&data, "theme"))
				.unwrap_or(JsValue::UNDEFINED);
			callback(parse_theme(&theme));
		})
	}

	fn notify_rendered(&self) {
		if let Err(err) = call(&self.dashboard, "setRendered", &[]) {
			warn!("setRendered: {err}");
		}
	}
}

fn parse_theme(value: &JsValue) -> ThemeMode {
	match value.as_string().as_deref() {
		Some("DARK") => ThemeMode::Dark,
		_ => ThemeMode::Light,
	}
}

fn js_error(call: &'static str, err: JsValue) -> HostError {
	let message = err
		.as_string()
		.or_else(|| {
			Reflect::get(&err, &JsValue::from_str("message"))
				.ok()
				.and_then(|m| m.as_string())
		})
		.unwrap_or_else(|| format!("{err:?}"));
	HostError::Call { call, message }
}

fn prop(target: &JsValue, key: &'static str) -> Result<JsValue, HostError> {
	Reflect::get(target, &JsValue::from_str(key)).map_err(|e| js_error(key, e))
}

fn call(target: &JsValue, method: &'static str, args: &[JsValue]) -> Result<JsValue, HostError> {
	let func: Function = prop(target, method)?
		.dyn_into()
		.map_err(|_| HostError::Unavailable(format!("`{method}` is not a function")))?;
	let argv: Array = args.iter().collect();
	func.apply(target, &argv).map_err(|e| js_error(method, e))
}

async fn call_async(target: &JsValue, method: &'static str, args: &[JsValue]) -> Result<JsValue, HostError> {
	let value = call(target, method, args)?;
	match value.dyn_into::<Promise>() {
		Ok(promise) => JsFuture::from(promise).await.map_err(|e| js_error(method, e)),
		Err(value) => Ok(value),
	}
}

fn from_js<T: DeserializeOwned>(call: &'static str, value: &JsValue) -> Result<T, HostError> {
	if value.is_undefined() {
		return serde_json::from_str("null").map_err(|e| HostError::Payload(format!("{call}: {e}")));
	}
	let text: String = js_sys::JSON::stringify(value)
		.map_err(|e| js_error(call, e))?
		.into();
	serde_json::from_str(&text).map_err(|e| HostError::Payload(format!("{call}: {e}")))
}

fn to_js(value: &serde_json::Value) -> Result<JsValue, HostError> {
	js_sys::JSON::parse(&value.to_string()).map_err(|e| js_error("JSON.parse", e))
}

fn subscribe(target: &JsValue, method: &'static str, handler: impl FnMut(JsValue) + 'static) -> Subscription {
	let closure = Closure::<dyn FnMut(JsValue)>::new(handler);
	let registered = call(target, method, &[closure.as_ref().clone()]);
	match registered {
		Ok(off) => Subscription::new(move || {
			if let Some(off) = off.dyn_ref::<Function>() {
				let _ = off.call0(&JsValue::NULL);
			}
			drop(closure);
		}),
		Err(err) => {
			warn!("{method}: {err}");
			Subscription::new(move || drop(closure))
		}
	}
}
