//! PNG download of the canvas.

use log::error;
use wasm_bindgen::JsCast;
use web_sys::{HtmlAnchorElement, HtmlCanvasElement};

use crate::error::ExportError;

pub const EXPORT_FILENAME: &str = "sankey.png";

/// Rasterizes the canvas and hands it to the browser as a download.
pub fn download_png(canvas: &HtmlCanvasElement, filename: &str) -> Result<(), ExportError> {
	let data_url = canvas
		.to_data_url_with_type("image/png")
		.map_err(|e| ExportError::Rasterize(format!("{e:?}")))?;
	trigger_download(&data_url, filename).inspect_err(|e| error!("{e}"))
}

fn trigger_download(href: &str, filename: &str) -> Result<(), ExportError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| ExportError::Download("document unavailable".into()))?;
	let anchor: HtmlAnchorElement = document
		.create_element("a")
		.map_err(|_| ExportError::Download("unable to create anchor".into()))?
		.dyn_into()
		.map_err(|_| ExportError::Download("anchor cast failed".into()))?;
	anchor.set_href(href);
	anchor.set_download(filename);
	anchor.style().set_property("display", "none").ok();

	let body = document
		.body()
		.ok_or_else(|| ExportError::Download("missing body".into()))?;
	body.append_child(&anchor)
		.map_err(|e| ExportError::Download(format!("{e:?}")))?;
	anchor.click();
	anchor.remove();
	Ok(())
}
