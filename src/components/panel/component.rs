//! The dashboard block: canvas, status overlay and configuration form.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlCanvasElement, MouseEvent};

use super::form::{ConfigForm, EditHandler};
use crate::components::sankey::{CanvasBackend, EXPORT_FILENAME};
use crate::config::ConfigEdit;
use crate::debounce::TimerDelay;
use crate::host::{HostDataProvider, Subscription, ThemeMode};
use crate::session::{ChartStatus, PanelSession, Spawner};

type Session = Rc<PanelSession<CanvasBackend>>;

/// Sizes the canvas to its container.
fn fit_to_parent(backend: &CanvasBackend, canvas: &HtmlCanvasElement) {
	let (w, h) = canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.unwrap_or((800.0, 600.0));
	backend.resize(w, h);
}

fn pointer(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top())
}

/// Dashboard block: configuration form (while editing) beside the diagram.
#[component]
pub fn SankeyPanel(host: Rc<dyn HostDataProvider>) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let backend = CanvasBackend::default();
	let session: Session = Rc::new(PanelSession::new(host, backend.clone(), TimerDelay));

	let state = RwSignal::new(session.state());
	session.set_listener(move |s| {
		state.try_set(s.clone());
	});

	let spawner: Spawner = Rc::new(|task: LocalBoxFuture<'static, ()>| spawn_local(task));
	let subscriptions = StoredValue::new_local(session.subscribe(spawner));
	on_cleanup(move || subscriptions.update_value(|subs| subs.drain(..).for_each(Subscription::unsubscribe)));

	let (session_init, backend_init) = (session.clone(), backend.clone());
	let resize_cb = StoredValue::new_local(None::<Closure<dyn FnMut()>>);
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		fit_to_parent(&backend_init, &canvas);
		backend_init.attach(canvas.clone());

		let (session_resize, backend_resize) = (session_init.clone(), backend_init.clone());
		let cb = Closure::<dyn FnMut()>::new(move || {
			fit_to_parent(&backend_resize, &canvas);
			session_resize.redraw();
		});
		if let Some(window) = web_sys::window() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		resize_cb.set_value(Some(cb));

		let session = session_init.clone();
		spawn_local(async move { session.start().await });
	});
	on_cleanup(move || {
		resize_cb.update_value(|cb| {
			if let (Some(cb), Some(window)) = (cb.take(), web_sys::window()) {
				let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		});
	});

	let session_mm = session.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (x, y) = pointer(&canvas, &ev);
		session_mm.hover_at(x, y);
	};

	let session_ml = session.clone();
	let on_mouseleave = move |_: MouseEvent| session_ml.clear_hover();

	let session_export = session.clone();
	let on_export = move |_| {
		// failures are logged by the session
		let _ = session_export.export_png(EXPORT_FILENAME);
	};

	let session_dismiss = session.clone();
	let on_dismiss = move |_| session_dismiss.dismiss_warning();

	let session_edit = session.clone();
	let edit: EditHandler = Rc::new(move |change: ConfigEdit| {
		let session = session_edit.clone();
		spawn_local(async move { session.edit(change).await });
	});
	let session_save = session.clone();
	let on_save: Rc<dyn Fn()> = Rc::new(move || {
		let session = session_save.clone();
		spawn_local(async move { session.save().await });
	});
	let session_reset = session;
	let on_reset: Rc<dyn Fn()> = Rc::new(move || {
		let session = session_reset.clone();
		spawn_local(async move { session.reset().await });
	});

	let editing = move || state.with(|s| s.mode.is_editing());
	let warning_text = move || state.with(|s| s.visible_warning().map(ToString::to_string));
	let status = move || match state.with(|s| s.chart.clone()) {
		ChartStatus::Unconfigured => {
			view! { <p class="chart-hint">"Pick a table and three different columns."</p> }.into_any()
		}
		ChartStatus::Failed(message) => view! {
			<p class="chart-error" role="alert">
				"Could not load the chart data: "
				{message}
			</p>
		}
		.into_any(),
		ChartStatus::Rendering | ChartStatus::Rendered { .. } => ().into_any(),
	};
	let dark = move || state.with(|s| s.theme == ThemeMode::Dark);

	view! {
		<div class="sankey-panel" class:dark=dark>
			<div class="chart-area">
				<canvas
					node_ref=canvas_ref
					class="sankey-canvas"
					on:mousemove=on_mousemove
					on:mouseleave=on_mouseleave
					style="display: block;"
				/>
				{status}
			</div>
			<aside class="config-panel" style:display=move || if editing() { "" } else { "none" }>
				<div
					class="mapping-warning"
					role="alert"
					style:display=move || if warning_text().is_some() { "" } else { "none" }
				>
					<span>{move || warning_text().unwrap_or_default()}</span>
					<button type="button" aria-label="Dismiss" on:click=on_dismiss>
						"×"
					</button>
				</div>
				<ConfigForm state=state edit=edit on_save=on_save on_reset=on_reset />
				<button type="button" class="export" on:click=on_export>
					"Export PNG"
				</button>
			</aside>
		</div>
	}
}
