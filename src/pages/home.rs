use std::rc::Rc;

use leptos::prelude::*;
use log::error;

use crate::components::panel::SankeyPanel;
use crate::host::{HostDataProvider, LarkHost};

/// The dashboard block, or an explanation when the host SDK is missing.
#[component]
pub fn Home() -> impl IntoView {
	match LarkHost::connect() {
		Ok(host) => {
			let host: Rc<dyn HostDataProvider> = Rc::new(host);
			view! { <SankeyPanel host=host /> }.into_any()
		}
		Err(err) => {
			error!("{err}");
			view! {
				<div class="host-missing">
					<h1>"Uh oh! Something went wrong!"</h1>
					<p>{err.to_string()}</p>
					<p>"This panel has to be opened as a dashboard block."</p>
				</div>
			}
			.into_any()
		}
	}
}
