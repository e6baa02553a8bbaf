use leptos::prelude::*;

use crate::components::circuit::CircuitCanvas;

/// Default Home Page: the circuit animation behind a small overlay.
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="hero">
				<CircuitCanvas fullscreen=true />
				<div class="hero-overlay">
					<h1>"Circuit Board"</h1>
					<p class="subtitle">
						"Double-click (or Shift+T) for turbo. Click to switch theme."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
