use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

use super::render::{self, CanvasSurface};
use super::rng::JsRandom;
use super::state::CircuitState;

/// How long a click's theme toggle is deferred; a second click inside this
/// window turns the pair into a double-click and cancels the toggle.
const CLICK_DEBOUNCE_MS: f64 = 500.0;

/// Pending deferred theme toggle, keyed by its timeout handle.
///
/// The browser delivers a double-click as click, click, dblclick. The theme
/// toggle is held back for the debounce window and dropped as soon as a
/// second click (or the dblclick itself) arrives, so the turbo gesture never
/// flips the theme on its way in.
#[derive(Default)]
struct ClickState {
	pending: Option<i32>,
}

enum ClickAction {
	Defer,
	CancelPending(i32),
}

impl ClickState {
	fn on_click(&mut self) -> ClickAction {
		match self.pending.take() {
			Some(handle) => ClickAction::CancelPending(handle),
			None => ClickAction::Defer,
		}
	}

	fn deferred(&mut self, handle: i32) {
		self.pending = Some(handle);
	}

	/// The deferred timeout ran: the click stood alone, so the toggle fires.
	fn fire(&mut self) -> bool {
		self.pending.take().is_some()
	}

	fn on_dblclick(&mut self) -> Option<i32> {
		self.pending.take()
	}
}

/// Size the backing store for the current device-pixel-ratio.
///
/// Assigning width/height resets the context state, so the scale applied
/// here never stacks across resizes.
fn configure_backing(
	canvas: &HtmlCanvasElement,
	ctx: &CanvasRenderingContext2d,
	width: f64,
	height: f64,
	dpr: f64,
) {
	canvas.set_width((width * dpr) as u32);
	canvas.set_height((height * dpr) as u32);
	let _ = ctx.scale(dpr, dpr);
	let style = web_sys::HtmlElement::style(canvas);
	let _ = style.set_property("width", &format!("{width}px"));
	let _ = style.set_property("height", &format!("{height}px"));
}

#[component]
pub fn CircuitCanvas(
	#[prop(default = true)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CircuitState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let keydown_cb: Rc<RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>>> =
		Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, keydown_cb_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		keydown_cb.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let dpr = window.device_pixel_ratio();
		let (w, h) = if fullscreen {
			(
				window.inner_width().unwrap().as_f64().unwrap(),
				window.inner_height().unwrap().as_f64().unwrap(),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		configure_backing(&canvas, &ctx, w, h, dpr);
		*state_init.borrow_mut() = Some(CircuitState::new(w, h, dpr, Box::new(JsRandom)));

		if fullscreen {
			let (state_resize, canvas_resize, ctx_resize) =
				(state_init.clone(), canvas.clone(), ctx.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let ndpr = win.device_pixel_ratio();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				configure_backing(&canvas_resize, &ctx_resize, nw, nh, ndpr);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh, ndpr);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// Shift+T toggles turbo from anywhere on the page.
		let state_key = state_init.clone();
		*keydown_cb_init.borrow_mut() = Some(Closure::new(move |ev: KeyboardEvent| {
			if ev.shift_key() && ev.key().eq_ignore_ascii_case("t") {
				if let Some(ref mut s) = *state_key.borrow_mut() {
					s.toggle_turbo();
				}
			}
		}));
		if let Some(ref cb) = *keydown_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick();
				let mut surface = CanvasSurface::new(&ctx);
				render::render(s, &mut surface);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let clicks: Rc<RefCell<ClickState>> = Rc::new(RefCell::new(ClickState::default()));
	let theme_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	{
		let (state_theme, clicks_theme) = (state.clone(), clicks.clone());
		*theme_cb.borrow_mut() = Some(Closure::new(move || {
			if clicks_theme.borrow_mut().fire() {
				if let Some(ref mut s) = *state_theme.borrow_mut() {
					s.toggle_theme();
				}
			}
		}));
	}

	let (clicks_click, theme_cb_click) = (clicks.clone(), theme_cb.clone());
	let on_click = move |_: MouseEvent| {
		let action = clicks_click.borrow_mut().on_click();
		match action {
			ClickAction::CancelPending(handle) => {
				web_sys::window().unwrap().clear_timeout_with_handle(handle);
			}
			ClickAction::Defer => {
				if let Some(ref cb) = *theme_cb_click.borrow() {
					if let Ok(handle) = web_sys::window()
						.unwrap()
						.set_timeout_with_callback_and_timeout_and_arguments_0(
							cb.as_ref().unchecked_ref(),
							CLICK_DEBOUNCE_MS as i32,
						) {
						clicks_click.borrow_mut().deferred(handle);
					}
				}
			}
		}
	};

	let (state_dbl, clicks_dbl) = (state.clone(), clicks.clone());
	let on_dblclick = move |_: MouseEvent| {
		if let Some(handle) = clicks_dbl.borrow_mut().on_dblclick() {
			web_sys::window().unwrap().clear_timeout_with_handle(handle);
		}
		if let Some(ref mut s) = *state_dbl.borrow_mut() {
			s.toggle_turbo();
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="circuit-canvas"
			on:click=on_click
			on:dblclick=on_dblclick
			style="display: block; position: fixed; inset: 0; z-index: -1;"
		/>
	}
}
