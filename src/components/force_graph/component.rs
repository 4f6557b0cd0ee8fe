use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::ev;
use leptos::html::Canvas;
use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::layout::LayoutConfig;
use super::render;
use super::state::ForceGraphState;
use super::types::GraphModel;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn canvas_size(canvas: &HtmlCanvasElement, window: &Window, fullscreen: bool) -> (f64, f64) {
	if fullscreen {
		let dim = |v: Result<JsValue, JsValue>, fallback| {
			v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
		};
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// One animation frame: advance and draw while the canvas is mounted.
///
/// Returns `false` once it is gone. The frame callback holds a handle to its
/// own slot, so the slot and the graph state are emptied then; otherwise
/// neither would ever be freed.
fn run_frame<C>(
	alive: &AtomicBool,
	callback: &RefCell<Option<C>>,
	state: &RefCell<Option<ForceGraphState>>,
	draw: impl FnOnce(&ForceGraphState),
) -> bool {
	if !alive.load(Ordering::Relaxed) {
		callback.borrow_mut().take();
		state.borrow_mut().take();
		return false;
	}
	if let Some(s) = state.borrow_mut().as_mut() {
		s.tick();
		draw(s);
	}
	true
}

fn pointer_position(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Interactive force-directed drawing of a [`GraphModel`] with zoom in,
/// zoom out and reset controls.
#[component]
pub fn ForceGraphCanvas(
	/// Graph to draw; a new value restarts the layout.
	#[prop(into)]
	model: Signal<GraphModel>,
	/// Layout tuning.
	#[prop(optional)]
	layout: LayoutConfig,
	/// Size the canvas to the window instead of its parent.
	#[prop(default = false)]
	fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let animate: FrameCallback = Rc::new(RefCell::new(None));
	let alive = Arc::new(AtomicBool::new(true));

	let state_resize = state.clone();
	let resize = window_event_listener(ev::resize, move |_| {
		let (Some(canvas), Some(window)) = (canvas_ref.get_untracked(), web_sys::window()) else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = canvas_size(&canvas, &window, fullscreen);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		if let Some(s) = state_resize.borrow_mut().as_mut() {
			s.resize(w, h);
		}
	});

	let alive_cleanup = alive.clone();
	on_cleanup(move || {
		alive_cleanup.store(false, Ordering::Relaxed);
		resize.remove();
	});

	let (state_init, animate_init) = (state.clone(), animate.clone());
	Effect::new(move |_| {
		let model = model.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = canvas_size(&canvas, &window, fullscreen);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		// A new model replaces the layout and resets the view.
		*state_init.borrow_mut() = Some(ForceGraphState::new(model, &layout, w, h));

		if animate_init.borrow().is_some() {
			return;
		}
		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("canvas 2d context unavailable, graph not drawn");
				return;
			}
		};

		let (state_anim, animate_inner, alive_anim) =
			(state_init.clone(), animate_init.clone(), alive.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			// wasm-bindgen defers freeing a closure dropped during its own call.
			if !run_frame(&alive_anim, &*animate_inner, &*state_anim, |s| render::render(s, &ctx)) {
				debug!("graph canvas unmounted, animation stopped");
				return;
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(cb) = animate_init.borrow().as_ref() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_md.borrow_mut().as_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_mm.borrow_mut().as_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(s) = state_mu.borrow_mut().as_mut() {
			s.pointer_up();
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			s.pointer_up();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			s.wheel(ev.delta_y());
		}
	};

	let control = move |action: fn(&mut ForceGraphState)| {
		let state = state.clone();
		move |_: MouseEvent| {
			if let Some(s) = state.borrow_mut().as_mut() {
				action(s);
			}
		}
	};

	view! {
		<div class="force-graph">
			<div class="force-graph-controls">
				<button title="Zoom in" on:click=control(ForceGraphState::zoom_in)>"+"</button>
				<button title="Zoom out" on:click=control(ForceGraphState::zoom_out)>"−"</button>
				<button title="Reset view" on:click=control(ForceGraphState::reset_view)>
					"Reset"
				</button>
			</div>
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
		</div>
	}
}
