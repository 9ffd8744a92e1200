//! Browser host for the trajectory viewer.
//!
//! Owns the wgpu surface behind a `<canvas>`, translates DOM pointer, wheel
//! and resize events into [`ViewerEvent`]s and drives redraws from a
//! `requestAnimationFrame` loop. Everything runs on the page's main thread.

#![cfg(all(target_arch = "wasm32", feature = "web"))]

use crate::config::ViewerConfig;
use crate::core::{Modifiers, MouseButton, ViewerEvent, Viewport};
use crate::error::ViewerError;
use crate::gpu::{LabelBitmap, LabelRasterizer, RenderError, SceneRenderer};
use crate::styling::ViewerTheme;
use crate::viewer::{Viewer, ViewerStats};
use crate::LOG_TARGET;
use dynsys_logging::{LogRecord, LoggingOptions};
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, EventTarget, HtmlCanvasElement, OffscreenCanvas,
    OffscreenCanvasRenderingContext2d, PointerEvent, WheelEvent,
};

/// Errors produced while initialising or driving the browser viewer.
#[derive(Debug, Error)]
pub enum WebViewerError {
    #[error("canvas has zero area; ensure width/height attributes are set")]
    CanvasZeroArea,
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible WebGPU/WebGL2 adapter was found")]
    AdapterUnavailable,
    #[error("device creation failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
    #[error("DOM call failed: {0}")]
    Dom(String),
}

fn dom_error(value: JsValue) -> WebViewerError {
    WebViewerError::Dom(js_value_to_string(value))
}

/// Options accepted by `createViewer`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CreateOptions {
    #[serde(flatten)]
    config: ViewerConfig,
    power_preference: Option<String>,
    font_family: Option<String>,
}

/// Rasterises label text with an `OffscreenCanvas` 2D context.
pub struct CanvasLabelRasterizer {
    canvas: OffscreenCanvas,
    context: OffscreenCanvasRenderingContext2d,
    font_family: String,
}

impl CanvasLabelRasterizer {
    pub fn new(font_family: impl Into<String>) -> Result<Self, WebViewerError> {
        let canvas = OffscreenCanvas::new(64, 32).map_err(dom_error)?;
        let context = canvas
            .get_context("2d")
            .map_err(dom_error)?
            .ok_or_else(|| WebViewerError::Dom("2d context unavailable".to_string()))?
            .dyn_into::<OffscreenCanvasRenderingContext2d>()
            .map_err(|obj| dom_error(obj.into()))?;
        Ok(Self {
            canvas,
            context,
            font_family: font_family.into(),
        })
    }

    fn font(&self, size_px: f32) -> String {
        format!("{}px {}", size_px.round().max(1.0), self.font_family)
    }
}

impl LabelRasterizer for CanvasLabelRasterizer {
    fn rasterize(
        &mut self,
        text: &str,
        size_px: f32,
        color: [f32; 4],
    ) -> Result<LabelBitmap, String> {
        let font = self.font(size_px);
        self.context.set_font(&font);
        let metrics = self
            .context
            .measure_text(text)
            .map_err(js_value_to_string)?;
        let pad = 2.0;
        let width = (metrics.width() + pad * 2.0).ceil().max(1.0) as u32;
        let height = (f64::from(size_px) * 1.4).ceil().max(1.0) as u32;

        // resizing resets the context state, so set the font again afterwards
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.context.set_font(&font);
        self.context.set_text_baseline("middle");
        self.context.set_text_align("left");
        self.context
            .clear_rect(0.0, 0.0, f64::from(width), f64::from(height));
        self.context.set_fill_style(&JsValue::from_str(&ViewerTheme::css_rgba(
            Vec4::from_array(color),
        )));
        self.context
            .fill_text(text, pad, f64::from(height) * 0.5)
            .map_err(js_value_to_string)?;

        let image = self
            .context
            .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))
            .map_err(js_value_to_string)?;
        Ok(LabelBitmap {
            width,
            height,
            rgba: image.data().0,
        })
    }
}

/// Surface, renderer and engine for one canvas.
struct ViewerHost {
    canvas: HtmlCanvasElement,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: SceneRenderer,
    viewer: Viewer,
    rasterizer: CanvasLabelRasterizer,
    frames: u64,
    render_errors: u64,
}

impl ViewerHost {
    async fn new(canvas: HtmlCanvasElement, options: CreateOptions) -> Result<Self, WebViewerError> {
        let (width, height) = desired_canvas_size(&canvas)?;
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: parse_power_preference(options.power_preference.as_deref()),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(WebViewerError::AdapterUnavailable)?;
        let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("dynsys-viewer-web"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let capabilities = surface.get_capabilities(&adapter);
        let format = pick_surface_format(&capabilities)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: pick_present_mode(&capabilities, wgpu::PresentMode::Fifo),
            alpha_mode: pick_alpha_mode(&capabilities),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(device.as_ref(), &surface_config);

        let renderer = SceneRenderer::new(
            device.clone(),
            queue,
            format,
            options.config.theme.background_wgpu(),
        );
        let mut viewer = Viewer::new(options.config)?;
        viewer.resize(width, height);
        let rasterizer = CanvasLabelRasterizer::new(
            options
                .font_family
                .unwrap_or_else(|| "system-ui, sans-serif".to_string()),
        )?;

        log::info!(
            target: LOG_TARGET,
            "web viewer ready: {}x{} format={:?} adapter={:?}",
            width,
            height,
            format,
            adapter.get_info().backend
        );

        Ok(Self {
            canvas,
            surface,
            device,
            surface_config,
            renderer,
            viewer,
            rasterizer,
            frames: 0,
            render_errors: 0,
        })
    }

    fn render_frame(&mut self) -> Result<(), WebViewerError> {
        let frame = match self.surface.get_current_texture().map_err(RenderError::from) {
            Ok(frame) => frame,
            Err(err) if err.needs_reconfigure() => {
                log::debug!(target: LOG_TARGET, "{err}; reconfiguring");
                self.reconfigure_surface()?;
                self.surface
                    .get_current_texture()
                    .map_err(RenderError::from)?
            }
            Err(err) if err.is_transient() => {
                log::warn!(target: LOG_TARGET, "{err}; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let snapshot = self.viewer.frame();
        self.renderer.render(
            &view,
            &snapshot,
            self.viewer.registry(),
            &mut self.rasterizer,
        );
        frame.present();
        self.frames += 1;
        Ok(())
    }

    /// Resize the surface (physical pixels) and rebuild view-dependent primitives.
    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), WebViewerError> {
        if width == 0 || height == 0 {
            return Err(WebViewerError::CanvasZeroArea);
        }
        if self.surface_config.width == width && self.surface_config.height == height {
            return Ok(());
        }
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure_surface()?;
        self.viewer.resize(width, height);
        Ok(())
    }

    fn reconfigure_surface(&mut self) -> Result<(), WebViewerError> {
        if self.surface_config.width == 0 || self.surface_config.height == 0 {
            return Err(WebViewerError::CanvasZeroArea);
        }
        self.surface.configure(&self.device, &self.surface_config);
        self.renderer.invalidate();
        Ok(())
    }

    /// Canvas CSS size times the device pixel ratio.
    fn css_extent(&self) -> (u32, u32) {
        let ratio = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        let rect = self.canvas.get_bounding_client_rect();
        (
            (rect.width() * ratio).round() as u32,
            (rect.height() * ratio).round() as u32,
        )
    }

    /// CSS-pixel pointer offsets into surface pixels.
    fn to_surface_px(&self, offset_x: i32, offset_y: i32) -> Vec2 {
        let client = Vec2::new(
            self.canvas.client_width() as f32,
            self.canvas.client_height() as f32,
        );
        Viewport::new(self.surface_config.width, self.surface_config.height)
            .css_to_physical(Vec2::new(offset_x as f32, offset_y as f32), client)
    }
}

type Shared<T> = Rc<RefCell<T>>;

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(JsValue)>,
}

impl Listener {
    fn detach(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsPayload {
    #[serde(flatten)]
    viewer: ViewerStats,
    frames: u64,
    render_errors: u64,
    running: bool,
}

/// Interactive viewer bound to one `<canvas>`.
#[wasm_bindgen]
pub struct TrajectoryViewer {
    host: Shared<ViewerHost>,
    running: Rc<Cell<bool>>,
    frame_handle: Rc<Cell<Option<i32>>>,
    frame_callback: Shared<Option<Closure<dyn FnMut(f64)>>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl TrajectoryViewer {
    /// Plot an array of rows (`number[][]`). Invalid input keeps the previous plot.
    #[wasm_bindgen(js_name = setTrajectory)]
    pub fn set_trajectory(&self, rows: JsValue) -> Result<(), JsValue> {
        let rows: Vec<Vec<f64>> = serde_wasm_bindgen::from_value(rows)
            .map_err(|err| js_error(&format!("Invalid trajectory: {err}")))?;
        self.host
            .borrow_mut()
            .viewer
            .set_trajectory_rows(&rows)
            .map_err(|err| js_error(&format!("Trajectory rejected: {err}")))
    }

    #[wasm_bindgen(js_name = clear)]
    pub fn clear(&self) {
        self.host.borrow_mut().viewer.clear();
    }

    /// Attach input listeners and start the render loop.
    #[wasm_bindgen(js_name = start)]
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.running.get() {
            return Ok(());
        }
        if self.listeners.is_empty() {
            self.attach_listeners()
                .map_err(|err| js_error(&format!("Failed to attach listeners: {err}")))?;
        }
        self.running.set(true);
        self.ensure_frame_callback();
        schedule_frame(&self.frame_callback, &self.frame_handle)
            .map_err(|err| js_error(&format!("Failed to start render loop: {err}")))?;
        log::debug!(target: LOG_TARGET, "render loop started");
        Ok(())
    }

    /// Stop the render loop and detach listeners.
    #[wasm_bindgen(js_name = stop)]
    pub fn stop(&mut self) {
        self.running.set(false);
        if let Some(handle) = self.frame_handle.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(handle);
            }
        }
        for listener in self.listeners.drain(..) {
            listener.detach();
        }
        log::debug!(target: LOG_TARGET, "render loop stopped");
    }

    /// Resize the drawing surface to `width` x `height` physical pixels.
    #[wasm_bindgen(js_name = resize)]
    pub fn resize(&self, width: u32, height: u32) -> Result<(), JsValue> {
        self.host
            .borrow_mut()
            .resize_surface(width, height)
            .map_err(|err| js_error(&format!("Resize failed: {err}")))
    }

    #[wasm_bindgen(js_name = stats)]
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let payload = {
            let host = self.host.borrow();
            StatsPayload {
                viewer: host.viewer.stats(),
                frames: host.frames,
                render_errors: host.render_errors,
                running: self.running.get(),
            }
        };
        serde_wasm_bindgen::to_value(&payload)
            .map_err(|err| js_error(&format!("Failed to serialize stats: {err}")))
    }
}

impl TrajectoryViewer {
    fn ensure_frame_callback(&self) {
        if self.frame_callback.borrow().is_some() {
            return;
        }
        let host = self.host.clone();
        let running = self.running.clone();
        let handle = self.frame_handle.clone();
        let callback_slot = Rc::downgrade(&self.frame_callback);
        let closure = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            handle.set(None);
            if !running.get() {
                return;
            }
            match host.try_borrow_mut() {
                Ok(mut host) => {
                    if let Err(err) = host.render_frame() {
                        host.render_errors += 1;
                        log::warn!(target: LOG_TARGET, "frame failed: {err}");
                    }
                }
                Err(_) => log::debug!(target: LOG_TARGET, "host busy; skipping frame"),
            }
            if let Some(slot) = callback_slot.upgrade() {
                if let Err(err) = schedule_frame(&slot, &handle) {
                    log::warn!(target: LOG_TARGET, "failed to schedule frame: {err}");
                }
            }
        });
        *self.frame_callback.borrow_mut() = Some(closure);
    }

    fn attach_listeners(&mut self) -> Result<(), WebViewerError> {
        let canvas: EventTarget = self.host.borrow().canvas.clone().into();

        let host = self.host.clone();
        self.listen(&canvas, "pointerdown", false, move |event| {
            let Ok(event) = event.dyn_into::<PointerEvent>() else {
                return;
            };
            let Some(button) = MouseButton::from_dom(event.button()) else {
                return;
            };
            let mut host = host.borrow_mut();
            let _ = host.canvas.set_pointer_capture(event.pointer_id());
            let position = host.to_surface_px(event.offset_x(), event.offset_y());
            host.viewer.handle_event(ViewerEvent::PointerDown {
                position,
                button,
                modifiers: modifiers_of(&event),
            });
        })?;

        let host = self.host.clone();
        self.listen(&canvas, "pointermove", false, move |event| {
            let Ok(event) = event.dyn_into::<PointerEvent>() else {
                return;
            };
            let mut host = host.borrow_mut();
            let position = host.to_surface_px(event.offset_x(), event.offset_y());
            host.viewer.handle_event(ViewerEvent::PointerMove {
                position,
                modifiers: modifiers_of(&event),
            });
        })?;

        for kind in ["pointerup", "pointercancel"] {
            let host = self.host.clone();
            self.listen(&canvas, kind, false, move |event| {
                let Ok(event) = event.dyn_into::<PointerEvent>() else {
                    return;
                };
                let button = MouseButton::from_dom(event.button()).unwrap_or(MouseButton::Left);
                let mut host = host.borrow_mut();
                let _ = host.canvas.release_pointer_capture(event.pointer_id());
                let position = host.to_surface_px(event.offset_x(), event.offset_y());
                host.viewer
                    .handle_event(ViewerEvent::PointerUp { position, button });
            })?;
        }

        let host = self.host.clone();
        self.listen(&canvas, "wheel", true, move |event| {
            let Ok(event) = event.dyn_into::<WheelEvent>() else {
                return;
            };
            event.prevent_default();
            let modifiers = Modifiers {
                shift: event.shift_key(),
                ctrl: event.ctrl_key(),
                alt: event.alt_key(),
                meta: event.meta_key(),
            };
            host.borrow_mut().viewer.handle_event(ViewerEvent::Wheel {
                delta_y: event.delta_y() as f32,
                modifiers,
            });
        })?;

        if let Some(window) = web_sys::window() {
            let window: EventTarget = window.into();
            let host = self.host.clone();
            self.listen(&window, "resize", false, move |_event| {
                let mut host = host.borrow_mut();
                let (width, height) = host.css_extent();
                if let Err(err) = host.resize_surface(width, height) {
                    log::debug!(target: LOG_TARGET, "resize ignored: {err}");
                }
            })?;
        }
        Ok(())
    }

    fn listen<F>(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        cancelable: bool,
        handler: F,
    ) -> Result<(), WebViewerError>
    where
        F: FnMut(JsValue) + 'static,
    {
        let callback = Closure::<dyn FnMut(JsValue)>::new(handler);
        let options = AddEventListenerOptions::new();
        // wheel must be non-passive so preventDefault stops page scrolling
        options.set_passive(!cancelable);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                callback.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(dom_error)?;
        self.listeners.push(Listener {
            target: target.clone(),
            kind,
            callback,
        });
        Ok(())
    }
}

impl Drop for TrajectoryViewer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Create a viewer for `canvas`. `options` is a partial viewer configuration
/// (same shape as the CLI config file) plus `powerPreference` and
/// `fontFamily`.
#[wasm_bindgen(js_name = createViewer)]
pub async fn create_viewer(
    canvas: HtmlCanvasElement,
    options: JsValue,
) -> Result<TrajectoryViewer, JsValue> {
    init_logging_once();
    let options: CreateOptions = if options.is_null() || options.is_undefined() {
        CreateOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|err| js_error(&format!("Invalid viewer options: {err}")))?
    };
    let host = ViewerHost::new(canvas, options)
        .await
        .map_err(|err| js_error(&format!("Failed to create viewer: {err}")))?;
    Ok(TrajectoryViewer {
        host: Rc::new(RefCell::new(host)),
        running: Rc::new(Cell::new(false)),
        frame_handle: Rc::new(Cell::new(None)),
        frame_callback: Rc::new(RefCell::new(None)),
        listeners: Vec::new(),
    })
}

fn schedule_frame(
    callback: &Shared<Option<Closure<dyn FnMut(f64)>>>,
    handle: &Rc<Cell<Option<i32>>>,
) -> Result<(), WebViewerError> {
    let window = web_sys::window().ok_or_else(|| WebViewerError::Dom("no window".into()))?;
    let slot = callback.borrow();
    let Some(closure) = slot.as_ref() else {
        return Ok(());
    };
    let id = window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(dom_error)?;
    handle.set(Some(id));
    Ok(())
}

fn modifiers_of(event: &PointerEvent) -> Modifiers {
    Modifiers {
        shift: event.shift_key(),
        ctrl: event.ctrl_key(),
        alt: event.alt_key(),
        meta: event.meta_key(),
    }
}

fn desired_canvas_size(canvas: &HtmlCanvasElement) -> Result<(u32, u32), WebViewerError> {
    let (width, height) = (canvas.width(), canvas.height());
    if width > 0 && height > 0 {
        return Ok((width, height));
    }
    let rect = canvas.get_bounding_client_rect();
    let w = rect.width().round() as u32;
    let h = rect.height().round() as u32;
    if w > 0 && h > 0 {
        canvas.set_width(w);
        canvas.set_height(h);
        Ok((w, h))
    } else {
        Err(WebViewerError::CanvasZeroArea)
    }
}

fn pick_surface_format(
    capabilities: &wgpu::SurfaceCapabilities,
) -> Result<wgpu::TextureFormat, WebViewerError> {
    capabilities
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| capabilities.formats.first().copied())
        .ok_or(WebViewerError::AdapterUnavailable)
}

fn pick_present_mode(
    capabilities: &wgpu::SurfaceCapabilities,
    preferred: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if capabilities.present_modes.contains(&preferred) {
        preferred
    } else {
        wgpu::PresentMode::Fifo
    }
}

fn pick_alpha_mode(capabilities: &wgpu::SurfaceCapabilities) -> wgpu::CompositeAlphaMode {
    capabilities
        .alpha_modes
        .iter()
        .copied()
        .find(|mode| {
            matches!(
                mode,
                wgpu::CompositeAlphaMode::Opaque | wgpu::CompositeAlphaMode::Auto
            )
        })
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

fn parse_power_preference(input: Option<&str>) -> wgpu::PowerPreference {
    match input.map(|s| s.to_ascii_lowercase()) {
        Some(ref value) if value.contains("low") => wgpu::PowerPreference::LowPower,
        Some(ref value) if value.contains("high") => wgpu::PowerPreference::HighPerformance,
        _ => wgpu::PowerPreference::default(),
    }
}

fn js_error(message: &str) -> JsValue {
    JsValue::from_str(message)
}

fn js_value_to_string(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn forward_to_console(record: &LogRecord) {
    let line = JsValue::from_str(&format!(
        "[{}] {} {}",
        record.target, record.level, record.message
    ));
    match record.level.as_str() {
        "ERROR" => web_sys::console::error_1(&line),
        "WARN" => web_sys::console::warn_1(&line),
        "DEBUG" | "TRACE" => web_sys::console::debug_1(&line),
        _ => web_sys::console::log_1(&line),
    }
}

fn init_logging_once() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        console_error_panic_hook::set_once();
        dynsys_logging::set_log_hook(forward_to_console);
        let guard = dynsys_logging::init_logging(LoggingOptions::default());
        if !guard.is_global() {
            log::debug!(target: LOG_TARGET, "a global subscriber was already installed");
        }
    });
}
