//! WebAssembly entry point and browser bindings.

use crate::config::AppConfig;
use blockgrid_core::settings::BoxFuture;
use blockgrid_core::storage::{WebLocalStorage, create_default_cache};
use blockgrid_core::{
    BlockKind, ConfigStore, EditorError, FlushOutcome, FlushStep, PageConfig, PageEditor,
    PointerInput, Settings, SettingsBackend, SystemClock, ViewportGeometry,
};
use kurbo::Rect;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{DomRect, Element, EventTarget, VisibilityState};

/// Attribute carrying the block id on rendered block elements.
pub const BLOCK_ID_ATTRIBUTE: &str = "data-block-id";

/// Interval of the debounce timer driver, in milliseconds.
const TICK_INTERVAL_MS: i32 = 50;

type WebEditor = PageEditor<JsSettings, WebLocalStorage>;

fn to_rect(rect: DomRect) -> Rect {
    Rect::new(rect.left(), rect.top(), rect.right(), rect.bottom())
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Reads drag geometry from the rendered grid container.
pub struct DomGeometry {
    container: Element,
}

impl DomGeometry {
    pub fn new(container: Element) -> Self {
        Self { container }
    }
}

impl ViewportGeometry for DomGeometry {
    fn container_rect(&self) -> Option<Rect> {
        if !self.container.is_connected() {
            return None;
        }
        Some(to_rect(self.container.get_bounding_client_rect()))
    }

    fn block_rects(&self) -> Vec<(String, Rect)> {
        let selector = format!("[{}]", BLOCK_ID_ATTRIBUTE);
        let Ok(nodes) = self.container.query_selector_all(&selector) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter_map(|el| {
                let id = el.get_attribute(BLOCK_ID_ATTRIBUTE)?;
                Some((id, to_rect(el.get_bounding_client_rect())))
            })
            .collect()
    }

    fn viewport_height(&self) -> f64 {
        web_sys::window()
            .and_then(|w| w.inner_height().ok())
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_by(&mut self, dy: f64) {
        if let Some(window) = web_sys::window() {
            window.scroll_by_with_x_and_y(0.0, dy);
        }
    }
}

/// Remote settings behind a JS function `save(patchJson) -> Promise<settings | null>`.
///
/// The promise may resolve to a JSON string or a plain object. `null`, `undefined`
/// or a rejection mean nothing was written.
struct JsSettings {
    save: js_sys::Function,
}

impl SettingsBackend for JsSettings {
    fn save_settings(&self, patch: Settings) -> BoxFuture<'_, Option<Settings>> {
        Box::pin(async move {
            let body = serde_json::to_string(&patch).ok()?;
            let returned = match self.save.call1(&JsValue::NULL, &JsValue::from_str(&body)) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("saveSettings threw: {:?}", e);
                    return None;
                }
            };
            let resolved = match JsFuture::from(js_sys::Promise::resolve(&returned)).await {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("saveSettings rejected: {:?}", e);
                    return None;
                }
            };
            if resolved.is_null() || resolved.is_undefined() {
                return None;
            }
            let text = match resolved.as_string() {
                Some(text) => text,
                None => String::from(js_sys::JSON::stringify(&resolved).ok()?),
            };
            serde_json::from_str(&text)
                .map_err(|e| log::warn!("saveSettings returned malformed settings: {}", e))
                .ok()
        })
    }
}

#[derive(Clone, Copy)]
enum Lifecycle {
    /// Debounce timer; writes only when due.
    Tick,
    /// `pagehide` or the document became hidden.
    Hide,
}

fn drive(editor: &Rc<RefCell<WebEditor>>, event: Lifecycle) {
    let step = match editor.try_borrow_mut() {
        Ok(mut editor) => match event {
            Lifecycle::Tick => editor.store_mut().begin_due_flush(),
            Lifecycle::Hide => editor.store_mut().begin_flush(),
        },
        Err(_) => return,
    };
    send(editor.clone(), step);
}

/// Await the remote store with the editor released, so pointer and edit calls keep
/// working until it answers.
fn send(editor: Rc<RefCell<WebEditor>>, step: FlushStep<JsSettings>) {
    let FlushStep::Save(save) = step else {
        return;
    };
    spawn_local(async move {
        let result = save.send().await;
        match editor.try_borrow_mut() {
            Ok(mut editor) => {
                if editor.store_mut().complete_flush(save, result) == FlushOutcome::Failed {
                    log::warn!("page {} was not saved", editor.page().id);
                }
            }
            Err(_) => log::warn!("page busy when its save completed"),
        }
    });
}

/// A page editor mounted on a grid container element.
#[wasm_bindgen]
pub struct WebPage {
    editor: Rc<RefCell<WebEditor>>,
    container: Element,
    listeners: Vec<(EventTarget, &'static str, Closure<dyn FnMut()>)>,
    timer: Option<(i32, Closure<dyn FnMut()>)>,
}

#[wasm_bindgen]
impl WebPage {
    /// Mount on `container`. `template_json` is the page shown when nothing is stored;
    /// `save` persists a settings patch.
    #[wasm_bindgen(constructor)]
    pub fn new(container: Element, template_json: &str, save: js_sys::Function) -> Result<WebPage, JsValue> {
        let config = AppConfig::default();
        let template = PageConfig::from_json(template_json).map_err(to_js)?;
        let store = ConfigStore::new(
            template,
            Arc::new(JsSettings { save }),
            create_default_cache().map_err(to_js)?,
            Arc::new(SystemClock),
            config.store,
        );
        Ok(WebPage {
            editor: Rc::new(RefCell::new(PageEditor::new(store, config.drag))),
            container,
            listeners: Vec::new(),
            timer: None,
        })
    }

    /// Load the page from the current settings and hook the page lifecycle.
    pub fn start(&mut self, settings_json: &str) -> Result<(), JsValue> {
        let settings: Settings = serde_json::from_str(settings_json).map_err(to_js)?;
        self.with_editor(|editor| editor.start(settings))?;
        self.install_lifecycle()
    }

    /// Remote settings changed elsewhere.
    #[wasm_bindgen(js_name = settingsChanged)]
    pub fn settings_changed(&self, settings_json: &str) -> Result<(), JsValue> {
        let settings: Settings = serde_json::from_str(settings_json).map_err(to_js)?;
        self.with_editor(|editor| editor.settings_changed(settings))
    }

    #[wasm_bindgen(js_name = addBlock)]
    pub fn add_block(&self, kind: &str) -> Result<String, JsValue> {
        let kind = BlockKind::parse(kind).ok_or_else(|| to_js(format!("Unknown block type: {}", kind)))?;
        self.with_editor(|editor| editor.add_block(kind))
    }

    #[wasm_bindgen(js_name = duplicateBlock)]
    pub fn duplicate_block(&self, id: &str) -> Result<String, JsValue> {
        self.with_editor(|editor| editor.duplicate_block(id))?.map_err(to_js)
    }

    /// Delete after the user confirms. Returns whether the block was removed.
    #[wasm_bindgen(js_name = deleteBlock)]
    pub fn delete_block(&self, id: &str) -> Result<bool, JsValue> {
        let confirm = |_: &blockgrid_core::Block| {
            web_sys::window()
                .and_then(|w| w.confirm_with_message("Delete this block?").ok())
                .unwrap_or(false)
        };
        match self.with_editor(|editor| editor.delete_block(id, confirm))? {
            Ok(_) => Ok(true),
            Err(EditorError::NotConfirmed(_)) => Ok(false),
            Err(e) => Err(to_js(e)),
        }
    }

    #[wasm_bindgen(js_name = resizeBlock)]
    pub fn resize_block(&self, id: &str, span: f64) -> Result<(), JsValue> {
        self.with_editor(|editor| editor.resize_block(id, span))?.map_err(to_js)
    }

    /// Shallow-merge a JSON object into a block's props.
    #[wasm_bindgen(js_name = patchProps)]
    pub fn patch_props(&self, id: &str, patch_json: &str) -> Result<(), JsValue> {
        let patch: Value = serde_json::from_str(patch_json).map_err(to_js)?;
        let Value::Object(patch) = patch else {
            return Err(to_js("props patch must be an object"));
        };
        self.with_editor(|editor| editor.patch_props(id, &patch))?.map_err(to_js)
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, pointer_id: i32, x: f64, y: f64, block_id: &str) -> bool {
        let geometry = DomGeometry::new(self.container.clone());
        self.with_editor(|editor| editor.pointer_down(PointerInput::new(pointer_id, x, y), block_id, &geometry))
            .unwrap_or(false)
    }

    /// Returns whether the preview changed and the grid needs a re-render.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, pointer_id: i32, x: f64, y: f64) -> bool {
        let mut geometry = DomGeometry::new(self.container.clone());
        self.with_editor(|editor| editor.pointer_move(PointerInput::new(pointer_id, x, y), &mut geometry))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.with_editor(|editor| editor.pointer_up(PointerInput::new(pointer_id, x, y)))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&self, pointer_id: i32) -> bool {
        self.with_editor(|editor| editor.pointer_cancel(pointer_id))
            .unwrap_or(false)
    }

    /// Grid cells as a JSON array of `{ id, type, gridColumn, gridRow, placeholder }`.
    pub fn cells(&self) -> Result<String, JsValue> {
        let cells = self.with_editor(|editor| editor.render_cells())?;
        let cells: Vec<Value> = cells
            .iter()
            .map(|cell| {
                json!({
                    "id": cell.id,
                    "type": cell.kind.as_str(),
                    "gridColumn": cell.grid_column(),
                    "gridRow": cell.grid_row(),
                    "placeholder": cell.placeholder,
                })
            })
            .collect();
        Ok(Value::Array(cells).to_string())
    }

    /// Ghost rectangle `[x, y, width, height]` while dragging.
    pub fn ghost(&self) -> Option<Vec<f64>> {
        let rect = self.with_editor(|editor| editor.ghost()).ok()??;
        Some(vec![rect.x0, rect.y0, rect.width(), rect.height()])
    }

    /// The current page config as JSON.
    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> Result<String, JsValue> {
        self.with_editor(|editor| editor.store().local_json().to_string())
    }

    /// Unhook the lifecycle listeners and flush any unsaved edit.
    pub fn dispose(mut self) {
        self.uninstall_lifecycle();
        drive(&self.editor, Lifecycle::Hide);
    }
}

impl WebPage {
    fn with_editor<R>(&self, f: impl FnOnce(&mut WebEditor) -> R) -> Result<R, JsValue> {
        let mut editor = self
            .editor
            .try_borrow_mut()
            .map_err(|_| to_js("page is busy saving"))?;
        Ok(f(&mut editor))
    }

    fn install_lifecycle(&mut self) -> Result<(), JsValue> {
        if !self.listeners.is_empty() {
            return Ok(());
        }
        let window = web_sys::window().ok_or_else(|| to_js("No window object"))?;
        let document = window.document().ok_or_else(|| to_js("No document"))?;

        let editor = self.editor.clone();
        let on_page_hide = Closure::<dyn FnMut()>::new(move || drive(&editor, Lifecycle::Hide));

        let editor = self.editor.clone();
        let doc = document.clone();
        let on_visibility = Closure::<dyn FnMut()>::new(move || {
            if doc.visibility_state() == VisibilityState::Hidden {
                drive(&editor, Lifecycle::Hide);
            }
        });

        let editor = self.editor.clone();
        let on_tick = Closure::<dyn FnMut()>::new(move || drive(&editor, Lifecycle::Tick));

        window.add_event_listener_with_callback("pagehide", on_page_hide.as_ref().unchecked_ref())?;
        document
            .add_event_listener_with_callback("visibilitychange", on_visibility.as_ref().unchecked_ref())?;
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            on_tick.as_ref().unchecked_ref(),
            TICK_INTERVAL_MS,
        )?;

        self.timer = Some((handle, on_tick));
        self.listeners.push((window.into(), "pagehide", on_page_hide));
        self.listeners.push((document.into(), "visibilitychange", on_visibility));
        Ok(())
    }

    fn uninstall_lifecycle(&mut self) {
        if let (Some(window), Some((handle, _))) = (web_sys::window(), self.timer.take()) {
            window.clear_interval_with_handle(handle);
        }
        for (target, event, closure) in self.listeners.drain(..) {
            if let Err(e) = target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
                log::warn!("failed to remove {} listener: {:?}", event, e);
            }
        }
    }
}

/// Initialize panic reporting and logging for the WASM module.
#[wasm_bindgen(start)]
pub fn run_wasm() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }

    log::info!("Starting {} (WASM)", AppConfig::default().title);
}
