use livepad_composer::{DocumentComposer, LibraryRegistry, LibraryToggleSet};
use livepad_editor::{LayoutManager, LayoutMode, Point, PointerKind};
use std::sync::Arc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn compose_document(
    markup: &str,
    styles: &str,
    script: &str,
    libraries_json: &str,
) -> Result<String, String> {
    let names: Vec<String> = if libraries_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(libraries_json).map_err(|e| format!("Invalid library list: {}", e))?
    };

    // Unknown names are dropped by the composer
    let toggles: LibraryToggleSet = names.into_iter().map(|name| (name, true)).collect();
    let registry = Arc::new(LibraryRegistry::builtin());

    Ok(DocumentComposer::new(registry)
        .compose(markup, styles, script, &toggles)
        .into_string())
}

/// Compose a preview document. `libraries` is a JSON array of enabled
/// library names, e.g. `["jQuery"]`. Names outside the catalog are ignored;
/// only malformed JSON is an error.
#[wasm_bindgen(js_name = compose)]
pub fn compose_js(
    markup: &str,
    styles: &str,
    script: &str,
    libraries: &str,
) -> Result<String, JsValue> {
    compose_document(markup, styles, script, libraries).map_err(|e| JsValue::from_str(&e))
}

fn catalog_json() -> String {
    let registry = LibraryRegistry::builtin();
    let names: Vec<&str> = registry.names().collect();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}

/// Library names in catalog order, as a JSON array
#[wasm_bindgen(js_name = libraryNames)]
pub fn library_names_js() -> String {
    catalog_json()
}

/// Layout state machine for a page embedding the playground
#[wasm_bindgen]
pub struct Layout {
    inner: LayoutManager,
}

#[wasm_bindgen]
impl Layout {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Layout {
        Layout {
            inner: LayoutManager::new(LayoutMode::default()),
        }
    }

    /// Preferred arrangement after toggling
    pub fn toggle(&mut self) -> String {
        self.inner.toggle_layout();
        mode_name(self.inner.mode()).to_string()
    }

    #[wasm_bindgen(getter, js_name = effectiveMode)]
    pub fn effective_mode(&self) -> String {
        mode_name(self.inner.effective_mode()).to_string()
    }

    #[wasm_bindgen(getter, js_name = previewSize)]
    pub fn preview_size(&self) -> f64 {
        self.inner.preview_size()
    }

    #[wasm_bindgen(js_name = setViewportWidth)]
    pub fn set_viewport_width(&mut self, width: f64) -> bool {
        self.inner.on_viewport_resize(width)
    }

    #[wasm_bindgen(js_name = beginResize)]
    pub fn begin_resize(&mut self, touch: bool, x: f64, y: f64, extent: f64) -> bool {
        let kind = if touch {
            PointerKind::Touch
        } else {
            PointerKind::Mouse
        };
        self.inner.begin_resize(kind, Point::new(x, y), extent)
    }

    #[wasm_bindgen(js_name = updateResize)]
    pub fn update_resize(&mut self, x: f64, y: f64) -> Option<f64> {
        self.inner.update_resize(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = endResize)]
    pub fn end_resize(&mut self) {
        self.inner.end_resize();
    }

    #[wasm_bindgen(js_name = cancelResize)]
    pub fn cancel_resize(&mut self) {
        self.inner.cancel_resize();
    }

    /// Full state as JSON
    pub fn state(&self) -> String {
        serde_json::to_string(&self.inner.state()).unwrap_or_default()
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

fn mode_name(mode: LayoutMode) -> &'static str {
    match mode {
        LayoutMode::Horizontal => "horizontal",
        LayoutMode::Vertical => "vertical",
        LayoutMode::Stacked => "stacked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_with_library() {
        let html = compose_document("<p>Hi</p>", "p{color:red}", "", r#"["jQuery"]"#).unwrap();
        assert_eq!(
            html,
            "<html><head><style>p{color:red}</style>\
             <script src=\"https://code.jquery.com/jquery-3.7.1.min.js\"></script>\
             </head><body><p>Hi</p><script></script></body></html>"
        );
    }

    #[test]
    fn test_compose_without_libraries() {
        let html = compose_document("", "", "", "").unwrap();
        assert_eq!(
            html,
            "<html><head><style></style></head><body><script></script></body></html>"
        );
    }

    #[test]
    fn test_compose_rejects_malformed_list() {
        let err = compose_document("", "", "", "not json").unwrap_err();
        assert!(err.starts_with("Invalid library list"));
    }

    #[test]
    fn test_compose_drops_unknown_libraries() {
        let html = compose_document("<p>Hi</p>", "", "", r#"["Backbone", "jQuery"]"#).unwrap();
        assert_eq!(
            html,
            "<html><head><style></style>\
             <script src=\"https://code.jquery.com/jquery-3.7.1.min.js\"></script>\
             </head><body><p>Hi</p><script></script></body></html>"
        );
    }

    #[test]
    fn test_library_names() {
        let names: Vec<String> = serde_json::from_str(&library_names_js()).unwrap();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "Tailwind CSS");
    }

    #[test]
    fn test_layout_handle() {
        let mut layout = Layout::new();
        assert_eq!(layout.toggle(), "vertical");

        assert!(layout.set_viewport_width(400.0));
        assert_eq!(layout.effective_mode(), "stacked");
        assert_eq!(layout.toggle(), "vertical");

        layout.set_viewport_width(1200.0);
        assert!(layout.begin_resize(false, 0.0, 300.0, 600.0));
        assert_eq!(layout.update_resize(0.0, 360.0), Some(40.0));
        layout.end_resize();
        assert!(layout.state().contains("\"previewSize\":40.0"));
    }
}
