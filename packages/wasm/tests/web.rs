//! Browser-side checks, run with `wasm-pack test --headless --firefox`
#![cfg(target_arch = "wasm32")]

use livepad_wasm::{compose_js, library_names_js, Layout};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn compose_through_bindings() {
    let html = compose_js("<p>Hi</p>", "", "", r#"["Backbone"]"#).unwrap();
    assert_eq!(
        html,
        "<html><head><style></style></head><body><p>Hi</p><script></script></body></html>"
    );
    assert!(compose_js("", "", "", "[").is_err());
}

#[wasm_bindgen_test]
fn layout_through_bindings() {
    let mut layout = Layout::new();
    assert_eq!(layout.toggle(), "vertical");
    assert!(layout.set_viewport_width(320.0));
    assert_eq!(layout.effective_mode(), "stacked");
    assert!(library_names_js().starts_with("[\"Tailwind CSS\""));
}
