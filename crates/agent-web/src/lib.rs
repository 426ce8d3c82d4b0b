//! search-chat Web Frontend
//!
//! Leptos-based WASM frontend: one chat page with a settings sidebar.

mod api;
mod app;
mod components;
mod pages;
mod stream;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
