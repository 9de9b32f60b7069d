/// Titlest - Browser Extension for Per-Hostname Tab Titles
/// Built with Rust + WASM + Yew

mod background;
pub mod error;
pub mod host_data;
pub mod hostname;
pub mod messages;
pub mod store;
pub mod titles;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start listening for browser events in the background page
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
