//! thinpost Board
//!
//! Posts with likes, built with Leptos (WASM) on a Thin Backend host.
//!
//! # Features
//!
//! - Login through the platform's login page
//! - Realtime post list and like counts over DataSync
//! - Publishing and liking
//!
//! # Architecture
//!
//! This is a client-side rendered (CSR) Leptos application that compiles to
//! WebAssembly. All data goes through one DataSync websocket; the protocol
//! and view rules come from the `thinpost` crate.

use leptos::*;
use wasm_bindgen::JsCast;

mod app;
mod components;
mod state;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    let root = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id("app"))
        .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());

    match root {
        Some(root) => mount_to(root, || view! { <app::App /> }),
        None => mount_to_body(|| view! { <app::App /> }),
    }
}
