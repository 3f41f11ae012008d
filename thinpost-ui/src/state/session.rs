//! Session Storage
//!
//! Keeps the platform session in local storage and captures it from the
//! login redirect.

use thinpost::auth::{login_url, session_from_callback, strip_callback_params, Session};
use thinpost::view::Navbar;

const SESSION_KEY: &str = "thinpost.session";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

/// The current session: from the login redirect if present, else from storage
pub fn current_session() -> Option<Session> {
    if let Some(session) = take_callback_session() {
        save_session(&session);
        return Some(session);
    }

    let stored = local_storage()?.get_item(SESSION_KEY).ok().flatten()?;
    decode_session(&stored)
}

/// Read login parameters from the URL and remove them from the address bar
fn take_callback_session() -> Option<Session> {
    let window = web_sys::window()?;
    let location = window.location();
    let search = location.search().ok()?;

    match session_from_callback(&search) {
        Ok(Some(session)) => {
            let path = location.pathname().unwrap_or_default();
            let clean = format!("{}{}", path, strip_callback_params(&search));
            if let Ok(history) = window.history() {
                let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&clean));
            }
            Some(session)
        }
        Ok(None) => None,
        Err(e) => {
            web_sys::console::error_1(&format!("Ignoring login redirect: {}", e).into());
            None
        }
    }
}

pub fn save_session(session: &Session) {
    let Some(storage) = local_storage() else {
        return;
    };
    match serde_json::to_string(session) {
        Ok(json) => {
            let _ = storage.set_item(SESSION_KEY, &json);
        }
        Err(e) => web_sys::console::error_1(&format!("Failed to store session: {}", e).into()),
    }
}

pub fn clear_session() {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(SESSION_KEY);
    }
}

/// Send the browser to the platform's login page, coming back here after
pub fn redirect_to_login(host: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let here = location.href().unwrap_or_default();
    if let Err(e) = location.set_href(&login_url(host, &here)) {
        web_sys::console::error_1(&format!("Login redirect failed: {:?}", e).into());
    }
}

/// Send the browser to the platform's logout page so its session ends too
pub fn redirect_to_logout(host: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().set_href(&Navbar::logout_target(host)) {
        web_sys::console::error_1(&format!("Logout redirect failed: {:?}", e).into());
    }
}

fn decode_session(stored: &str) -> Option<Session> {
    serde_json::from_str(stored).ok()
}
