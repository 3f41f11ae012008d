//! Loading Component

use leptos::*;
use thinpost::view::LOADING_TEXT;

/// Placeholder shown until a realtime query delivers
#[component]
pub fn Loading() -> impl IntoView {
    view! { <div>{LOADING_TEXT}</div> }
}
