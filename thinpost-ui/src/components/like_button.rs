//! Like Button Component

use leptos::*;
use thinpost::view::LikeButton as LikeButtonView;
use uuid::Uuid;

use crate::state::{use_query, DataSync};

/// `♡ n`; renders nothing until the likes have loaded
#[component]
pub fn LikeButton(post_id: Uuid) -> impl IntoView {
    let datasync = use_context::<DataSync>().expect("DataSync not found");
    let likes = use_query(LikeButtonView::query(post_id));

    move || {
        let button = likes.with(|state| LikeButtonView::from_state(post_id, state))?;
        let datasync = datasync.clone();
        Some(view! {
            <button class="btn btn-link" on:click=move |_| datasync.insert(&button.like())>
                {button.label()}
            </button>
        })
    }
}
