//! Post List Component

use leptos::*;
use thinpost::view::PostList;

use super::{Loading, PostCard};
use crate::state::use_query;

/// Every post, most recent first
#[component]
pub fn Posts() -> impl IntoView {
    let state = use_query(PostList::query());

    let list = create_memo(move |_| {
        state.with(|state| {
            PostList::from_state(state).unwrap_or_else(|e| {
                web_sys::console::error_1(&format!("Failed to read posts: {}", e).into());
                PostList::Posts(Vec::new())
            })
        })
    });
    // Keep the rows mounted across deliveries so each like button keeps its query
    let loading = create_memo(move |_| list.with(PostList::is_loading));

    move || {
        if loading.get() {
            view! { <Loading /> }.into_view()
        } else {
            view! {
                <div class="d-flex" style="flex-direction: column; align-items: center">
                    <For
                        each=move || list.with(|list| list.posts().to_vec())
                        key=|post| post.id
                        children=|post| view! { <PostCard post=post /> }
                    />
                </div>
            }
            .into_view()
        }
    }
}
