//! Post Component

use leptos::*;
use thinpost::models::Post;
use thinpost::view::PostCard as PostCardView;

use super::LikeButton;

/// One post with its timestamp and like button
#[component]
pub fn PostCard(post: Post) -> impl IntoView {
    let card = PostCardView::new(&post);

    view! {
        <div class="card">
            <div class="card-body">
                <p class="card-text">{card.body}</p>

                <p class="card-text text-muted">
                    <small>{card.created_at}</small>
                </p>

                <LikeButton post_id=card.id />
            </div>
        </div>
    }
}
