//! Views
//!
//! Renderer-independent state of each component of the page. The Leptos UI
//! and the CLI both draw from these, so the rules for what appears (loading
//! states, ordering, counts, labels) live in one place.
//!
//! - [`Navbar`]: session email and logout
//! - [`PostList`]: every post, most recent first
//! - [`PostCard`]: one post with its formatted timestamp
//! - [`LikeButton`]: like count and the like action
//! - [`NewPostForm`]: the draft and the publish action

mod like_button;
mod navbar;
mod new_post;
mod post;
mod post_list;

pub use like_button::LikeButton;
pub use navbar::{menu_class, Navbar, LOGOUT_LABEL};
pub use new_post::{NewPostForm, PLACEHOLDER, SUBMIT_LABEL};
pub use post::{format_timestamp, PostCard};
pub use post_list::PostList;

/// Text shown while a realtime query has not delivered yet
pub const LOADING_TEXT: &str = "Loading";
