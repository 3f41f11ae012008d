//! UI Components
//!
//! Leptos components for the board.

pub mod like_button;
pub mod loading;
pub mod navbar;
pub mod new_post;
pub mod post;
pub mod posts;

pub use like_button::LikeButton;
pub use loading::Loading;
pub use navbar::Navbar;
pub use new_post::NewPost;
pub use post::PostCard;
pub use posts::Posts;
