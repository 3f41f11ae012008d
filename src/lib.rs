//! # thinpost
//!
//! Posts with likes - a realtime client for a Thin Backend (IHP DataSync)
//! host. The platform owns storage, realtime fan-out, query execution and
//! authentication; this crate speaks its protocol and shapes what the page
//! shows.
//!
//! ## Modules
//!
//! - [`query`]: Query builder and `QueryState`
//! - [`datasync`]: DataSync messages, result sets and the protocol driver
//! - [`auth`]: Login redirects and sessions
//! - [`backend`]: The `Backend` trait with remote and in-memory implementations
//! - [`view`]: Navbar, post list, post, like button and new-post form
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thinpost::backend::{Backend, RemoteBackend};
//! use thinpost::config::Config;
//! use thinpost::view::{NewPostForm, PostList};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = RemoteBackend::from_config(&Config::load_default()).await?;
//!
//!     // Publish
//!     let mut form = NewPostForm::new();
//!     form.set_draft("Hello from Rust");
//!     form.submit(&backend).await?;
//!
//!     // Realtime post list
//!     let mut posts = backend.subscribe(PostList::query()).await?;
//!     posts.ready().await?;
//!     for post in PostList::from_state(&posts.state())?.posts() {
//!         println!("{}", post.body);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod datasync;
pub mod error;
pub mod models;
pub mod query;
pub mod view;

#[cfg(feature = "native")]
pub mod backend;
#[cfg(feature = "native")]
pub mod config;

// Re-export top-level types for convenience
pub use auth::Session;
pub use error::{BackendError, BackendResult};
pub use models::{Like, NewLike, NewPost, Post, Record, Table, User};
pub use query::{query, Query, QueryState};

#[cfg(feature = "native")]
pub use backend::{Backend, BackendExt, MemoryBackend, RemoteBackend, Subscription};
#[cfg(feature = "native")]
pub use config::{Config, ConfigError};
