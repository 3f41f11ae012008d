//! App Root Component
//!
//! Session gate and page layout.

use leptos::*;
use thinpost::auth::{datasync_url, Session};

use crate::components::{Loading, Navbar, NewPost, Posts};
use crate::state::session::{current_session, redirect_to_login};
use crate::state::{provide_datasync, BACKEND_HOST};

/// Root application component
///
/// Without a session the viewer is sent to the platform's login page.
#[component]
pub fn App() -> impl IntoView {
    match current_session() {
        Some(session) => view! { <Board session=session /> }.into_view(),
        None => {
            redirect_to_login(BACKEND_HOST);
            view! { <Loading /> }.into_view()
        }
    }
}

/// The logged in page
#[component]
fn Board(session: Session) -> impl IntoView {
    provide_datasync(&datasync_url(BACKEND_HOST, &session));
    provide_context(session);

    view! {
        <div class="container">
            <Navbar />

            <div class="card">
                <div class="card-body">
                    <NewPost />
                </div>
            </div>

            <Posts />
        </div>
    }
}
