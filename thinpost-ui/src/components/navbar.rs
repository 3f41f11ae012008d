//! Navigation Component
//!
//! Top bar with the logged in user's email and logout.

use leptos::*;
use thinpost::auth::Session;
use thinpost::models::{Table, User};
use thinpost::query::query;
use thinpost::view::{menu_class, Navbar as NavbarView, LOGOUT_LABEL};

use crate::state::session::{clear_session, redirect_to_logout};
use crate::state::{use_query, DataSync, BACKEND_HOST};

/// Navigation header component
#[component]
pub fn Navbar() -> impl IntoView {
    let session = use_context::<Session>().expect("Session not found");
    let datasync = use_context::<DataSync>().expect("DataSync not found");

    let users = use_query(
        query(User::NAME)
            .filter_where("id", session.user_id)
            .limit(1)
            .build(),
    );
    let email = move || {
        users.with(|state| {
            let user = state
                .ready()
                .and_then(|records| records.first())
                .and_then(|record| User::from_record(record).ok());
            NavbarView::new(user.as_ref()).email().to_string()
        })
    };

    // Toggled here since Bootstrap's dropdown script is not loaded
    let menu_open = create_rw_signal(false);
    let on_toggle = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        menu_open.update(|open| *open = !*open);
    };

    let on_logout = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        menu_open.set(false);
        datasync.close();
        clear_session();
        redirect_to_logout(BACKEND_HOST);
    };

    view! {
        <nav class="navbar navbar-expand-lg navbar-light bg-light">
            <div class="collapse navbar-collapse">
                <ul class="navbar-nav ml-auto">
                    <li class="nav-item dropdown">
                        <a
                            class="nav-link dropdown-toggle"
                            href="#"
                            role="button"
                            aria-expanded=move || menu_open.get().to_string()
                            on:click=on_toggle
                        >
                            {email}
                        </a>
                        <div class=move || menu_class(menu_open.get())>
                            <a class="dropdown-item" href="#" on:click=on_logout>
                                {LOGOUT_LABEL}
                            </a>
                        </div>
                    </li>
                </ul>
            </div>
        </nav>
    }
}
