//! New Post Component
//!
//! Draft textarea and publish button.

use leptos::*;
use thinpost::view::{NewPostForm, PLACEHOLDER, SUBMIT_LABEL};

use crate::state::DataSync;

/// Publish form component
#[component]
pub fn NewPost() -> impl IntoView {
    let datasync = use_context::<DataSync>().expect("DataSync not found");
    let form = create_rw_signal(NewPostForm::new());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if let Some(post) = form.try_update(NewPostForm::take_submission).flatten() {
            datasync.insert(&post);
        }
    };

    view! {
        <form method="POST" action="#" on:submit=on_submit>
            <div class="form-group">
                <textarea
                    class="form-control"
                    placeholder=PLACEHOLDER
                    prop:value=move || form.with(|form| form.draft().to_string())
                    on:input=move |ev| form.update(|form| form.set_draft(event_target_value(&ev)))
                />
            </div>
            <button type="submit" class="btn btn-primary">{SUBMIT_LABEL}</button>
        </form>
    }
}
