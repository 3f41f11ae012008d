use crate::models::NewPost;

/// Placeholder of the draft field
pub const PLACEHOLDER: &str = "What's new?";

/// Label of the submit button
pub const SUBMIT_LABEL: &str = "Publish";

/// The publish form; the only component with local state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPostForm {
    draft: String,
}

impl NewPostForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Take the draft for publishing and clear it
    ///
    /// Any non-empty draft is published as typed, whitespace included.
    pub fn take_submission(&mut self) -> Option<NewPost> {
        if self.draft.is_empty() {
            return None;
        }
        Some(NewPost {
            body: std::mem::take(&mut self.draft),
        })
    }

    /// Publish the draft; the draft is cleared before the platform answers
    #[cfg(feature = "native")]
    pub async fn submit<B>(
        &mut self,
        backend: &B,
    ) -> crate::error::BackendResult<Option<crate::models::Post>>
    where
        B: crate::backend::Backend + ?Sized,
    {
        use crate::backend::BackendExt;
        use crate::models::Post;

        let Some(payload) = self.take_submission() else {
            return Ok(None);
        };
        let post = backend.insert::<NewPost, Post>(&payload).await?;
        Ok(Some(post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_submission_clears_draft() {
        let mut form = NewPostForm::new();
        form.set_draft("hello world");
        assert_eq!(
            form.take_submission(),
            Some(NewPost {
                body: "hello world".to_string()
            })
        );
        assert_eq!(form.draft(), "");
        assert_eq!(form.take_submission(), None);
    }

    #[test]
    fn test_whitespace_draft_is_submitted() {
        let mut form = NewPostForm::new();
        form.set_draft("  \n");
        assert_eq!(
            form.take_submission(),
            Some(NewPost {
                body: "  \n".to_string()
            })
        );
        assert_eq!(form.draft(), "");
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_submit_creates_one_post() {
        use crate::backend::MemoryBackend;

        let backend = MemoryBackend::logged_in("ada@example.com");
        let mut form = NewPostForm::new();
        form.set_draft("first!");

        let post = form.submit(&backend).await.unwrap().unwrap();
        assert_eq!(post.body, "first!");
        assert_eq!(form.draft(), "");

        let calls = backend.created();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "posts");
        assert_eq!(calls[0].1["body"], serde_json::json!("first!"));
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_submit_whitespace_creates_one_post() {
        use crate::backend::MemoryBackend;

        let backend = MemoryBackend::logged_in("ada@example.com");
        let mut form = NewPostForm::new();
        form.set_draft("   ");

        let post = form.submit(&backend).await.unwrap().unwrap();
        assert_eq!(post.body, "   ");
        assert_eq!(form.draft(), "");
        assert_eq!(backend.created().len(), 1);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_submit_empty_does_nothing() {
        use crate::backend::MemoryBackend;

        let backend = MemoryBackend::logged_in("ada@example.com");
        let mut form = NewPostForm::new();
        assert_eq!(form.submit(&backend).await.unwrap(), None);
        assert!(backend.created().is_empty());
    }
}
