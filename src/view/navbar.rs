use crate::models::User;

/// Label of the logout entry
pub const LOGOUT_LABEL: &str = "Logout";

/// Top bar: who is logged in, with a dropdown holding the logout entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navbar {
    email: Option<String>,
    menu_open: bool,
}

impl Navbar {
    pub fn new(user: Option<&User>) -> Self {
        Self {
            email: user.map(|u| u.email.clone()),
            menu_open: false,
        }
    }

    /// Empty until the user record has loaded
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Clicking the email opens or closes the dropdown
    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    /// Classes of the dropdown element; `show` makes it visible
    pub fn menu_class(&self) -> &'static str {
        menu_class(self.menu_open)
    }

    /// Where the browser goes once local state is cleared
    pub fn logout_target(host: &str) -> String {
        crate::auth::logout_url(host)
    }

    /// End the session
    #[cfg(feature = "native")]
    pub async fn logout<B>(&self, backend: &B) -> crate::error::BackendResult<()>
    where
        B: crate::backend::Backend + ?Sized,
    {
        tracing::info!(email = self.email(), "Logging out");
        backend.logout().await
    }
}

pub fn menu_class(open: bool) -> &'static str {
    if open {
        "dropdown-menu show"
    } else {
        "dropdown-menu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_email() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
        };
        assert_eq!(Navbar::new(Some(&user)).email(), "ada@example.com");
        assert_eq!(Navbar::new(None).email(), "");
    }

    #[test]
    fn test_menu_starts_hidden_and_toggles() {
        let mut navbar = Navbar::new(None);
        assert!(!navbar.is_menu_open());
        assert_eq!(navbar.menu_class(), "dropdown-menu");

        navbar.toggle_menu();
        assert!(navbar.is_menu_open());
        assert_eq!(navbar.menu_class(), "dropdown-menu show");

        navbar.toggle_menu();
        assert_eq!(navbar.menu_class(), "dropdown-menu");
    }

    #[test]
    fn test_logout_target_ends_platform_session() {
        assert_eq!(
            Navbar::logout_target("https://app.thinbackend.app/"),
            "https://app.thinbackend.app/DeleteSession"
        );
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_logout_ends_session() {
        use crate::backend::{Backend, MemoryBackend};

        let backend = MemoryBackend::logged_in("ada@example.com");
        let user = backend.current_user().await.unwrap();
        let navbar = Navbar::new(user.as_ref());
        navbar.logout(&backend).await.unwrap();
        assert_eq!(backend.current_user().await.unwrap(), None);
    }
}
