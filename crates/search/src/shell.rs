//! Hooks into the surrounding UI shell

use tracing::info;

/// What the coordinator asks of the application hosting it
pub trait Shell: Send + Sync + 'static {
    /// Forget any locally stored session (tokens, "logged in" markers)
    fn clear_session(&self);

    /// Navigate to the login entry point
    fn redirect_to_login(&self, login_url: &str);
}

/// Shell that only logs; for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopShell;

impl Shell for NoopShell {
    fn clear_session(&self) {
        info!("Session cleared");
    }

    fn redirect_to_login(&self, login_url: &str) {
        info!("Login required at {}", login_url);
    }
}
