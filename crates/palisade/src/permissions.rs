//! Permission checkers and the setup-stage factory that produces them.

use std::sync::Arc;

use crate::player::Player;

/// Answers permission queries for one player.
///
/// Evaluation policy lives entirely behind this trait — the proxy only
/// installs a checker during login and consults it later.
pub trait PermissionChecker: Send + Sync + 'static {
    fn has_permission(&self, permission: &str) -> bool;
}

/// The system-wide default checker: denies everything.
///
/// Installed when no extension provides a checker, or when the one
/// provided turns out to be unusable.
pub struct DefaultPermissionChecker;

impl PermissionChecker for DefaultPermissionChecker {
    fn has_permission(&self, _permission: &str) -> bool {
        false
    }
}

/// The result of the permissions-setup stage: which provider answered,
/// and a factory producing the checker to install for a given player.
///
/// The factory is fallible on purpose. A misbehaving provider that
/// cannot actually produce a checker is a configuration bug in that
/// provider, not a reason to fail the login — the caller reports it and
/// falls back to the default checker.
pub struct PermissionsSetup {
    provider: String,
    factory: Box<dyn Fn(&Player) -> Option<Arc<dyn PermissionChecker>> + Send + Sync>,
}

impl PermissionsSetup {
    pub fn new(
        provider: impl Into<String>,
        factory: impl Fn(&Player) -> Option<Arc<dyn PermissionChecker>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            provider: provider.into(),
            factory: Box::new(factory),
        }
    }

    /// Name of the provider that supplied this setup, for diagnostics.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Produces the checker for `player`, or `None` if the provider is
    /// unable to construct one.
    pub fn create_checker(&self, player: &Player) -> Option<Arc<dyn PermissionChecker>> {
        (self.factory)(player)
    }
}

impl Default for PermissionsSetup {
    fn default() -> Self {
        Self::new("default", |_| Some(Arc::new(DefaultPermissionChecker)))
    }
}
