use crate::errors::AppError;
use crate::middleware::session::Session;

/// Whether a role claim names the administrator role (`POC-Admin` in the
/// identity provider). Case-insensitive; other roles grant nothing by themselves.
pub fn is_admin_role(role: &str) -> bool {
    role.eq_ignore_ascii_case("poc-admin") || role.eq_ignore_ascii_case("admin")
}

/// Permission matching.
/// `*` grants everything; `resource:*` grants every `resource:action`.
pub fn check_permission(granted: &[String], required: &str) -> bool {
    if granted.iter().any(|p| p == "*" || p == required) {
        return true;
    }

    if let Some((resource, _)) = required.split_once(':') {
        let resource_wildcard = format!("{}:*", resource);
        if granted.iter().any(|p| p == &resource_wildcard) {
            return true;
        }
    }

    false
}

/// Authorization view of a session.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub principal: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl AccessContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            principal: session.principal_id().to_string(),
            roles: session.claims.roles.clone(),
            permissions: session.claims.permissions.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| is_admin_role(r))
    }

    /// Admin role bypasses permission checks.
    pub fn has_permission(&self, required: &str) -> bool {
        self.is_admin() || check_permission(&self.permissions, required)
    }
}

/// Reject with 403 unless the session carries `permission`.
pub fn enforce(session: &Session, permission: &str) -> Result<(), AppError> {
    let ctx = AccessContext::from_session(session);
    if ctx.has_permission(permission) {
        return Ok(());
    }

    tracing::warn!(
        principal = %ctx.principal,
        roles = ?ctx.roles,
        permission,
        "RBAC access denied"
    );
    Err(AppError::Forbidden(format!(
        "the '{}' permission is required",
        permission
    )))
}

// ── Tests ───────────────────────────────────────────────────────
