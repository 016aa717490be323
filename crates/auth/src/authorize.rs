use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::PermissionMatrix;
use crate::permissions::{MODULE_DELIMITER, WILDCARD, parse_permission_name};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// `required` holds the first missing permission for all-of checks and
    /// the whole requested list for any-of checks.
    #[error("permission denied: requires {}", .required.join(" | "))]
    PermissionDenied { required: Vec<String> },
}

impl AuthzError {
    pub fn required(&self) -> &[String] {
        match self {
            AuthzError::PermissionDenied { required } => required,
        }
    }
}

/// Contract for actions that declare the permissions they need.
///
/// Controllers check these before running any domain logic.
pub trait RequiresPermissions {
    fn required_permissions(&self) -> &[&'static str];
}

/// Stateless permission checks over a matrix recomputed by the caller.
///
/// Decisions only use exact effective names ([`PermissionMatrix::grants`]);
/// wildcard markers are display metadata and are never consulted here.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationGate<'m> {
    matrix: &'m PermissionMatrix,
}

impl<'m> AuthorizationGate<'m> {
    pub fn new(matrix: &'m PermissionMatrix) -> Self {
        Self { matrix }
    }

    /// Every permission must be granted. Stops at the first missing one.
    pub fn require_all<S: AsRef<str>>(&self, permissions: &[S]) -> Result<(), AuthzError> {
        for permission in permissions {
            let permission = permission.as_ref();
            if !self.matrix.grants(permission) {
                warn!(permission, "permission denied");
                return Err(AuthzError::PermissionDenied {
                    required: vec![permission.to_string()],
                });
            }
        }
        Ok(())
    }

    /// At least one permission must be granted. An empty list is denied.
    pub fn require_any<S: AsRef<str>>(&self, permissions: &[S]) -> Result<(), AuthzError> {
        if permissions.iter().any(|p| self.matrix.grants(p.as_ref())) {
            return Ok(());
        }
        let required: Vec<String> = permissions.iter().map(|p| p.as_ref().to_string()).collect();
        warn!(required = ?required, "permission denied (none of)");
        Err(AuthzError::PermissionDenied { required })
    }

    pub fn require(&self, permission: &str) -> Result<(), AuthzError> {
        self.require_all(&[permission])
    }

    pub fn authorize_action<A>(&self, action: &A) -> Result<(), AuthzError>
    where
        A: RequiresPermissions + ?Sized,
    {
        self.require_all(action.required_permissions())
    }

    pub fn explain(&self, required: &str) -> AuthorizationExplanation {
        explain(self.matrix, required)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a single-permission check was (or would be) allowed or denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    /// Wildcard markers in the matrix that cover the permission. Shown for
    /// context only; they do not grant anything.
    pub display_wildcards: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Explain the decision for `required` against `matrix`.
pub fn explain(matrix: &PermissionMatrix, required: &str) -> AuthorizationExplanation {
    let parts = parse_permission_name(required);
    let mut display_wildcards = Vec::new();
    if let Some(module) = parts.module {
        let module_marker = format!("{module}{MODULE_DELIMITER}{WILDCARD}");
        if matrix.contains(&module_marker) {
            display_wildcards.push(module_marker);
        }
        let action_marker = format!("{WILDCARD}{MODULE_DELIMITER}{}", parts.action);
        if !parts.action.is_empty() && matrix.contains(&action_marker) {
            display_wildcards.push(action_marker);
        }
    }

    if matrix.grants(required) {
        return AuthorizationExplanation {
            required_permission: required.to_string(),
            granted: true,
            reason: format!("Principal has effective permission '{required}'"),
            display_wildcards,
            suggestions: Vec::new(),
        };
    }

    let mut suggestions = vec![
        format!("Assign a role that grants the '{required}' permission"),
        format!("Grant the '{required}' permission directly to the user"),
    ];
    if !display_wildcards.is_empty() {
        suggestions.push(format!(
            "Wildcards {display_wildcards:?} are display-only and never satisfy a check"
        ));
    }

    AuthorizationExplanation {
        required_permission: required.to_string(),
        granted: false,
        reason: format!("Missing required permission: '{required}'"),
        display_wildcards,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matrix(names: &[&str]) -> PermissionMatrix {
        PermissionMatrix::from_names(names)
    }

    #[test]
    fn require_all_reports_first_missing() {
        let m = matrix(&["brand_view", "brand_edit"]);
        let gate = AuthorizationGate::new(&m);

        assert!(gate.require_all(&["brand_view", "brand_edit"]).is_ok());

        let err = gate
            .require_all(&["brand_view", "brand_delete", "product_view"])
            .unwrap_err();
        assert_eq!(
            err,
            AuthzError::PermissionDenied {
                required: vec!["brand_delete".to_string()]
            }
        );
    }

    #[test]
    fn require_all_empty_list_passes() {
        let m = matrix(&[]);
        assert!(AuthorizationGate::new(&m).require_all::<&str>(&[]).is_ok());
    }

    #[test]
    fn require_any_reports_whole_list() {
        let m = matrix(&["product_view"]);
        let gate = AuthorizationGate::new(&m);

        assert!(gate.require_any(&["brand_view", "product_view"]).is_ok());

        let err = gate.require_any(&["brand_view", "brand_edit"]).unwrap_err();
        assert_eq!(err.required(), ["brand_view", "brand_edit"]);
        assert!(gate.require_any::<&str>(&[]).is_err());
    }

    #[test]
    fn wildcards_never_authorize() {
        let m = matrix(&["brand_view"]);
        let gate = AuthorizationGate::new(&m);
        assert!(gate.require("brand_*").is_err());
        assert!(gate.require("*_view").is_err());
        assert!(gate.require_any(&["brand_*", "*_view"]).is_err());
    }

    #[test]
    fn require_single() {
        let m = matrix(&["brand_view"]);
        let gate = AuthorizationGate::new(&m);
        assert!(gate.require("brand_view").is_ok());
        assert_eq!(
            gate.require("brand_edit").unwrap_err().to_string(),
            "permission denied: requires brand_edit"
        );
    }

    struct DeleteBrand;

    impl RequiresPermissions for DeleteBrand {
        fn required_permissions(&self) -> &[&'static str] {
            &["brand_view", "brand_delete"]
        }
    }

    #[test]
    fn action_requirements_are_all_of() {
        let partial = matrix(&["brand_view"]);
        assert!(AuthorizationGate::new(&partial).authorize_action(&DeleteBrand).is_err());

        let full = matrix(&["brand_view", "brand_delete"]);
        assert!(AuthorizationGate::new(&full).authorize_action(&DeleteBrand).is_ok());
    }

    #[test]
    fn explain_mentions_display_wildcards() {
        let m = matrix(&["brand_view"]);
        let denied = explain(&m, "brand_edit");
        assert!(!denied.granted);
        assert_eq!(denied.display_wildcards, ["brand_*"]);
        assert_eq!(denied.suggestions.len(), 3);

        let granted = explain(&m, "brand_view");
        assert!(granted.granted);
        assert_eq!(granted.display_wildcards, ["brand_*", "*_view"]);
    }

    proptest! {
        #[test]
        fn empty_user_is_always_denied(required in prop::collection::vec("[a-z_*]{0,10}", 0..6)) {
            let m = PermissionMatrix::default();
            let gate = AuthorizationGate::new(&m);
            let result = gate.require_any(&required);
            prop_assert!(
                matches!(result, Err(AuthzError::PermissionDenied { .. })),
                "expected denial"
            );
        }
    }
}
