use serde::{Deserialize, Serialize};

/// Separator between the module prefix and the action in a permission name.
pub const MODULE_DELIMITER: char = '_';

/// Group for permissions whose name carries no module prefix.
pub const GENERAL_MODULE: &str = "general";

/// Guard used when none is given explicitly.
pub const DEFAULT_GUARD: &str = "web";

/// Wildcard segment used by derived matrix markers.
pub const WILDCARD: &str = "*";

/// Actions that get a cross-module `*_{action}` marker in the matrix.
pub const RECOGNIZED_ACTIONS: [&str; 5] = ["view", "create", "edit", "delete", "manage"];

/// A named capability within a guard (e.g. `"brand_edit"` on `"web"`).
///
/// `module` is usually left unset and inferred from the name prefix; set it
/// explicitly when the module name itself contains the delimiter
/// (`purchase_order_view` → module `purchase_order`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    pub guard: String,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            guard: DEFAULT_GUARD.to_string(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Explicit module if set, otherwise the parsed name prefix.
    pub fn effective_module(&self) -> Option<&str> {
        match self.module.as_deref() {
            Some(m) if !m.is_empty() => Some(m),
            _ => parse_permission_name(&self.name).module,
        }
    }

    /// Action part of the name, relative to [`Self::effective_module`].
    pub fn action(&self) -> &str {
        if let Some(module) = self.module.as_deref().filter(|m| !m.is_empty()) {
            if let Some(rest) = self
                .name
                .strip_prefix(module)
                .and_then(|r| r.strip_prefix(MODULE_DELIMITER))
            {
                return rest;
            }
        }
        parse_permission_name(&self.name).action
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Result of splitting a permission name into module and action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionParts<'a> {
    /// `None` means the permission belongs to the `general` group.
    pub module: Option<&'a str>,
    pub action: &'a str,
}

/// Split a permission name on the first [`MODULE_DELIMITER`].
///
/// Contract:
/// - `"brand_view"` → module `brand`, action `view`
/// - `"purchase_order_view"` → module `purchase`, action `order_view`
/// - `"dashboard"` (no delimiter) → no module, action `dashboard`
/// - `""` → no module, empty action
/// - `"_view"` (empty prefix) → no module, action `view`
/// - `"brand_"` (trailing delimiter) → module `brand`, empty action
pub fn parse_permission_name(name: &str) -> PermissionParts<'_> {
    match name.split_once(MODULE_DELIMITER) {
        Some((module, action)) if !module.is_empty() => PermissionParts {
            module: Some(module),
            action,
        },
        Some((_, action)) => PermissionParts { module: None, action },
        None => PermissionParts {
            module: None,
            action: name,
        },
    }
}

/// Whether `name` is itself a derived wildcard marker (any `*` segment).
pub fn is_wildcard_marker(name: &str) -> bool {
    name.split(MODULE_DELIMITER).any(|segment| segment == WILDCARD)
}
