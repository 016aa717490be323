//! Permission matrix: effective names plus derived wildcard markers.
//!
//! The same structure serves two consumers with different trust levels:
//! authorization decisions use [`PermissionMatrix::grants`] (exact effective
//! names only), while UI capability display may use the wildcard markers via
//! [`PermissionMatrix::contains`] / [`PermissionMatrix::names`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::permissions::{
    MODULE_DELIMITER, Permission, RECOGNIZED_ACTIONS, WILDCARD, is_wildcard_marker,
    parse_permission_name,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionMatrix {
    granted: BTreeSet<String>,
    wildcards: BTreeSet<String>,
}

impl PermissionMatrix {
    /// Build a matrix from effective permission names.
    ///
    /// Pure function of the input set: always rebuilt, never patched.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matrix = Self::default();
        for name in names {
            let name = name.as_ref();
            let parts = parse_permission_name(name);
            matrix.insert(name, parts.module, parts.action);
        }
        matrix
    }

    /// Like [`Self::from_names`], but an explicit [`Permission::module`] wins
    /// over the parsed prefix, matching the aggregator's module groups.
    pub fn from_permissions<'a, I>(permissions: I) -> Self
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        let mut matrix = Self::default();
        for permission in permissions {
            matrix.insert(
                &permission.name,
                permission.effective_module(),
                permission.action(),
            );
        }
        matrix
    }

    fn insert(&mut self, name: &str, module: Option<&str>, action: &str) {
        self.granted.insert(name.to_string());
        if is_wildcard_marker(name) {
            return;
        }
        let Some(module) = module else {
            return;
        };
        self.wildcards
            .insert(format!("{module}{MODULE_DELIMITER}{WILDCARD}"));
        if RECOGNIZED_ACTIONS.contains(&action) {
            self.wildcards
                .insert(format!("{WILDCARD}{MODULE_DELIMITER}{action}"));
        }
    }

    /// Exact membership among effective permissions. Wildcards never count.
    pub fn grants(&self, name: &str) -> bool {
        self.granted.contains(name)
    }

    /// Display-level membership: effective names and wildcard markers.
    pub fn contains(&self, name: &str) -> bool {
        self.granted.contains(name) || self.wildcards.contains(name)
    }

    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }

    pub fn wildcards(&self) -> impl Iterator<Item = &str> {
        self.wildcards.iter().map(String::as_str)
    }

    /// Flat sorted list of every entry (effective names and wildcards).
    pub fn names(&self) -> Vec<String> {
        self.granted
            .union(&self.wildcards)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.granted.union(&self.wildcards).count()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.wildcards.is_empty()
    }
}
