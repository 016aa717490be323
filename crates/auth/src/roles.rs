use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::{DEFAULT_GUARD, Permission};

/// A named bundle of permissions within a guard. Roles do not nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub guard: String,
    /// Ordered set: insertion order kept, names unique.
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: DEFAULT_GUARD.to_string(),
            permissions: Vec::new(),
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    /// Add a permission, ignoring it when a permission with the same name is
    /// already assigned.
    pub fn grant(mut self, permission: Permission) -> Self {
        if !self.permissions.iter().any(|p| p.name == permission.name) {
            self.permissions.push(permission);
        }
        self
    }

    pub fn with_permissions<I>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        permissions.into_iter().fold(self, Role::grant)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A role together with its hierarchy score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRole {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyParseError {
    #[error("invalid role rank entry '{0}' (expected name=score)")]
    InvalidEntry(String),
}

/// Ranked mapping `role name → score` (higher = more privileged).
///
/// Kept as injected configuration so new roles only require a new entry.
/// Roles missing from the hierarchy score 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHierarchy {
    ranks: Vec<(String, u32)>,
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::empty()
            .with_rank("super_admin", 100)
            .with_rank("admin", 90)
            .with_rank("manager", 70)
            .with_rank("supervisor", 50)
            .with_rank("staff", 30)
            .with_rank("viewer", 20)
            .with_rank("guest", 10)
    }
}

impl RoleHierarchy {
    pub fn empty() -> Self {
        Self { ranks: Vec::new() }
    }

    /// Set (or replace) the score of a role.
    pub fn with_rank(mut self, role: impl Into<String>, score: u32) -> Self {
        let role = role.into();
        match self.ranks.iter_mut().find(|(name, _)| *name == role) {
            Some(entry) => entry.1 = score,
            None => self.ranks.push((role, score)),
        }
        self
    }

    /// Parse `"super_admin=100,admin=90,guest=10"`. Blank entries are skipped.
    pub fn parse(spec: &str) -> Result<Self, HierarchyParseError> {
        let mut hierarchy = Self::empty();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, score) = entry
                .split_once('=')
                .ok_or_else(|| HierarchyParseError::InvalidEntry(entry.to_string()))?;
            let name = name.trim();
            let score: u32 = score
                .trim()
                .parse()
                .map_err(|_| HierarchyParseError::InvalidEntry(entry.to_string()))?;
            if name.is_empty() {
                return Err(HierarchyParseError::InvalidEntry(entry.to_string()));
            }
            hierarchy = hierarchy.with_rank(name, score);
        }
        Ok(hierarchy)
    }

    pub fn score(&self, role: &str) -> u32 {
        self.rank(role).unwrap_or(0)
    }

    /// Score of a role listed in the hierarchy, `None` when unranked.
    pub fn rank(&self, role: &str) -> Option<u32> {
        self.ranks
            .iter()
            .find(|(name, _)| name == role)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ranks.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// Role with the maximum score.
    ///
    /// Unranked roles score 0 and lose ties against ranked ones; among equal
    /// candidates the first encountered wins. `None` only for an empty input.
    pub fn highest<'a, I>(&self, roles: I) -> Option<RankedRole>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(RankedRole, bool)> = None;
        for role in roles {
            let rank = self.rank(role);
            let key = (rank.unwrap_or(0), rank.is_some());
            match &best {
                Some((current, ranked)) if (current.score, *ranked) >= key => {}
                _ => {
                    best = Some((
                        RankedRole {
                            name: role.to_string(),
                            score: key.0,
                        },
                        key.1,
                    ))
                }
            }
        }
        best.map(|(role, _)| role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn highest_picks_max_score() {
        let h = RoleHierarchy::default();
        let top = h.highest(["staff", "admin", "guest"]).unwrap();
        assert_eq!(top.name, "admin");
        assert_eq!(top.score, 90);
    }

    #[test]
    fn unranked_roles_lose_to_ranked() {
        let h = RoleHierarchy::default();
        let top = h.highest(["cashier", "guest"]).unwrap();
        assert_eq!(top.name, "guest");
    }

    #[test]
    fn ties_keep_first_encountered() {
        let h = RoleHierarchy::empty().with_rank("a", 50).with_rank("b", 50);
        assert_eq!(h.highest(["b", "a"]).unwrap().name, "b");
        assert_eq!(h.highest(["x", "y"]).unwrap().name, "x");
        assert!(h.highest(std::iter::empty::<&str>()).is_none());
    }

    #[test]
    fn zero_ranked_role_beats_unranked_on_tie() {
        let h = RoleHierarchy::empty().with_rank("intern", 0);
        let top = h.highest(["cashier", "intern"]).unwrap();
        assert_eq!(top.name, "intern");
        assert_eq!(top.score, 0);
        assert_eq!(h.highest(["intern", "cashier"]).unwrap().name, "intern");
        assert_eq!(h.rank("cashier"), None);
        assert_eq!(h.rank("intern"), Some(0));
    }

    #[test]
    fn parse_hierarchy() {
        let h = RoleHierarchy::parse(" owner=120, admin = 90 ,").unwrap();
        assert_eq!(h.score("owner"), 120);
        assert_eq!(h.score("admin"), 90);
        assert_eq!(h.score("guest"), 0);

        assert!(RoleHierarchy::parse("admin").is_err());
        assert!(RoleHierarchy::parse("admin=high").is_err());
        assert!(RoleHierarchy::parse("=5").is_err());
    }

    #[test]
    fn with_rank_replaces_existing_entry() {
        let h = RoleHierarchy::default().with_rank("guest", 15);
        assert_eq!(h.score("guest"), 15);
        assert_eq!(h.iter().filter(|(n, _)| *n == "guest").count(), 1);
    }

    #[test]
    fn role_grant_deduplicates_by_name() {
        let role = Role::new("staff")
            .grant(Permission::new("brand_view"))
            .grant(Permission::new("brand_view"))
            .grant(Permission::new("brand_edit"));
        let names: Vec<_> = role.permissions.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["brand_view", "brand_edit"]);
    }

    proptest! {
        /// Adding a role scored above the current best never lowers the result.
        #[test]
        fn highest_is_monotonic(
            ranked in prop::collection::vec(("[a-e]{1,3}", 0u32..200), 0..8),
            roles in prop::collection::vec("[a-e]{1,3}", 0..8),
            extra in 0u32..300,
        ) {
            let mut h = RoleHierarchy::empty();
            for (name, score) in &ranked {
                h = h.with_rank(name.clone(), *score);
            }
            h = h.with_rank("zz_extra", extra);

            let before = h.highest(roles.iter().map(String::as_str)).map(|r| r.score).unwrap_or(0);
            let mut grown = roles.clone();
            grown.push("zz_extra".to_string());
            let after = h.highest(grown.iter().map(String::as_str)).map(|r| r.score).unwrap_or(0);

            prop_assert!(after >= before);
            if extra > before {
                prop_assert_eq!(after, extra);
            }
        }
    }
}
