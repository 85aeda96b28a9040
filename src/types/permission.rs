use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application areas a permission applies to. One per department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Admin,
    Sales,
    Logistics,
    Cms,
    Accounting,
    Treasury,
    Finance,
    It,
    Business,
}

impl Module {
    pub const ALL: [Module; 9] = [
        Module::Admin,
        Module::Sales,
        Module::Logistics,
        Module::Cms,
        Module::Accounting,
        Module::Treasury,
        Module::Finance,
        Module::It,
        Module::Business,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Module::Admin => "admin",
            Module::Sales => "sales",
            Module::Logistics => "logistics",
            Module::Cms => "cms",
            Module::Accounting => "accounting",
            Module::Treasury => "treasury",
            Module::Finance => "finance",
            Module::It => "it",
            Module::Business => "business",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown module: {s}"))
    }
}

/// Permission represents a bitmask of allowed actions within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const VIEW: Permission = Permission(1 << 0); // 1
    pub const CREATE: Permission = Permission(1 << 1); // 2
    pub const EDIT: Permission = Permission(1 << 2); // 4
    pub const DELETE: Permission = Permission(1 << 3); // 8

    pub const ALL: Permission =
        Permission(Self::VIEW.0 | Self::CREATE.0 | Self::EDIT.0 | Self::DELETE.0);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this permission bitmask contains the required permission.
    #[must_use]
    pub const fn has(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    /// Combines two permission bitmasks.
    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }

    /// Removes permissions from this bitmask.
    #[must_use]
    pub const fn difference(self, other: Permission) -> Permission {
        Permission(self.0 & !other.0)
    }

    /// Expands a permission bitmask to include implied permissions.
    /// Any of create, edit or delete implies view.
    /// This should only be used for ALLOW permissions, never for DENY.
    #[must_use]
    pub const fn expand_implied(self) -> Permission {
        if self.0 & (Self::CREATE.0 | Self::EDIT.0 | Self::DELETE.0) != 0 {
            Permission(self.0 | Self::VIEW.0)
        } else {
            self
        }
    }

    /// Converts an action string to its bitmask value.
    pub fn parse(s: &str) -> Option<Permission> {
        match s {
            "view" => Some(Self::VIEW),
            "create" => Some(Self::CREATE),
            "edit" => Some(Self::EDIT),
            "delete" => Some(Self::DELETE),
            _ => None,
        }
    }

    /// Converts a slice of action strings to a combined bitmask.
    pub fn parse_many<S: AsRef<str>>(strs: &[S]) -> Option<Permission> {
        let mut result = Permission::default();
        for s in strs {
            result = result.union(Self::parse(s.as_ref())?);
        }
        Some(result)
    }

    /// Returns the action strings for this bitmask.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut actions = Vec::new();
        if self.has(Self::VIEW) {
            actions.push("view");
        }
        if self.has(Self::CREATE) {
            actions.push("create");
        }
        if self.has(Self::EDIT) {
            actions.push("edit");
        }
        if self.has(Self::DELETE) {
            actions.push("delete");
        }
        actions
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<u32> for Permission {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<Permission> for u32 {
    fn from(p: Permission) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_has() {
        let p = Permission::VIEW.union(Permission::EDIT);
        assert!(p.has(Permission::VIEW));
        assert!(p.has(Permission::EDIT));
        assert!(!p.has(Permission::DELETE));
    }

    #[test]
    fn test_expand_implied() {
        let expanded = Permission::DELETE.expand_implied();
        assert!(expanded.has(Permission::DELETE));
        assert!(expanded.has(Permission::VIEW));
        assert!(!expanded.has(Permission::EDIT));

        assert_eq!(Permission::default().expand_implied(), Permission::default());
    }

    #[test]
    fn test_parse_permission() {
        assert_eq!(Permission::parse("edit"), Some(Permission::EDIT));
        assert_eq!(Permission::parse("approve"), None);
        assert_eq!(
            Permission::parse_many(&["view", "create"]),
            Some(Permission::new(3))
        );
        assert_eq!(Permission::parse_many(&["view", "bogus"]), None);
    }

    #[test]
    fn test_module_round_trip_names() {
        for module in Module::ALL {
            assert_eq!(module.as_str().parse::<Module>().unwrap(), module);
        }
        assert!("marketing".parse::<Module>().is_err());
    }
}
