//! Role resolution.
//!
//! A user holds a list of role names. Each name is either a built-in role
//! (see [`roles`]) or the id of a custom role defined by the user's company.
//! A check passes when any of the user's roles grants the action.

pub mod roles;

use std::collections::{BTreeMap, BTreeSet};

pub use roles::{BUILTIN_ROLES, builtin_permission, is_builtin_role};

use crate::error::Result;
use crate::store::Store;
use crate::types::{CustomRole, Module, Permission, User};

/// Effective permissions of one user across all modules.
#[derive(Debug, Clone, Default)]
pub struct AccessProfile {
    permissions: BTreeMap<Module, Permission>,
    departments: BTreeSet<Module>,
}

impl AccessProfile {
    fn add(&mut self, module: Module, permission: Permission) {
        let entry = self.permissions.entry(module).or_default();
        *entry = entry.union(permission);
    }

    #[must_use]
    pub fn permission(&self, module: Module) -> Permission {
        self.permissions.get(&module).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn has(&self, module: Module, action: Permission) -> bool {
        self.permission(module).has(action)
    }

    /// Departments the user belongs to, used to route notifications.
    #[must_use]
    pub fn departments(&self) -> Vec<Module> {
        self.departments.iter().copied().collect()
    }

    /// Action names per module, for clients that render menus.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<Module, Vec<&'static str>> {
        self.permissions
            .iter()
            .filter(|(_, p)| !p.is_empty())
            .map(|(m, p)| (*m, p.to_strings()))
            .collect()
    }
}

/// Resolves a single role name for a company.
fn resolve_custom_role(
    store: &dyn Store,
    company_id: &str,
    role: &str,
) -> Result<Option<CustomRole>> {
    Ok(store
        .get_role(role)?
        .filter(|r| r.company_id == company_id))
}

pub fn resolve(store: &dyn Store, user: &User) -> Result<AccessProfile> {
    let mut profile = AccessProfile::default();

    for role in &user.roles {
        if let Some(builtin) = roles::builtin_role(role) {
            profile.departments.insert(builtin.department);
            for (module, permission) in builtin.grants {
                profile.add(*module, *permission);
            }
            continue;
        }

        match resolve_custom_role(store, &user.company_id, role)? {
            Some(custom) => {
                for module in Module::ALL {
                    let permission = custom.permission_for(module);
                    if !permission.is_empty() {
                        profile.departments.insert(module);
                        profile.add(module, permission);
                    }
                }
            }
            None => tracing::debug!(user = %user.id, role = %role, "Ignoring unknown role"),
        }
    }

    Ok(profile)
}

pub fn user_has_permission(
    store: &dyn Store,
    user: &User,
    module: Module,
    action: Permission,
) -> Result<bool> {
    // Built-in roles answer without touching the store.
    if user
        .roles
        .iter()
        .any(|role| builtin_permission(role, module).has(action))
    {
        return Ok(true);
    }

    for role in user.roles.iter().filter(|r| !is_builtin_role(r)) {
        if let Some(custom) = resolve_custom_role(store, &user.company_id, role)? {
            if custom.permission_for(module).has(action) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Checks whether a role name can be assigned to users of a company.
pub fn is_assignable_role(store: &dyn Store, company_id: &str, role: &str) -> Result<bool> {
    if is_builtin_role(role) {
        return Ok(true);
    }
    Ok(resolve_custom_role(store, company_id, role)?.is_some())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::ModuleGrant;

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let now = Utc::now();
        store
            .create_role(&CustomRole {
                id: "role-junior".to_string(),
                company_id: "co-1".to_string(),
                name: "junior-it".to_string(),
                description: None,
                grants: vec![ModuleGrant {
                    module: Module::It,
                    allow: Permission::ALL,
                    deny: Permission::DELETE,
                }],
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        (temp, store)
    }

    fn user(company_id: &str, roles: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: "u-1".to_string(),
            company_id: company_id.to_string(),
            email: "u@example.com".to_string(),
            display_name: "U".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_any_role_grants() {
        let (_temp, store) = setup();
        let u = user("co-1", &["cms", "logistics"]);
        assert!(user_has_permission(&store, &u, Module::Logistics, Permission::DELETE).unwrap());
        assert!(user_has_permission(&store, &u, Module::Business, Permission::EDIT).unwrap());
        assert!(!user_has_permission(&store, &u, Module::Sales, Permission::CREATE).unwrap());
    }

    #[test]
    fn test_custom_role_scoped_to_company() {
        let (_temp, store) = setup();
        let member = user("co-1", &["role-junior"]);
        assert!(user_has_permission(&store, &member, Module::It, Permission::EDIT).unwrap());
        assert!(!user_has_permission(&store, &member, Module::It, Permission::DELETE).unwrap());

        let outsider = user("co-2", &["role-junior"]);
        assert!(!user_has_permission(&store, &outsider, Module::It, Permission::VIEW).unwrap());
        assert!(!is_assignable_role(&store, "co-2", "role-junior").unwrap());
        assert!(is_assignable_role(&store, "co-2", "sales").unwrap());
    }

    #[test]
    fn test_resolve_profile() {
        let (_temp, store) = setup();
        let u = user("co-1", &["sales", "role-junior", "ghost"]);
        let profile = resolve(&store, &u).unwrap();

        assert!(profile.has(Module::Sales, Permission::DELETE));
        assert!(profile.has(Module::It, Permission::EDIT));
        assert!(!profile.has(Module::It, Permission::DELETE));
        assert_eq!(profile.departments(), vec![Module::Sales, Module::It]);
        assert_eq!(profile.to_map()[&Module::Cms], vec!["view"]);
    }
}
