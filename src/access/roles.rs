//! Built-in roles, one per department.

use crate::types::{Module, Permission};

const VIEW: Permission = Permission::VIEW;
const ALL: Permission = Permission::ALL;
const VIEW_CREATE: Permission = Permission::VIEW.union(Permission::CREATE);
const VIEW_EDIT: Permission = Permission::VIEW.union(Permission::EDIT);

pub struct BuiltinRole {
    pub name: &'static str,
    pub department: Module,
    pub grants: &'static [(Module, Permission)],
}

pub const BUILTIN_ROLES: &[BuiltinRole] = &[
    BuiltinRole {
        name: "admin",
        department: Module::Admin,
        grants: &[
            (Module::Admin, ALL),
            (Module::Sales, ALL),
            (Module::Logistics, ALL),
            (Module::Cms, ALL),
            (Module::Accounting, ALL),
            (Module::Treasury, ALL),
            (Module::Finance, ALL),
            (Module::It, ALL),
            (Module::Business, ALL),
        ],
    },
    BuiltinRole {
        name: "sales",
        department: Module::Sales,
        grants: &[
            (Module::Sales, ALL),
            (Module::Business, VIEW),
            (Module::Cms, VIEW),
            (Module::Logistics, VIEW_CREATE),
        ],
    },
    BuiltinRole {
        name: "logistics",
        department: Module::Logistics,
        grants: &[
            (Module::Logistics, ALL),
            (Module::Sales, VIEW),
            (Module::Business, VIEW),
        ],
    },
    BuiltinRole {
        name: "cms",
        department: Module::Cms,
        grants: &[(Module::Cms, ALL), (Module::Business, VIEW_EDIT)],
    },
    BuiltinRole {
        name: "accounting",
        department: Module::Accounting,
        grants: &[
            (Module::Accounting, ALL),
            (Module::Sales, VIEW),
            (Module::Treasury, VIEW),
            (Module::Finance, VIEW),
        ],
    },
    BuiltinRole {
        name: "treasury",
        department: Module::Treasury,
        grants: &[
            (Module::Treasury, ALL),
            (Module::Sales, VIEW),
            (Module::Accounting, VIEW),
            (Module::Finance, VIEW),
        ],
    },
    BuiltinRole {
        name: "finance",
        department: Module::Finance,
        grants: &[
            (Module::Finance, ALL),
            (Module::Sales, VIEW),
            (Module::Accounting, VIEW),
            (Module::Treasury, VIEW),
        ],
    },
    BuiltinRole {
        name: "it",
        department: Module::It,
        grants: &[(Module::It, ALL), (Module::Admin, VIEW)],
    },
    BuiltinRole {
        name: "business",
        department: Module::Business,
        grants: &[
            (Module::Business, ALL),
            (Module::Sales, VIEW),
            (Module::Logistics, VIEW),
            (Module::Cms, VIEW),
        ],
    },
];

#[must_use]
pub fn builtin_role(name: &str) -> Option<&'static BuiltinRole> {
    BUILTIN_ROLES.iter().find(|r| r.name == name)
}

#[must_use]
pub fn is_builtin_role(name: &str) -> bool {
    builtin_role(name).is_some()
}

/// Permission a built-in role holds on a module; empty for unknown roles.
#[must_use]
pub fn builtin_permission(role: &str, module: Module) -> Permission {
    builtin_role(role)
        .into_iter()
        .flat_map(|r| r.grants.iter())
        .filter(|(m, _)| *m == module)
        .fold(Permission::default(), |acc, (_, p)| acc.union(*p))
}
