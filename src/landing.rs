use crate::roles::Role;

/// landing_path
///
/// Canonical destination for an authenticated session that arrives at the generic root.
/// Each path is the mount of the role's own partition, so it resolves to that
/// partition's index node.
pub fn landing_path(role: Role) -> &'static str {
    role.mount_path()
}
