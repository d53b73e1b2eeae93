use super::{RouteNode, RoutePartition};
use crate::roles::Role;

/// Admin Route Partition
///
/// Moderation and oversight screens, mounted under `/admin`.
///
/// Access Control:
/// Only sessions whose role is `Role::Admin` pass the guard; every other session is
/// redirected home before any implementation is fetched.
pub fn admin_routes() -> RoutePartition {
    RoutePartition::for_role(
        Role::Admin,
        vec![
            // /admin
            // Dashboard with marketplace-wide metrics. Admin landing node.
            RouteNode::index("admin/dashboard"),
            // /admin/users, /admin/users/:userId
            // Account administration (suspend, inspect).
            RouteNode::page("users", "admin/user-layout").with_children(vec![
                RouteNode::index("admin/user-list"),
                RouteNode::page(":userId", "admin/user-detail"),
            ]),
            // /admin/shops, /admin/shops/pending
            // Shop registry and the queue of shops awaiting approval.
            RouteNode::page("shops", "admin/shop-layout").with_children(vec![
                RouteNode::index("admin/shop-list"),
                RouteNode::page("pending", "admin/shop-approvals"),
            ]),
            RouteNode::page("categories", "admin/categories"),
            RouteNode::page("orders", "admin/orders"),
            RouteNode::page("reports", "admin/reports"),
        ],
    )
}
