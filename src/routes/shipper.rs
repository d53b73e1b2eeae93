use super::{RouteNode, RoutePartition};
use crate::roles::Role;

/// Shipper Route Partition
///
/// Delivery workflow, mounted under `/shipper`.
pub fn shipper_routes() -> RoutePartition {
    RoutePartition::for_role(
        Role::Shipper,
        vec![
            // /shipper
            // Deliveries assigned to the shipper today.
            RouteNode::index("shipper/deliveries"),
            RouteNode::page("deliveries/:orderId", "shipper/delivery-detail"),
            RouteNode::page("history", "shipper/history"),
            RouteNode::page("profile", "shipper/profile"),
        ],
    )
}
