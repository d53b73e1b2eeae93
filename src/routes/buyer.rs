use super::{RouteNode, RoutePartition};
use crate::roles::Role;

/// Buyer Route Partition
///
/// Purchasing flow and account pages, mounted under `/buyer`.
pub fn buyer_routes() -> RoutePartition {
    RoutePartition::for_role(
        Role::Buyer,
        vec![
            RouteNode::index("buyer/account"),
            RouteNode::page("cart", "buyer/cart"),
            RouteNode::page("checkout", "buyer/checkout"),
            // /buyer/orders, /buyer/orders/:orderId
            RouteNode::page("orders", "buyer/order-layout").with_children(vec![
                RouteNode::index("buyer/order-list"),
                RouteNode::page(":orderId", "buyer/order-detail"),
            ]),
            RouteNode::page("addresses", "buyer/addresses"),
        ],
    )
}
