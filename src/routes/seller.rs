use super::{RouteNode, RoutePartition};
use crate::roles::Role;

/// Seller Route Partition
///
/// Shop management, mounted under `/seller`. Note that `products` and `orders` also
/// exist in other partitions; the mount path keeps them apart.
pub fn seller_routes() -> RoutePartition {
    RoutePartition::for_role(
        Role::Seller,
        vec![
            RouteNode::index("seller/dashboard"),
            // /seller/products, /seller/products/new, /seller/products/:productId/edit
            RouteNode::page("products", "seller/product-layout").with_children(vec![
                RouteNode::index("seller/product-list"),
                RouteNode::page("new", "seller/product-create"),
                RouteNode::page(":productId/edit", "seller/product-edit"),
            ]),
            // /seller/orders, /seller/orders/:orderId
            RouteNode::page("orders", "seller/order-layout").with_children(vec![
                RouteNode::index("seller/order-list"),
                RouteNode::page(":orderId", "seller/order-detail"),
            ]),
            RouteNode::page("shop", "seller/shop-profile"),
            RouteNode::page("revenue", "seller/revenue"),
        ],
    )
}
