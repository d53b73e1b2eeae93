use super::{RouteNode, RoutePartition};

/// Public Route Partition
///
/// Storefront pages reachable regardless of session state: browsing the catalogue,
/// shop pages, and the gateway screens (login, registration).
///
/// Access Control:
/// Registered as `Access::Public`, so the dispatcher evaluates these nodes with the
/// pass-through guard. Anything role-specific belongs in a role partition instead.
pub fn public_routes() -> RoutePartition {
    RoutePartition::public(vec![
        // GET /
        // Marketing landing page. Authenticated sessions are sent to their role's
        // landing path once instead of staying here.
        RouteNode::index("public/home"),
        // /products, /products/:productId
        // Catalogue listing and product detail pages.
        RouteNode::page("products", "public/product-layout").with_children(vec![
            RouteNode::index("public/product-list"),
            RouteNode::page(":productId", "public/product-detail"),
        ]),
        // /shops/:shopId
        // A seller's storefront as seen by visitors.
        RouteNode::page("shops/:shopId", "public/shop"),
        // /login, /register
        // Identity gateway screens. The identity store, not this layer, acts on them.
        RouteNode::page("login", "public/login"),
        RouteNode::page("register", "public/register"),
        RouteNode::page("about", "public/about"),
        // Catch-all for unknown paths.
        RouteNode::page("*", "public/not-found"),
    ])
}
