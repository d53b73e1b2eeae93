//! Route Definition Tree
//!
//! Organizes the navigable surface into access-segregated partitions, mirroring how the
//! marketplace separates what anonymous visitors, admins, sellers, shippers and buyers
//! can reach. Each partition lives in its own module and is mounted under a distinct
//! base path.
//!
//! Building these trees is side-effect free: nodes only carry `ModuleRef`s, and nothing
//! is fetched until a navigation actually lands on a node.
use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::LazyLock,
};

use crate::{error::RouteTreeError, modules::ModuleRef, roles::Role};

/// Routes reachable by everyone (anonymous or logged-in).
pub mod public;

/// Routes owned exclusively by the 'admin' role.
pub mod admin;

/// Routes owned exclusively by the 'seller' role.
pub mod seller;

/// Routes owned exclusively by the 'shipper' role.
pub mod shipper;

/// Routes owned exclusively by the 'buyer' role.
pub mod buyer;

/// The fixed fallback every denied navigation is redirected to.
pub const HOME_PATH: &str = "/";

pub type RoleSet = BTreeSet<Role>;

/// RouteNode
///
/// `{path, index, module, children}`. `path` is relative to the parent and may hold
/// `:param` segments or a trailing `*`. Index nodes have an empty path and act as the
/// landing node of their level.
#[derive(Debug)]
pub struct RouteNode {
    pub path: Cow<'static, str>,
    pub index: bool,
    pub module: ModuleRef,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn index(module: &'static str) -> Self {
        Self {
            path: Cow::Borrowed(""),
            index: true,
            module: ModuleRef::from_static(module),
            children: Vec::new(),
        }
    }

    pub fn page(path: &'static str, module: &'static str) -> Self {
        Self {
            path: Cow::Borrowed(path),
            index: false,
            module: ModuleRef::from_static(module),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    // Static segments outrank params, params outrank the wildcard.
    fn rank(&self) -> u8 {
        self.segments()
            .map(|segment| match segment {
                "*" => 2,
                s if s.starts_with(':') => 1,
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    fn consume(&self, rest: &[&str], params: &mut BTreeMap<String, String>) -> Option<usize> {
        let segments: Vec<&str> = self.segments().collect();
        for (i, segment) in segments.iter().enumerate() {
            if *segment == "*" {
                params.insert("*".to_string(), rest[i.min(rest.len())..].join("/"));
                return Some(rest.len());
            }
            let actual = rest.get(i)?;
            match segment.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), (*actual).to_string());
                }
                None if segment == actual => {}
                None => return None,
            }
        }
        Some(segments.len())
    }
}

/// Access
///
/// Registration-time property of a partition; the dispatcher picks the guard from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Restricted(RoleSet),
}

/// RoutePartition
///
/// A forest of nodes mounted under one base path with one access rule.
#[derive(Debug)]
pub struct RoutePartition {
    pub mount: &'static str,
    pub access: Access,
    pub forest: Vec<RouteNode>,
}

impl RoutePartition {
    pub fn public(forest: Vec<RouteNode>) -> Self {
        Self {
            mount: HOME_PATH,
            access: Access::Public,
            forest,
        }
    }

    pub fn for_role(role: Role, forest: Vec<RouteNode>) -> Self {
        Self {
            mount: role.mount_path(),
            access: Access::Restricted(RoleSet::from([role])),
            forest,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.access, Access::Public)
    }

    /// The role set a session must intersect to enter; `None` for public partitions.
    pub fn required_roles(&self) -> Option<&RoleSet> {
        match &self.access {
            Access::Public => None,
            Access::Restricted(roles) => Some(roles),
        }
    }

    fn mount_segments(&self) -> Vec<&'static str> {
        self.mount.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Matches an already-normalised path against this partition's forest.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mount = self.mount_segments();
        if !segments.starts_with(&mount) {
            return None;
        }

        let mut trail = Vec::new();
        let mut params = BTreeMap::new();
        let node = match_level(&self.forest, &segments[mount.len()..], &mut trail, &mut params)?;
        Some(RouteMatch {
            partition: self,
            node,
            trail,
            params,
        })
    }

    /// Every concrete path template reachable in this partition.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(&self.forest, self.mount.trim_end_matches('/'), &mut out);
        out
    }
}

fn match_level<'t>(
    nodes: &'t [RouteNode],
    rest: &[&str],
    trail: &mut Vec<&'t RouteNode>,
    params: &mut BTreeMap<String, String>,
) -> Option<&'t RouteNode> {
    if rest.is_empty() {
        let index = nodes.iter().find(|node| node.index)?;
        trail.push(index);
        return Some(index);
    }

    let mut candidates: Vec<&RouteNode> = nodes.iter().filter(|node| !node.index).collect();
    candidates.sort_by_key(|node| node.rank());

    for node in candidates {
        let mut captured = BTreeMap::new();
        let Some(consumed) = node.consume(rest, &mut captured) else {
            continue;
        };
        let mark = trail.len();
        trail.push(node);

        let remaining = &rest[consumed..];
        let found = if remaining.is_empty() {
            match node.children.iter().find(|child| child.index) {
                Some(index) => {
                    trail.push(index);
                    Some(index)
                }
                None => Some(node),
            }
        } else {
            match_level(&node.children, remaining, trail, &mut captured)
        };

        if let Some(found) = found {
            params.extend(captured);
            return Some(found);
        }
        trail.truncate(mark);
    }
    None
}

// Wildcard nodes are catch-alls, not navigable templates, so they are not listed.
fn collect_paths(nodes: &[RouteNode], prefix: &str, out: &mut Vec<String>) {
    for node in nodes {
        if node.segments().any(|segment| segment == "*") {
            continue;
        }
        let full = if node.index || node.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{}/{}", prefix, node.path)
        };
        if node.children.is_empty() || node.children.iter().all(|c| !c.index) {
            out.push(if full.is_empty() { HOME_PATH.to_string() } else { full.clone() });
        }
        collect_paths(&node.children, &full, out);
    }
}

/// RouteMatch
///
/// Result of a successful lookup: the partition that owns the path, the matched node,
/// the chain of nodes leading to it, and captured params.
#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub partition: &'t RoutePartition,
    pub node: &'t RouteNode,
    pub trail: Vec<&'t RouteNode>,
    pub params: BTreeMap<String, String>,
}

/// RouteTable
///
/// The complete, validated set of partitions: exactly one public partition plus any
/// number of restricted ones, each under its own mount path.
#[derive(Debug)]
pub struct RouteTable {
    partitions: Vec<RoutePartition>,
    public: usize,
}

static BUILTIN: LazyLock<RouteTable> = LazyLock::new(|| {
    RouteTable::new(vec![
        public::public_routes(),
        admin::admin_routes(),
        seller::seller_routes(),
        shipper::shipper_routes(),
        buyer::buyer_routes(),
    ])
    .expect("FATAL: built-in route tree violates its invariants")
});

impl RouteTable {
    pub fn new(partitions: Vec<RoutePartition>) -> Result<Self, RouteTreeError> {
        let publics: Vec<usize> = partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_public())
            .map(|(i, _)| i)
            .collect();
        if publics.len() != 1 {
            return Err(RouteTreeError::PublicPartitionCount(publics.len()));
        }

        let mut mounts = HashSet::new();
        for partition in &partitions {
            if !mounts.insert(partition.mount) {
                return Err(RouteTreeError::DuplicateMount(partition.mount.to_string()));
            }
            if let Access::Restricted(roles) = &partition.access {
                if roles.is_empty() {
                    return Err(RouteTreeError::EmptyRoleSet(partition.mount.to_string()));
                }
            }
            check_index(&partition.forest, partition.mount)?;
        }

        Ok(Self {
            partitions,
            public: publics[0],
        })
    }

    /// The process-wide table. Node references handed out from it are `'static`, so
    /// repeated navigations see the very same nodes.
    pub fn builtin() -> &'static RouteTable {
        &BUILTIN
    }

    pub fn partitions(&self) -> &[RoutePartition] {
        &self.partitions
    }

    pub fn public(&self) -> &RoutePartition {
        &self.partitions[self.public]
    }

    /// The partition owned exclusively by `role`, if one is registered.
    pub fn partition(&self, role: Role) -> Option<&RoutePartition> {
        self.partitions.iter().find(|p| match &p.access {
            Access::Restricted(roles) => roles.len() == 1 && roles.contains(&role),
            Access::Public => false,
        })
    }

    /// Which partition a normalised path belongs to. Restricted mounts are checked
    /// first (longest wins); everything else falls to the public partition.
    pub fn owner_of(&self, path: &str) -> &RoutePartition {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.partitions
            .iter()
            .filter(|p| !p.is_public())
            .filter(|p| segments.starts_with(&p.mount_segments()))
            .max_by_key(|p| p.mount_segments().len())
            .unwrap_or_else(|| self.public())
    }

    pub fn lookup(&self, path: &str) -> (&RoutePartition, Option<RouteMatch<'_>>) {
        let owner = self.owner_of(path);
        (owner, owner.match_path(path))
    }

    /// The public wildcard node rendered for unknown paths.
    pub fn not_found(&self) -> Option<&RouteNode> {
        self.public().forest.iter().find(|node| node.path == "*")
    }

    pub fn module_refs(&self) -> Vec<ModuleRef> {
        fn walk(nodes: &[RouteNode], out: &mut Vec<ModuleRef>) {
            for node in nodes {
                out.push(node.module.clone());
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        for partition in &self.partitions {
            walk(&partition.forest, &mut out);
        }
        out
    }
}

fn check_index(nodes: &[RouteNode], at: &str) -> Result<(), RouteTreeError> {
    if nodes.iter().filter(|node| node.index).count() > 1 {
        return Err(RouteTreeError::DuplicateIndex(at.to_string()));
    }
    for node in nodes {
        let below = format!("{}/{}", at.trim_end_matches('/'), node.path);
        check_index(&node.children, &below)?;
    }
    Ok(())
}

/// normalize_path
///
/// Canonical form used for every lookup: leading slash, no query or fragment, no empty
/// or trailing segments.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_suffix = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segments: Vec<&str> = without_suffix.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
