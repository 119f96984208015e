//! Pure scaffold generation: graph snapshot in, file map out.
//!
//! Nodes whose catalog entry declares an infrastructure binding kind
//! become generated configuration; a compute node selects the worker
//! entry-point template. The generator is deterministic (no clocks, no
//! randomness), so identical input always produces byte-identical
//! output. The only date in the output is the caller-supplied
//! generation date the config format requires.

mod emit;
mod names;

use std::collections::BTreeMap;

use stackdraft_core::catalog::{BindingKind, Catalog};
use stackdraft_core::{Edge, Node};

pub use names::{
    constant_name, project_name, resource_slug, FALLBACK_CONSTANT, FALLBACK_PROJECT,
    FALLBACK_RESOURCE,
};

/// One infrastructure resource resolved from a diagram node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub kind: BindingKind,
    /// Environment constant, e.g. `MY_D1_DATABASE`.
    pub constant_name: String,
    /// The node's human label, verbatim.
    pub label: String,
    /// Provisioned resource slug, e.g. `my-d1-database`.
    pub resource_name: String,
}

/// Candidate entry-point templates, simplest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerTemplate {
    /// Plain fetch handler (the default).
    Fetch,
    /// Hono router with a route stub per downstream connection.
    Router,
}

/// Generate the scaffold for a diagram snapshot.
///
/// Returns a map of relative file path → file contents, empty when the
/// graph contains neither a compute node nor any binding-kind node
/// (nothing to scaffold). `generated_on` is a caller-supplied date
/// string (e.g. `2026-08-06`) stamped only where the config format
/// requires one.
pub fn generate(
    title: &str,
    nodes: &[Node],
    edges: &[Edge],
    catalog: &dyn Catalog,
    generated_on: &str,
) -> BTreeMap<String, String> {
    let compute_ids: Vec<&str> = nodes
        .iter()
        .filter(|n| {
            catalog
                .get_type_definition(&n.type_id)
                .is_some_and(|def| def.is_compute())
        })
        .map(|n| n.id.as_str())
        .collect();

    let mut bindings: Vec<ResolvedBinding> = nodes
        .iter()
        .filter_map(|node| {
            let kind = catalog.get_type_definition(&node.type_id)?.binding_kind?;
            Some(ResolvedBinding {
                kind,
                constant_name: names::constant_name(&node.data.label),
                label: node.data.label.clone(),
                resource_name: names::resource_slug(&node.data.label),
            })
        })
        .collect();
    // Group by kind; node order is preserved within a kind.
    bindings.sort_by_key(|b| b.kind);

    if compute_ids.is_empty() && bindings.is_empty() {
        return BTreeMap::new();
    }

    let template = select_template(nodes, &compute_ids);
    let routes = router_routes(nodes, edges, &compute_ids);
    let project = names::project_name(title);

    let mut files = BTreeMap::new();
    files.insert(
        "wrangler.toml".to_string(),
        emit::wrangler_toml(&project, generated_on, &bindings),
    );
    files.insert(
        "package.json".to_string(),
        emit::package_json(&project, template, &bindings),
    );
    files.insert(
        "src/index.ts".to_string(),
        emit::worker_index(&project, template, &bindings, &routes),
    );

    let stores: Vec<&ResolvedBinding> = bindings
        .iter()
        .filter(|b| b.kind == BindingKind::PersistentStore)
        .collect();
    if !stores.is_empty() {
        files.insert("schema.sql".to_string(), emit::schema_sql(&stores));
        files.insert(
            "migrations/0001_init.sql".to_string(),
            emit::migration_sql(&stores),
        );
        files.insert("src/db.ts".to_string(), emit::db_client_ts(&stores));
    }

    files.insert(
        "README.md".to_string(),
        emit::readme(title, &project, &bindings),
    );
    files
}

/// Pick among the candidate templates. The graph signals a preference
/// through a compute node's `template` config value; anything else
/// defaults to the simplest candidate. A binding-only diagram (no
/// compute node) still gets the default stub so the generated config
/// has an entry point to load.
fn select_template(nodes: &[Node], compute_ids: &[&str]) -> WorkerTemplate {
    let prefers_router = nodes
        .iter()
        .filter(|n| compute_ids.contains(&n.id.as_str()))
        .any(|n| {
            n.data
                .config
                .get("template")
                .and_then(|v| v.as_str())
                .is_some_and(|t| t == "router")
        });
    if prefers_router {
        WorkerTemplate::Router
    } else {
        WorkerTemplate::Fetch
    }
}

/// Route stubs for the router template: one per node a compute node
/// points at, in edge order, deduplicated.
fn router_routes(nodes: &[Node], edges: &[Edge], compute_ids: &[&str]) -> Vec<String> {
    let mut routes = Vec::new();
    for edge in edges {
        if !compute_ids.contains(&edge.source.as_str()) {
            continue;
        }
        let Some(target) = nodes.iter().find(|n| n.id == edge.target) else {
            continue;
        };
        let slug = names::resource_slug(&target.data.label);
        if !routes.contains(&slug) {
            routes.push(slug);
        }
    }
    routes
}
