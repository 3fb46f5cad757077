//! Watching prop sources for changes.

use islet_dom::{Document, NodeId, ObserveOptions, ObserverId};

use crate::props::{interior_props_scripts, PropSources, Props};

/// Nodes whose changes can affect `host`'s props, deduplicated.
///
/// Props scripts are looked up once; scripts added later are only seen
/// through the host's own child list.
pub fn watched_nodes(doc: &Document, sources: &PropSources, host: NodeId) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    nodes.extend(sources.executed_script);
    nodes.extend(interior_props_scripts(doc, host));
    nodes.extend(sources.selected_scripts(doc));
    nodes.push(host);

    let mut seen = Vec::with_capacity(nodes.len());
    nodes.retain(|n| {
        if seen.contains(n) {
            false
        } else {
            seen.push(*n);
            true
        }
    });
    nodes
}

/// Observe every prop source of `host` and call `on_change` with a fresh
/// snapshot once per delivered batch.
pub fn watch<F>(
    doc: &Document,
    sources: PropSources,
    host: NodeId,
    initial_props: Props,
    mut on_change: F,
) -> ObserverId
where
    F: FnMut(&Document, Props) + 'static,
{
    let nodes = watched_nodes(doc, &sources, host);
    let observer = doc.create_observer(move |doc, records| {
        tracing::debug!(%host, records = records.len(), "prop sources changed");
        let props = sources.resolve(doc, host, &initial_props);
        on_change(doc, props);
    });
    for node in nodes {
        if let Err(e) = doc.observe(observer, node, ObserveOptions::direct()) {
            tracing::warn!(%observer, %node, error = %e, "could not observe prop source");
        }
    }
    observer
}
