use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::entity::EntityDescriptor;
use crate::error::{Error, Result};

/// Summary of dependency graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Serializable report for dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphReport {
    pub summary: GraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Validated DAG of entity descriptors.
///
/// Construction fails on duplicate entities, dangling references, invalid
/// descriptors and cycles, so a graph value is always orderable.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    entities: Vec<EntityDescriptor>,
    index: HashMap<String, usize>,
    /// parent index -> child indices
    children: BTreeMap<usize, BTreeSet<usize>>,
    /// child index -> parent indices
    parents: BTreeMap<usize, BTreeSet<usize>>,
    order: Vec<usize>,
}

impl DependencyGraph {
    pub fn new(entities: Vec<EntityDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter().enumerate() {
            if index.insert(entity.name.clone(), idx).is_some() {
                return Err(Error::configuration(format!(
                    "entity '{}' is declared twice",
                    entity.name
                )));
            }
        }

        let mut children: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        let mut parents: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for (idx, entity) in entities.iter().enumerate() {
            entity.validate()?;
            children.entry(idx).or_default();
            parents.entry(idx).or_default();

            for fk in &entity.references {
                let target = *index.get(&fk.target).ok_or_else(|| {
                    Error::configuration(format!(
                        "entity '{}' references undeclared entity '{}' via '{}'",
                        entity.name, fk.target, fk.column
                    ))
                })?;
                children.entry(target).or_default().insert(idx);
                parents.entry(idx).or_default().insert(target);
            }
        }

        let order = toposort(entities.len(), &children, &parents).map_err(|cycle| {
            let names: Vec<&str> = cycle.iter().map(|idx| entities[*idx].name.as_str()).collect();
            Error::configuration(format!(
                "dependency cycle between entities: {}",
                names.join(", ")
            ))
        })?;

        Ok(Self {
            entities,
            index,
            children,
            parents,
            order,
        })
    }

    /// Entities ordered so that each appears after everything it references.
    ///
    /// Ties are broken by declaration order.
    pub fn topological_order(&self) -> Vec<&EntityDescriptor> {
        self.order.iter().map(|idx| &self.entities[*idx]).collect()
    }

    /// Topological order restricted to `selection`.
    pub fn order_for<S: AsRef<str>>(&self, selection: &[S]) -> Result<Vec<&EntityDescriptor>> {
        let mut wanted = BTreeSet::new();
        for name in selection {
            let name = name.as_ref();
            let idx = self.index.get(name).ok_or_else(|| {
                Error::configuration(format!("unknown entity '{name}' in selection"))
            })?;
            wanted.insert(*idx);
        }

        Ok(self
            .order
            .iter()
            .filter(|idx| wanted.contains(idx))
            .map(|idx| &self.entities[*idx])
            .collect())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.index.get(name).map(|idx| &self.entities[*idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entities in declaration order.
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// Entities directly referenced by `name`.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, &self.parents)
    }

    /// Entities that directly reference `name`.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, &self.children)
    }

    pub fn report(&self) -> GraphReport {
        GraphReport {
            summary: GraphSummary {
                nodes: self.entities.len(),
                edges: self.children.values().map(BTreeSet::len).sum(),
            },
            topo_order: Some(
                self.order
                    .iter()
                    .map(|idx| self.entities[*idx].name.clone())
                    .collect(),
            ),
            cycle: None,
        }
    }

    fn neighbours<'a>(&'a self, name: &str, edges: &BTreeMap<usize, BTreeSet<usize>>) -> Vec<&'a str> {
        let Some(idx) = self.index.get(name) else {
            return Vec::new();
        };
        edges
            .get(idx)
            .map(|set| {
                set.iter()
                    .map(|other| self.entities[*other].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build a report without failing, for tooling that wants to show cycles.
pub fn build_graph_report(entities: &[EntityDescriptor]) -> GraphReport {
    match DependencyGraph::new(entities.to_vec()) {
        Ok(graph) => graph.report(),
        Err(_) => {
            let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
            let mut children: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
            let mut parents: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
            for (idx, entity) in entities.iter().enumerate() {
                children.entry(idx).or_default();
                parents.entry(idx).or_default();
                for fk in &entity.references {
                    if let Some(target) = names.iter().position(|name| *name == fk.target) {
                        children.entry(target).or_default().insert(idx);
                        parents.entry(idx).or_default().insert(target);
                    }
                }
            }
            let edges = children.values().map(BTreeSet::len).sum();
            let summary = GraphSummary {
                nodes: entities.len(),
                edges,
            };
            match toposort(entities.len(), &children, &parents) {
                Ok(order) => GraphReport {
                    summary,
                    topo_order: Some(order.iter().map(|idx| names[*idx].to_string()).collect()),
                    cycle: None,
                },
                Err(cycle) => GraphReport {
                    summary,
                    topo_order: None,
                    cycle: Some(cycle.iter().map(|idx| names[*idx].to_string()).collect()),
                },
            }
        }
    }
}

fn toposort(
    len: usize,
    children: &BTreeMap<usize, BTreeSet<usize>>,
    parents: &BTreeMap<usize, BTreeSet<usize>>,
) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let mut indegree: Vec<usize> = (0..len)
        .map(|idx| parents.get(&idx).map(BTreeSet::len).unwrap_or(0))
        .collect();

    // Ready nodes keyed by declaration index, so ties resolve in declaration order.
    let mut ready: BTreeSet<usize> = (0..len).filter(|idx| indegree[*idx] == 0).collect();
    let mut order = Vec::with_capacity(len);

    while let Some(node) = ready.pop_first() {
        order.push(node);

        if let Some(targets) = children.get(&node) {
            for target in targets {
                let count = &mut indegree[*target];
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(*target);
                }
            }
        }
    }

    if order.len() == len {
        Ok(order)
    } else {
        Err((0..len).filter(|idx| indegree[*idx] > 0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ColumnDef, ColumnKind, ForeignRef};

    fn entity(name: &str, refs: &[&str]) -> EntityDescriptor {
        let mut entity =
            EntityDescriptor::new(name).column(ColumnDef::required("id", ColumnKind::Uuid));
        for target in refs {
            entity = entity.reference(ForeignRef::required(&format!("{target}_id"), target));
        }
        entity
    }

    fn names(order: Vec<&EntityDescriptor>) -> Vec<&str> {
        order.into_iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let graph = DependencyGraph::new(vec![
            entity("orders", &["users"]),
            entity("users", &[]),
        ])
        .expect("graph");

        assert_eq!(names(graph.topological_order()), vec!["users", "orders"]);
    }

    #[test]
    fn ties_follow_declaration_order() {
        let graph = DependencyGraph::new(vec![
            entity("zeta", &[]),
            entity("alpha", &[]),
            entity("child", &["alpha", "zeta"]),
            entity("mid", &[]),
        ])
        .expect("graph");

        assert_eq!(
            names(graph.topological_order()),
            vec!["zeta", "alpha", "child", "mid"]
        );
    }

    #[test]
    fn reports_cycle_as_configuration_error() {
        let err = DependencyGraph::new(vec![entity("a", &["b"]), entity("b", &["a"])])
            .expect_err("cycle");
        match err {
            Error::Configuration(message) => {
                assert!(message.contains("cycle"));
                assert!(message.contains('a') && message.contains('b'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let err = DependencyGraph::new(vec![entity("users", &["users"])]).expect_err("cycle");
        assert!(matches!(err, Error::Configuration(_)));

        let report = build_graph_report(&[entity("users", &["users"])]);
        assert!(report.topo_order.is_none());
        assert_eq!(report.cycle, Some(vec!["users".to_string()]));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let err = DependencyGraph::new(vec![entity("orders", &["users"])]).expect_err("dangling");
        match err {
            Error::Configuration(message) => assert!(message.contains("undeclared")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let err = DependencyGraph::new(vec![entity("users", &[]), entity("users", &[])])
            .expect_err("duplicate");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn selection_keeps_topological_order() {
        let graph = DependencyGraph::new(vec![
            entity("users", &[]),
            entity("profiles", &["users"]),
            entity("addresses", &["profiles"]),
        ])
        .expect("graph");

        let order = graph.order_for(&["addresses", "users"]).expect("selection");
        assert_eq!(names(order), vec!["users", "addresses"]);
        assert!(graph.order_for(&["nope"]).is_err());
    }

    #[test]
    fn exposes_direct_edges() {
        let graph = DependencyGraph::new(vec![
            entity("users", &[]),
            entity("profiles", &["users"]),
            entity("addresses", &["profiles"]),
        ])
        .expect("graph");

        assert_eq!(graph.dependencies("addresses"), vec!["profiles"]);
        assert_eq!(graph.dependents("users"), vec!["profiles"]);
        let report = graph.report();
        assert_eq!(report.summary.nodes, 3);
        assert_eq!(report.summary.edges, 2);
    }
}
