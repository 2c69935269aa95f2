//! Taste communities: union-find over entities linked by similarity edges
//!
//! Entities are mapped to dense indices at registration time and the forest is
//! kept in flat `parent`/`size` arrays. Accepted edges are retained alongside
//! the forest so the renderer gets the weighted graph and the partition from a
//! single structure.

use crate::error::{GraphError, GraphResult};
use crate::similarity::{compute_edges, MembershipSet, SimilarityEdge};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

/// Lifecycle of a partitioner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Empty,
    Registering,
    Partitioned,
}

/// Disjoint-set forest over dense indices
#[derive(Debug, Clone, Default)]
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
    components: usize,
}

impl DisjointSet {
    fn make_set(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.size.push(1);
        self.components += 1;
        id
    }

    /// Find with full path compression, iterative
    fn find(&mut self, x: usize) -> usize {
        let root = self.root(x);

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Read-only root lookup
    fn root(&self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        root
    }

    /// Repoints the root of `a` at the root of `b`. Returns false when already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        self.parent[root_a] = root_b;
        self.size[root_b] += self.size[root_a];
        self.components -= 1;
        true
    }

    fn compress_all(&mut self) {
        for x in 0..self.parent.len() {
            self.find(x);
        }
    }
}

/// One community: its representative (the disjoint-set root) and members
/// in registration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community<E> {
    pub representative: E,
    pub members: Vec<E>,
}

/// Incremental connectivity tracker over registered entities
#[derive(Debug, Clone)]
pub struct CommunityPartitioner<E> {
    state: PartitionState,
    entities: Vec<E>,
    index: HashMap<E, usize>,
    forest: DisjointSet,
    edges: Vec<SimilarityEdge<E>>,
    edge_keys: HashMap<(usize, usize), usize>,
    adjacency: Vec<Vec<usize>>,
}

impl<E> Default for CommunityPartitioner<E> {
    fn default() -> Self {
        Self {
            state: PartitionState::Empty,
            entities: Vec::new(),
            index: HashMap::new(),
            forest: DisjointSet::default(),
            edges: Vec::new(),
            edge_keys: HashMap::new(),
            adjacency: Vec::new(),
        }
    }
}

impl<E> CommunityPartitioner<E>
where
    E: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PartitionState {
        self.state
    }

    /// Register `entity` as a singleton community. Registering twice is a no-op.
    ///
    /// # Errors
    /// * `GraphError::StateError` once the partition is finalized
    pub fn register(&mut self, entity: E) -> GraphResult<()> {
        self.ensure_mutable("register")?;

        if !self.index.contains_key(&entity) {
            let id = self.forest.make_set();
            self.index.insert(entity.clone(), id);
            self.entities.push(entity);
            self.adjacency.push(Vec::new());
        }

        self.state = PartitionState::Registering;
        Ok(())
    }

    /// Merge the communities of both endpoints and retain the edge.
    ///
    /// Returns `true` if two previously separate communities were joined.
    /// Applying the same unordered pair again changes nothing.
    ///
    /// # Errors
    /// * `GraphError::StateError` once the partition is finalized
    /// * `GraphError::UnregisteredEntity` if either endpoint is unknown
    pub fn union(&mut self, edge: &SimilarityEdge<E>) -> GraphResult<bool> {
        self.ensure_mutable("union")?;

        let a = self.id_of(&edge.source)?;
        let b = self.id_of(&edge.target)?;
        if a == b {
            return Ok(false);
        }

        let key = (a.min(b), a.max(b));
        if let Entry::Vacant(slot) = self.edge_keys.entry(key) {
            let edge_id = self.edges.len();
            slot.insert(edge_id);
            self.edges.push(edge.clone());
            self.adjacency[a].push(edge_id);
            self.adjacency[b].push(edge_id);
        }

        let merged = self.forest.union(a, b);
        if merged {
            trace!(source = ?edge.source, target = ?edge.target, weight = edge.weight, "merged communities");
        }

        Ok(merged)
    }

    /// Freeze the partition. Later `register`/`union` calls fail.
    ///
    /// # Errors
    /// * `GraphError::StateError` if already finalized
    pub fn finalize(&mut self) -> GraphResult<()> {
        self.ensure_mutable("finalize")?;

        self.forest.compress_all();
        self.state = PartitionState::Partitioned;

        debug!(
            entities = self.entities.len(),
            edges = self.edges.len(),
            communities = self.forest.components,
            "partition finalized"
        );

        Ok(())
    }

    /// Representative entity of the community containing `entity`
    pub fn community_of(&self, entity: &E) -> GraphResult<&E> {
        let id = self.id_of(entity)?;
        Ok(&self.entities[self.forest.root(id)])
    }

    pub fn connected(&self, a: &E, b: &E) -> GraphResult<bool> {
        let a = self.id_of(a)?;
        let b = self.id_of(b)?;
        Ok(self.forest.root(a) == self.forest.root(b))
    }

    pub fn community_size(&self, entity: &E) -> GraphResult<usize> {
        let id = self.id_of(entity)?;
        Ok(self.forest.size[self.forest.root(id)])
    }

    /// Members of the community containing `entity`, in registration order
    pub fn community_members(&self, entity: &E) -> GraphResult<Vec<E>> {
        let root = self.forest.root(self.id_of(entity)?);
        Ok((0..self.entities.len())
            .filter(|&id| self.forest.root(id) == root)
            .map(|id| self.entities[id].clone())
            .collect())
    }

    pub fn community_count(&self) -> usize {
        self.forest.components
    }

    /// Group every registered entity by its root.
    ///
    /// Communities appear in order of their first registered member and
    /// members keep registration order.
    pub fn all_communities(&self) -> Vec<Community<E>> {
        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut communities: Vec<Community<E>> = Vec::with_capacity(self.forest.components);

        for (id, entity) in self.entities.iter().enumerate() {
            let root = self.forest.root(id);
            let slot = *slots.entry(root).or_insert_with(|| {
                communities.push(Community {
                    representative: self.entities[root].clone(),
                    members: Vec::new(),
                });
                communities.len() - 1
            });
            communities[slot].members.push(entity.clone());
        }

        communities
    }

    /// Registered entities in registration order
    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    /// Retained edges in the order they were first applied
    pub fn edges(&self) -> &[SimilarityEdge<E>] {
        &self.edges
    }

    /// Number of retained edges touching `entity`
    pub fn degree(&self, entity: &E) -> GraphResult<usize> {
        Ok(self.adjacency[self.id_of(entity)?].len())
    }

    /// Entities sharing a retained edge with `entity`, with the edge weight,
    /// in the order the edges were applied
    pub fn neighbors(&self, entity: &E) -> GraphResult<Vec<(&E, f64)>> {
        let id = self.id_of(entity)?;
        Ok(self.adjacency[id]
            .iter()
            .map(|&edge_id| {
                let edge = &self.edges[edge_id];
                let other = if edge.source == *entity {
                    &edge.target
                } else {
                    &edge.source
                };
                (other, edge.weight)
            })
            .collect())
    }

    /// Weight of the retained edge between `a` and `b`, in either direction
    pub fn edge_weight(&self, a: &E, b: &E) -> GraphResult<Option<f64>> {
        let a = self.id_of(a)?;
        let b = self.id_of(b)?;
        Ok(self
            .edge_keys
            .get(&(a.min(b), a.max(b)))
            .map(|&edge_id| self.edges[edge_id].weight))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn id_of(&self, entity: &E) -> GraphResult<usize> {
        self.index
            .get(entity)
            .copied()
            .ok_or_else(|| GraphError::UnregisteredEntity {
                entity: format!("{entity:?}"),
            })
    }

    fn ensure_mutable(&self, operation: &'static str) -> GraphResult<()> {
        if self.state == PartitionState::Partitioned {
            return Err(GraphError::StateError { operation });
        }
        Ok(())
    }
}

/// Register every entity, fold in all edges at `threshold`, and finalize
///
/// # Errors
/// * `GraphError::InvalidConfiguration` if the threshold is out of range
pub fn partition_memberships<E, I>(
    memberships: &MembershipSet<E, I>,
    threshold: f64,
) -> GraphResult<CommunityPartitioner<E>>
where
    E: Eq + Hash + Clone + Debug,
    I: Eq + Hash,
{
    let edges = compute_edges(memberships, threshold)?;

    let mut partitioner = CommunityPartitioner::new();
    for entity in memberships.entities() {
        partitioner.register(entity.clone())?;
    }
    for edge in &edges {
        partitioner.union(edge)?;
    }
    partitioner.finalize()?;

    Ok(partitioner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &'static str, target: &'static str, weight: f64) -> SimilarityEdge<&'static str> {
        SimilarityEdge {
            source,
            target,
            weight,
        }
    }

    fn registered(entities: &[&'static str]) -> CommunityPartitioner<&'static str> {
        let mut partitioner = CommunityPartitioner::new();
        for &entity in entities {
            partitioner.register(entity).unwrap();
        }
        partitioner
    }

    fn member_sets(partitioner: &CommunityPartitioner<&'static str>) -> Vec<Vec<&'static str>> {
        partitioner
            .all_communities()
            .into_iter()
            .map(|c| c.members)
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        let mut partitioner = CommunityPartitioner::<&str>::new();
        assert_eq!(partitioner.state(), PartitionState::Empty);

        partitioner.register("A").unwrap();
        assert_eq!(partitioner.state(), PartitionState::Registering);

        partitioner.finalize().unwrap();
        assert_eq!(partitioner.state(), PartitionState::Partitioned);
    }

    #[test]
    fn test_mutation_after_finalize_rejected() {
        let mut partitioner = registered(&["A", "B"]);
        partitioner.finalize().unwrap();

        assert_eq!(
            partitioner.register("C"),
            Err(GraphError::StateError { operation: "register" })
        );
        assert_eq!(
            partitioner.union(&edge("A", "B", 0.5)),
            Err(GraphError::StateError { operation: "union" })
        );
        assert!(matches!(
            partitioner.finalize(),
            Err(GraphError::StateError { .. })
        ));
        assert_eq!(partitioner.community_count(), 2);
    }

    #[test]
    fn test_union_requires_registration() {
        let mut partitioner = registered(&["A"]);
        let result = partitioner.union(&edge("A", "Z", 0.9));
        assert!(matches!(
            result,
            Err(GraphError::UnregisteredEntity { ref entity }) if entity.contains('Z')
        ));
        assert!(partitioner.edges().is_empty());
    }

    #[test]
    fn test_union_repoints_source_root_to_target_root() {
        let mut partitioner = registered(&["A", "B", "C"]);
        assert!(partitioner.union(&edge("A", "B", 0.5)).unwrap());
        assert_eq!(*partitioner.community_of(&"A").unwrap(), "B");

        assert!(partitioner.union(&edge("B", "C", 0.5)).unwrap());
        partitioner.finalize().unwrap();

        for entity in ["A", "B", "C"] {
            assert_eq!(*partitioner.community_of(&entity).unwrap(), "C");
        }
    }

    #[test]
    fn test_transitive_chain() {
        let mut partitioner = registered(&["A", "B", "C", "D"]);
        partitioner.union(&edge("A", "B", 0.4)).unwrap();
        partitioner.union(&edge("B", "C", 0.4)).unwrap();
        partitioner.finalize().unwrap();

        assert!(partitioner.connected(&"A", &"C").unwrap());
        assert!(!partitioner.connected(&"A", &"D").unwrap());
        assert_eq!(partitioner.community_size(&"A").unwrap(), 3);
        assert_eq!(partitioner.community_size(&"D").unwrap(), 1);
        assert_eq!(
            partitioner.community_members(&"C").unwrap(),
            vec!["A", "B", "C"]
        );
        assert_eq!(member_sets(&partitioner), vec![vec!["A", "B", "C"], vec!["D"]]);
    }

    #[test]
    fn test_long_chain_compresses() {
        let names: Vec<String> = (0..10_000).map(|i| format!("u{i}")).collect();
        let mut partitioner = CommunityPartitioner::new();
        for name in &names {
            partitioner.register(name.clone()).unwrap();
        }
        for pair in names.windows(2) {
            let link = SimilarityEdge {
                source: pair[0].clone(),
                target: pair[1].clone(),
                weight: 1.0,
            };
            partitioner.union(&link).unwrap();
        }
        partitioner.finalize().unwrap();

        assert_eq!(partitioner.community_count(), 1);
        assert_eq!(partitioner.community_of(&names[0]).unwrap(), &names[9_999]);
    }

    #[test]
    fn test_idempotence() {
        let mut once = registered(&["A", "B", "C"]);
        once.union(&edge("A", "B", 0.5)).unwrap();
        once.finalize().unwrap();

        let mut twice = registered(&["A", "B", "C"]);
        twice.register("A").unwrap();
        twice.register("B").unwrap();
        assert!(twice.union(&edge("A", "B", 0.5)).unwrap());
        assert!(!twice.union(&edge("A", "B", 0.5)).unwrap());
        assert!(!twice.union(&edge("B", "A", 0.5)).unwrap());
        twice.finalize().unwrap();

        assert_eq!(once.entities(), twice.entities());
        assert_eq!(once.edges(), twice.edges());
        assert_eq!(once.all_communities(), twice.all_communities());
        assert_eq!(twice.degree(&"A").unwrap(), 1);
    }

    #[test]
    fn test_partition_totality() {
        let entities = ["A", "B", "C", "D", "E", "F"];
        let mut partitioner = registered(&entities);
        partitioner.union(&edge("A", "D", 0.3)).unwrap();
        partitioner.union(&edge("E", "F", 0.3)).unwrap();
        partitioner.union(&edge("D", "F", 0.3)).unwrap();
        partitioner.finalize().unwrap();

        let communities = partitioner.all_communities();
        assert_eq!(communities.len(), partitioner.community_count());

        let mut seen: Vec<&str> = communities.iter().flat_map(|c| c.members.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, entities.to_vec());

        for community in &communities {
            for member in &community.members {
                assert_eq!(partitioner.community_of(member).unwrap(), &community.representative);
            }
        }
    }

    #[test]
    fn test_partition_memberships_scenario() {
        let memberships: MembershipSet<&str, &str> = [
            ("U1", vec!["S1", "S2"]),
            ("U2", vec!["S2", "S3"]),
            ("U3", vec!["S9"]),
        ]
        .into_iter()
        .collect();

        let partitioner = partition_memberships(&memberships, 0.2).unwrap();
        assert_eq!(partitioner.state(), PartitionState::Partitioned);
        assert_eq!(partitioner.community_count(), 2);
        assert_eq!(member_sets(&partitioner), vec![vec!["U1", "U2"], vec!["U3"]]);
        assert_eq!(partitioner.edges().len(), 1);
    }

    #[test]
    fn test_partition_memberships_transitive_scenario() {
        let memberships: MembershipSet<&str, u32> =
            [("A", vec![1, 2]), ("B", vec![2, 3]), ("C", vec![3, 4])]
                .into_iter()
                .collect();

        let partitioner = partition_memberships(&memberships, 0.3).unwrap();
        assert_eq!(partitioner.edges().len(), 2);
        assert_eq!(partitioner.community_count(), 1);
        assert!(partitioner.connected(&"A", &"C").unwrap());
        assert_eq!(partitioner.degree(&"B").unwrap(), 2);
    }

    #[test]
    fn test_neighbors_and_edge_weight() {
        let mut partitioner = registered(&["A", "B", "C", "D"]);
        partitioner.union(&edge("A", "B", 0.4)).unwrap();
        partitioner.union(&edge("C", "B", 0.6)).unwrap();
        partitioner.union(&edge("B", "A", 0.9)).unwrap();
        partitioner.finalize().unwrap();

        assert_eq!(partitioner.entity_count(), 4);
        assert_eq!(partitioner.edge_count(), 2);
        assert_eq!(
            partitioner.neighbors(&"B").unwrap(),
            vec![(&"A", 0.4), (&"C", 0.6)]
        );
        assert_eq!(partitioner.neighbors(&"D").unwrap(), Vec::new());
        assert_eq!(partitioner.edge_weight(&"B", &"A").unwrap(), Some(0.4));
        assert_eq!(partitioner.edge_weight(&"A", &"C").unwrap(), None);
        assert!(matches!(
            partitioner.neighbors(&"Z"),
            Err(GraphError::UnregisteredEntity { .. })
        ));
    }

    #[test]
    fn test_partition_memberships_rejects_bad_threshold() {
        let memberships: MembershipSet<&str, u32> = [("A", vec![1])].into_iter().collect();
        assert!(matches!(
            partition_memberships(&memberships, 2.0),
            Err(GraphError::InvalidConfiguration { .. })
        ));
    }
}
