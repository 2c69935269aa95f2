//! Jaccard similarity over per-entity liked-item sets

use crate::error::{GraphError, GraphResult};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

/// Liked-item sets keyed by entity, in first-seen entity order
#[derive(Debug, Clone)]
pub struct MembershipSet<E, I> {
    entries: Vec<(E, HashSet<I>)>,
    index: HashMap<E, usize>,
}

impl<E, I> Default for MembershipSet<E, I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<E, I> MembershipSet<E, I>
where
    E: Eq + Hash + Clone,
    I: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(entity, item, positive)` records, keeping positive ones only
    pub fn from_interactions<R>(records: R) -> Self
    where
        R: IntoIterator<Item = (E, I, bool)>,
    {
        let mut memberships = Self::new();
        for (entity, item, positive) in records {
            if positive {
                memberships.insert(entity, item);
            }
        }
        memberships
    }

    /// Add `item` to the liked set of `entity`, creating the entity if needed
    pub fn insert(&mut self, entity: E, item: I) {
        self.items_mut(entity).insert(item);
    }

    fn items_mut(&mut self, entity: E) -> &mut HashSet<I> {
        let slot = match self.index.get(&entity) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(entity.clone(), slot);
                self.entries.push((entity, HashSet::new()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub fn items(&self, entity: &E) -> Option<&HashSet<I>> {
        self.index.get(entity).map(|&slot| &self.entries[slot].1)
    }

    pub fn entities(&self) -> impl Iterator<Item = &E> {
        self.entries.iter().map(|(entity, _)| entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&E, &HashSet<I>)> {
        self.entries.iter().map(|(entity, items)| (entity, items))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E, I, S> FromIterator<(E, S)> for MembershipSet<E, I>
where
    E: Eq + Hash + Clone,
    I: Eq + Hash,
    S: IntoIterator<Item = I>,
{
    fn from_iter<T: IntoIterator<Item = (E, S)>>(iter: T) -> Self {
        let mut memberships = Self::new();
        for (entity, items) in iter {
            memberships.items_mut(entity).extend(items);
        }
        memberships
    }
}

/// Undirected weighted edge between two distinct entities
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityEdge<E> {
    pub source: E,
    pub target: E,
    /// Jaccard score in `[0.0, 1.0]`
    pub weight: f64,
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|`, defined as 0.0 when both sets are empty
pub fn jaccard<I: Eq + Hash>(a: &HashSet<I>, b: &HashSet<I>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }

    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = smaller.iter().filter(|item| larger.contains(*item)).count();
    let union = a.len() + b.len() - intersection;

    intersection as f64 / union as f64
}

/// Reject thresholds outside `[0.0, 1.0]`, including NaN
pub fn validate_threshold(threshold: f64) -> GraphResult<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(GraphError::InvalidConfiguration { threshold })
    }
}

/// Score every unordered entity pair and keep those with `score >= threshold`
///
/// Pairs are enumerated in insertion order with the second entity always after
/// the first, so each pair is visited once and the output order is stable.
///
/// # Errors
/// * `GraphError::InvalidConfiguration` if the threshold is out of range
pub fn compute_edges<E, I>(
    memberships: &MembershipSet<E, I>,
    threshold: f64,
) -> GraphResult<Vec<SimilarityEdge<E>>>
where
    E: Eq + Hash + Clone,
    I: Eq + Hash,
{
    validate_threshold(threshold)?;

    let entries = &memberships.entries;
    let mut edges = Vec::new();

    for (i, (source, liked_source)) in entries.iter().enumerate() {
        for (target, liked_target) in &entries[i + 1..] {
            let weight = jaccard(liked_source, liked_target);
            if weight >= threshold {
                edges.push(SimilarityEdge {
                    source: source.clone(),
                    target: target.clone(),
                    weight,
                });
            }
        }
    }

    debug!(
        entities = entries.len(),
        accepted = edges.len(),
        threshold,
        "computed similarity edges"
    );

    Ok(edges)
}
