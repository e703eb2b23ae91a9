//! Greedy geo-proximity clustering.
//!
//! Nodes are processed in input order. The first unclaimed node anchors a new
//! cluster, which then claims later unclaimed nodes that lie within range of
//! the anchor until the cluster reaches capacity. Membership is tracked in a
//! separate claim set; the candidate list is never modified while scanning.
//!
//! The grouping is order dependent and O(n²). It targets metro-area node
//! counts (tens to low hundreds), not optimal cluster quality.

use log::debug;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use super::error::{EmptySource, TopologyError};
use super::geometry::within_range;
use super::types::{Coordinate, NodeId};

/// A node with its resolved coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
}

impl LocatedNode {
    pub fn new(id: impl Into<NodeId>, coordinate: Coordinate) -> Self {
        Self { id: id.into(), coordinate }
    }
}

/// Range and capacity bound used for a whole clustering run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringParams {
    /// Maximum anchor-to-member distance in meters (inclusive).
    pub range_m: f64,
    /// Maximum member count per cluster, anchor included.
    pub capacity: usize,
}

impl ClusteringParams {
    /// Validate explicit parameters.
    pub fn new(range_m: f64, capacity: usize) -> Result<Self, TopologyError> {
        if !range_m.is_finite() || range_m < 0.0 {
            return Err(TopologyError::InvalidParameter(format!("range {} m must be finite and non-negative", range_m)));
        }
        if capacity == 0 {
            return Err(TopologyError::InvalidParameter("capacity must be at least 1".to_string()));
        }
        Ok(Self { range_m, capacity })
    }

    /// Derive parameters from node density over the simulated area.
    ///
    /// Without an explicit range, the mean node spacing `sqrt(area / n)` is
    /// used. The capacity is `n` divided by the number of range discs needed
    /// to cover the area, rounded up. Explicit values win over derived ones.
    ///
    /// # Parameters
    ///
    /// * `node_count` - Number of nodes that will be clustered
    /// * `area_m2` - Simulated area in square meters
    /// * `range_m` - Explicit range, if configured
    /// * `capacity` - Explicit capacity, if configured
    pub fn derive(node_count: usize, area_m2: f64, range_m: Option<f64>, capacity: Option<usize>) -> Result<Self, TopologyError> {
        if node_count == 0 {
            return Err(TopologyError::EmptyTier(EmptySource::ClusteringPool));
        }
        if !area_m2.is_finite() || area_m2 <= 0.0 {
            return Err(TopologyError::InvalidParameter(format!("area {} m² must be finite and positive", area_m2)));
        }

        let range_m = range_m.unwrap_or_else(|| (area_m2 / node_count as f64).sqrt().ceil());
        let capacity = match capacity {
            Some(capacity) => capacity,
            None => {
                let disc = PI * range_m * range_m;
                let implied_clusters = if disc > 0.0 { (area_m2 / disc).ceil().max(1.0) } else { node_count as f64 };
                ((node_count as f64 / implied_clusters).ceil() as usize).max(1)
            }
        };

        debug!("Area/node: {:.1} m², range: {:.1} m, capacity: {}", area_m2 / node_count as f64, range_m, capacity);
        Self::new(range_m, capacity)
    }
}

/// A group of nodes founded by an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: usize,
    pub anchor: NodeId,
    /// Anchor first, then members in claim order.
    pub members: Vec<NodeId>,
    pub capacity: usize,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.members.contains(node)
    }
}

/// Assignment of every input node to exactly one cluster.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub clusters: Vec<Cluster>,
    assignment: HashMap<NodeId, usize>,
}

impl Partition {
    /// Cluster id of a node.
    pub fn cluster_of(&self, node: &NodeId) -> Option<usize> {
        self.assignment.get(node).copied()
    }

    /// Number of node-to-cluster assignments across all clusters.
    pub fn total_members(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// Clusters with more than one member.
    pub fn promotable(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| !c.is_singleton())
    }

    pub fn singleton_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_singleton()).count()
    }

    /// Check that each input node is in exactly one cluster.
    pub fn verify_coverage(&self, nodes: &[LocatedNode]) -> Result<(), TopologyError> {
        let total = self.total_members();
        if total != nodes.len() {
            return Err(TopologyError::Consistency(format!("{} nodes were assigned {} times", nodes.len(), total)));
        }
        let mut seen = HashSet::with_capacity(total);
        for cluster in &self.clusters {
            for member in &cluster.members {
                if !seen.insert(member) {
                    return Err(TopologyError::Consistency(format!("node {} belongs to more than one cluster", member)));
                }
                if self.assignment.get(member) != Some(&cluster.id) {
                    return Err(TopologyError::Consistency(format!("node {} is not assigned to cluster {}", member, cluster.id)));
                }
            }
        }
        if let Some(missing) = nodes.iter().find(|n| !seen.contains(&n.id)) {
            return Err(TopologyError::Consistency(format!("node {} was not assigned to any cluster", missing.id)));
        }
        Ok(())
    }
}

/// Partition `nodes` into range- and capacity-bounded clusters.
///
/// # Returns
///
/// The partition, or `DuplicateNode` if an id appears twice in the input.
pub fn cluster_nodes(nodes: &[LocatedNode], params: &ClusteringParams) -> Result<Partition, TopologyError> {
    let mut unique = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !unique.insert(&node.id) {
            return Err(TopologyError::DuplicateNode(node.id.clone()));
        }
    }

    let mut claimed = vec![false; nodes.len()];
    let mut partition = Partition::default();

    for (i, anchor) in nodes.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let cluster_id = partition.clusters.len();
        let mut members = vec![anchor.id.clone()];

        // Every node before `i` is already claimed.
        for (j, candidate) in nodes.iter().enumerate().skip(i + 1) {
            if members.len() >= params.capacity {
                break;
            }
            if claimed[j] {
                continue;
            }
            if within_range(&anchor.coordinate, &candidate.coordinate, params.range_m) {
                claimed[j] = true;
                members.push(candidate.id.clone());
            }
        }

        for member in &members {
            partition.assignment.insert(member.clone(), cluster_id);
        }
        debug!("Cluster {} anchored at {} has {} nodes", cluster_id, anchor.id, members.len());
        partition.clusters.push(Cluster {
            id: cluster_id,
            anchor: anchor.id.clone(),
            members,
            capacity: params.capacity,
        });
    }

    Ok(partition)
}
