//! Coordinator election for multi-member clusters.

use log::debug;
use std::collections::HashSet;

use super::clustering::Partition;
use super::error::TopologyError;
use super::types::NodeId;

/// A cluster selected for the hierarchy, split into its coordinator and the
/// remaining members.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotedCluster {
    /// 1-based position among promoted clusters.
    pub block: u32,
    pub cluster_id: usize,
    pub anchor: NodeId,
    pub proxy: NodeId,
    /// Members other than the proxy, in claim order.
    pub members: Vec<NodeId>,
}

/// Elect one proxy per cluster with at least two members.
///
/// The proxy is the smallest member id, so repeated builds on identical input
/// elect the same nodes. Singleton clusters are dropped.
///
/// # Parameters
///
/// * `partition` - Clustering output
/// * `known` - Every node id that was clustered
pub fn elect_proxies(partition: &Partition, known: &HashSet<NodeId>) -> Result<Vec<PromotedCluster>, TopologyError> {
    let mut promoted = Vec::new();

    for cluster in partition.promotable() {
        if let Some(unknown) = cluster.members.iter().find(|m| !known.contains(*m)) {
            return Err(TopologyError::Consistency(format!("cluster {} references unknown node {}", cluster.id, unknown)));
        }

        let mut sorted = cluster.members.clone();
        sorted.sort();
        let proxy = sorted.swap_remove(0);
        let members: Vec<NodeId> = cluster.members.iter().filter(|m| **m != proxy).cloned().collect();

        let block = promoted.len() as u32 + 1;
        debug!("Block {}: proxy {} with {} members", block, proxy, members.len());
        promoted.push(PromotedCluster {
            block,
            cluster_id: cluster.id,
            anchor: cluster.anchor.clone(),
            proxy,
            members,
        });
    }

    Ok(promoted)
}
