//! Geo-proximity topology construction.
//!
//! This module turns a located node dataset into a four-level device
//! hierarchy. It integrates:
//! - Great-circle distance (`geometry`)
//! - Greedy range/capacity-bounded clustering (`clustering`)
//! - Deterministic coordinator election (`election`)
//! - Hierarchy assembly with fixed latencies and profiles (`assembler`)
//! - Per-device CSV rows (`recorder`)
//!
//! ## Public API
//!
//! The main entry point is [`build_topology`]. It runs as one synchronous
//! pass; any error aborts the build before a hierarchy is returned. Flushing
//! the recorder afterwards is the caller's job.

pub mod assembler;
pub mod clustering;
pub mod election;
pub mod error;
pub mod geometry;
pub mod recorder;
pub mod resolver;
pub mod types;

use log::info;
use std::collections::{HashMap, HashSet};

pub use assembler::{Hierarchy, IdGenerator, LeafParentAssigner, LinkTable, NearestMember, NodeLinker, SequentialIds, TopologyAssembler, Unassigned};
pub use clustering::{Cluster, ClusteringParams, LocatedNode, Partition, cluster_nodes};
pub use election::{PromotedCluster, elect_proxies};
pub use error::{EmptySource, TopologyError};
pub use geometry::{haversine_km, within_range};
pub use recorder::{RecorderRow, TopologyRecorder};
pub use resolver::{LocationResolver, StaticLocations};
pub use types::{Coordinate, Device, DeviceId, Level, NodeId, ParentRef, Tier};

/// Area and clustering overrides for one build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildSettings {
    /// Simulated area in square meters.
    pub area_m2: f64,
    /// Explicit range in meters; derived from node spacing when `None`.
    pub range_m: Option<f64>,
    /// Explicit capacity; derived from node density when `None`.
    pub capacity: Option<usize>,
}

/// Default simulated area (m²).
pub const DEFAULT_AREA_M2: f64 = 5_000_000.0;

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            area_m2: DEFAULT_AREA_M2,
            range_m: None,
            capacity: None,
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct Topology {
    pub params: ClusteringParams,
    pub partition: Partition,
    pub promoted: Vec<PromotedCluster>,
    pub hierarchy: Hierarchy,
    pub mobile_leaves: Vec<DeviceId>,
}

/// Resolve a list of ids to located nodes, failing on the first unknown one.
fn locate_all(resolver: &dyn LocationResolver, ids: Vec<NodeId>) -> Result<Vec<LocatedNode>, TopologyError> {
    ids.into_iter()
        .map(|id| match resolver.coordinate_of(&id) {
            Some(coordinate) => Ok(LocatedNode { id, coordinate }),
            None => Err(TopologyError::MissingCoordinate(id)),
        })
        .collect()
}

/// Build the device hierarchy for the nodes known to `resolver`.
///
/// The first `Cloud` node becomes the root; `Proxy` followed by `Gateway`
/// nodes, in dataset order, are clustered; mobile users become leaves.
///
/// # Parameters
///
/// * `resolver` - Location source, fully queried before clustering
/// * `settings` - Area and optional range/capacity overrides
/// * `ids` - Device id source
/// * `linker` - Receives a device → node binding per device
/// * `assigner` - Chooses the gateway of each mobile leaf
/// * `recorder` - Receives one row per device
///
/// # Returns
///
/// The built topology. On error nothing is returned and the recorder is left
/// as it was before the call.
pub fn build_topology(
    resolver: &dyn LocationResolver,
    settings: &BuildSettings,
    ids: &mut dyn IdGenerator,
    linker: &mut dyn NodeLinker,
    assigner: &mut dyn LeafParentAssigner,
    recorder: &mut TopologyRecorder,
) -> Result<Topology, TopologyError> {
    let cloud_ids = resolver.nodes_at_tier(Tier::Cloud);
    let Some(cloud_id) = cloud_ids.into_iter().next() else {
        return Err(TopologyError::EmptyTier(EmptySource::Tier(Tier::Cloud)));
    };
    let mut pool_ids = resolver.nodes_at_tier(Tier::Proxy);
    pool_ids.extend(resolver.nodes_at_tier(Tier::Gateway));
    if pool_ids.is_empty() {
        return Err(TopologyError::EmptyTier(EmptySource::ClusteringPool));
    }

    let root = locate_all(resolver, vec![cloud_id])?.remove(0);
    let nodes = locate_all(resolver, pool_ids)?;
    let users = locate_all(resolver, resolver.mobile_users())?;

    let params = ClusteringParams::derive(nodes.len(), settings.area_m2, settings.range_m, settings.capacity)?;
    info!("Total nodes: {}, range: {:.0} m, capacity: {}", nodes.len(), params.range_m, params.capacity);

    let partition = cluster_nodes(&nodes, &params)?;
    partition.verify_coverage(&nodes)?;
    info!(
        "Clusters: {} ({} singletons), assigned nodes: {}",
        partition.clusters.len(),
        partition.singleton_count(),
        partition.total_members()
    );

    let known: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let promoted = elect_proxies(&partition, &known)?;
    info!("Selected clusters: {}", promoted.len());

    let coordinates: HashMap<NodeId, Coordinate> = nodes.iter().map(|n| (n.id.clone(), n.coordinate)).collect();
    let checkpoint = recorder.checkpoint();
    let assembled = assemble(&root, &promoted, &coordinates, &users, ids, linker, assigner, recorder);
    let (hierarchy, mobile_leaves) = match assembled {
        Ok(built) => built,
        Err(e) => {
            recorder.rollback(checkpoint);
            return Err(e);
        }
    };
    info!("Hierarchy built with {} devices ({} mobile leaves)", hierarchy.len(), mobile_leaves.len());

    Ok(Topology {
        params,
        partition,
        promoted,
        hierarchy,
        mobile_leaves,
    })
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    root: &LocatedNode,
    promoted: &[PromotedCluster],
    coordinates: &HashMap<NodeId, Coordinate>,
    users: &[LocatedNode],
    ids: &mut dyn IdGenerator,
    linker: &mut dyn NodeLinker,
    assigner: &mut dyn LeafParentAssigner,
    recorder: &mut TopologyRecorder,
) -> Result<(Hierarchy, Vec<DeviceId>), TopologyError> {
    let mut assembler = TopologyAssembler::new(ids, linker, recorder);
    assembler.add_root(root)?;
    for cluster in promoted {
        assembler.add_cluster(cluster, coordinates)?;
    }
    let leaves = assembler.add_mobile_leaves(users, assigner)?;
    Ok((assembler.finish(), leaves))
}
