//! Four-level device hierarchy assembly.
//!
//! Levels:
//! - 0: one root coordinator for the region (parent unset)
//! - 1: one coordinator per promoted cluster (parent = root, 100 ms uplink)
//! - 2: one device per remaining cluster member (parent = its coordinator, 4 ms uplink)
//! - 3: one device per mobile user (parent chosen by a [`LeafParentAssigner`], 2 ms uplink)
//!
//! Every constructed device is described by one row in the
//! [`TopologyRecorder`]. Device to node bindings are held back and only
//! handed to the [`NodeLinker`] by [`TopologyAssembler::finish`].

use log::{debug, warn};
use std::collections::HashMap;

use super::clustering::LocatedNode;
use super::election::PromotedCluster;
use super::error::TopologyError;
use super::geometry::haversine_km;
use super::recorder::{DeviceRow, NO_PARENT_BLOCK, TopologyRecorder};
use super::types::{
    Coordinate, Device, DeviceId, DeviceRole, GATEWAY_UPLINK_LATENCY_MS, Level, MOBILE_UPLINK_LATENCY_MS, NodeId, PROXY_UPLINK_LATENCY_MS,
    ParentRef, ResourceProfile,
};

/// Source of synthetic device ids, owned by the simulation host.
pub trait IdGenerator {
    fn next_id(&mut self) -> DeviceId;
}

/// Monotonic ids starting at a fixed value.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: DeviceId,
}

impl SequentialIds {
    pub fn starting_at(first: DeviceId) -> Self {
        Self { next: first }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> DeviceId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Write-only association of devices with dataset nodes.
pub trait NodeLinker {
    fn bind(&mut self, device: DeviceId, node: &NodeId);
}

/// In-memory device → node table.
#[derive(Debug, Default, Clone)]
pub struct LinkTable {
    links: HashMap<DeviceId, NodeId>,
}

impl LinkTable {
    pub fn node_of(&self, device: DeviceId) -> Option<&NodeId> {
        self.links.get(&device)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl NodeLinker for LinkTable {
    fn bind(&mut self, device: DeviceId, node: &NodeId) {
        self.links.insert(device, node.clone());
    }
}

/// Hook through which a location-tracking collaborator picks the gateway a
/// mobile user attaches to.
pub trait LeafParentAssigner {
    /// Return a level-2 device id, or `None` to leave the leaf unattached.
    fn assign(&mut self, user: &LocatedNode, hierarchy: &Hierarchy) -> Option<DeviceId>;
}

/// Leaves every mobile user unattached.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unassigned;

impl LeafParentAssigner for Unassigned {
    fn assign(&mut self, _user: &LocatedNode, _hierarchy: &Hierarchy) -> Option<DeviceId> {
        None
    }
}

/// Attaches a mobile user to the geographically closest cluster member.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestMember;

impl LeafParentAssigner for NearestMember {
    fn assign(&mut self, user: &LocatedNode, hierarchy: &Hierarchy) -> Option<DeviceId> {
        hierarchy
            .devices_at_level(Level::ClusterMember)
            .map(|d| (d.id, haversine_km(&user.coordinate, &d.coordinate)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

/// Rooted device tree.
#[derive(Debug, Default, Clone)]
pub struct Hierarchy {
    devices: Vec<Device>,
    index: HashMap<DeviceId, usize>,
}

impl Hierarchy {
    fn push(&mut self, device: Device) -> Result<(), TopologyError> {
        if self.index.contains_key(&device.id) {
            return Err(TopologyError::Consistency(format!("device id {} was handed out twice", device.id)));
        }
        self.index.insert(device.id, self.devices.len());
        self.devices.push(device);
        Ok(())
    }

    pub fn root(&self) -> Option<&Device> {
        self.devices.iter().find(|d| d.level == Level::Root)
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.index.get(&id).map(|&i| &self.devices[i])
    }

    /// All devices in construction order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn devices_at_level(&self, level: Level) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.level == level)
    }

    pub fn children_of(&self, parent: DeviceId) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.parent == ParentRef::Device(parent))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Attach a mobile leaf under a cluster member.
    pub fn link_leaf(&mut self, leaf: DeviceId, parent: DeviceId) -> Result<(), TopologyError> {
        let invalid = TopologyError::InvalidLeafParent { leaf, parent };
        let block = match self.get(parent) {
            Some(p) if p.level == Level::ClusterMember => p.block,
            _ => return Err(invalid),
        };
        let &i = self.index.get(&leaf).ok_or_else(|| invalid.clone())?;
        let device = &mut self.devices[i];
        if device.level != Level::MobileLeaf {
            return Err(invalid);
        }
        device.parent = ParentRef::Device(parent);
        device.block = block;
        Ok(())
    }
}

/// Builds a [`Hierarchy`] level by level.
pub struct TopologyAssembler<'a> {
    ids: &'a mut dyn IdGenerator,
    linker: &'a mut dyn NodeLinker,
    recorder: &'a mut TopologyRecorder,
    hierarchy: Hierarchy,
    root: Option<DeviceId>,
    gateway_count: u32,
    pending_links: Vec<(DeviceId, NodeId)>,
}

impl<'a> TopologyAssembler<'a> {
    pub fn new(ids: &'a mut dyn IdGenerator, linker: &'a mut dyn NodeLinker, recorder: &'a mut TopologyRecorder) -> Self {
        Self {
            ids,
            linker,
            recorder,
            hierarchy: Hierarchy::default(),
            root: None,
            gateway_count: 0,
            pending_links: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self,
        name: String,
        level: Level,
        role: DeviceRole,
        parent: ParentRef,
        uplink_latency_ms: f64,
        source: &NodeId,
        coordinate: Coordinate,
        block: u32,
    ) -> Result<DeviceId, TopologyError> {
        let id = self.ids.next_id();
        self.hierarchy.push(Device {
            id,
            name,
            level,
            role,
            parent,
            uplink_latency_ms,
            profile: ResourceProfile::for_role(role),
            source: source.clone(),
            coordinate,
            block,
        })?;
        self.pending_links.push((id, source.clone()));
        Ok(id)
    }

    /// Create the level-0 coordinator.
    pub fn add_root(&mut self, node: &LocatedNode) -> Result<DeviceId, TopologyError> {
        if self.root.is_some() {
            return Err(TopologyError::Consistency("root device already exists".to_string()));
        }
        let id = self.create("cloud".to_string(), Level::Root, DeviceRole::Cloud, ParentRef::Unset, 0.0, &node.id, node.coordinate, 0)?;
        self.recorder.write(DeviceRow {
            coordinate: node.coordinate,
            block: 0,
            level: Level::Root.as_u8(),
            parent_block: NO_PARENT_BLOCK,
            label: "Datacenter".to_string(),
        });
        self.root = Some(id);
        Ok(id)
    }

    /// Create the coordinator and member devices of one promoted cluster.
    ///
    /// # Returns
    ///
    /// The coordinator's device id.
    pub fn add_cluster(&mut self, cluster: &PromotedCluster, coordinates: &HashMap<NodeId, Coordinate>) -> Result<DeviceId, TopologyError> {
        let root = self
            .root
            .ok_or_else(|| TopologyError::Consistency("cluster added before the root device".to_string()))?;
        let locate = |node: &NodeId| {
            coordinates
                .get(node)
                .copied()
                .ok_or_else(|| TopologyError::Consistency(format!("no resolved coordinate for clustered node {}", node)))
        };

        let block = cluster.block;
        if block == 0 {
            return Err(TopologyError::Consistency(format!("cluster {} has block number 0", cluster.cluster_id)));
        }
        let proxy_position = locate(&cluster.proxy)?;
        let proxy = self.create(
            format!("proxy-server_{}", block - 1),
            Level::ClusterCoordinator,
            DeviceRole::Fon,
            ParentRef::Device(root),
            PROXY_UPLINK_LATENCY_MS,
            &cluster.proxy,
            proxy_position,
            block,
        )?;
        self.recorder.write(DeviceRow {
            coordinate: proxy_position,
            block,
            level: Level::ClusterCoordinator.as_u8(),
            parent_block: 0,
            label: format!("Block {} Proxy", block),
        });

        for member in &cluster.members {
            self.gateway_count += 1;
            let position = locate(member)?;
            self.create(
                format!("gateway_{}", self.gateway_count),
                Level::ClusterMember,
                DeviceRole::Fcn,
                ParentRef::Device(proxy),
                GATEWAY_UPLINK_LATENCY_MS,
                member,
                position,
                block,
            )?;
            self.recorder.write(DeviceRow {
                coordinate: position,
                block,
                level: Level::ClusterMember.as_u8(),
                parent_block: block as i64,
                label: format!("GW {}", self.gateway_count),
            });
        }

        debug!("Block {} assembled: proxy device {} with {} members", block, proxy, cluster.members.len());
        Ok(proxy)
    }

    /// Create one leaf per mobile user and attach it where the assigner says.
    pub fn add_mobile_leaves(&mut self, users: &[LocatedNode], assigner: &mut dyn LeafParentAssigner) -> Result<Vec<DeviceId>, TopologyError> {
        let mut leaves = Vec::with_capacity(users.len());
        for (i, user) in users.iter().enumerate() {
            let id = self.create(
                format!("mobile_{}", i),
                Level::MobileLeaf,
                DeviceRole::Client,
                ParentRef::Unset,
                MOBILE_UPLINK_LATENCY_MS,
                &user.id,
                user.coordinate,
                0,
            )?;

            match assigner.assign(user, &self.hierarchy) {
                Some(parent) => self.hierarchy.link_leaf(id, parent)?,
                None => warn!("Mobile user {} has no gateway in range; leaf {} left unattached", user.id, id),
            }

            let (block, parent_block) = match self.hierarchy.get(id).map(|d| (d.parent, d.block)) {
                Some((ParentRef::Device(_), block)) => (block, block as i64),
                _ => (0, NO_PARENT_BLOCK),
            };
            self.recorder.write(DeviceRow {
                coordinate: user.coordinate,
                block,
                level: Level::MobileLeaf.as_u8(),
                parent_block,
                label: format!("Mobile {}", i),
            });
            leaves.push(id);
        }
        Ok(leaves)
    }

    /// Bind every created device to its source node and return the hierarchy.
    pub fn finish(self) -> Hierarchy {
        let Self { linker, hierarchy, pending_links, .. } = self;
        for (device, node) in &pending_links {
            linker.bind(*device, node);
        }
        hierarchy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, lat: f64, lon: f64) -> LocatedNode {
        LocatedNode::new(id, Coordinate::new(lat, lon))
    }

    fn promoted(block: u32, proxy: &str, members: &[&str]) -> PromotedCluster {
        PromotedCluster {
            block,
            cluster_id: block as usize - 1,
            anchor: NodeId::from(proxy),
            proxy: NodeId::from(proxy),
            members: members.iter().map(|m| NodeId::from(*m)).collect(),
        }
    }

    fn coordinates(nodes: &[LocatedNode]) -> HashMap<NodeId, Coordinate> {
        nodes.iter().map(|n| (n.id.clone(), n.coordinate)).collect()
    }

    #[test]
    fn builds_levels_with_parents_and_latencies() {
        let nodes = vec![node("p1", 0.0, 0.0), node("g1", 0.0, 0.01), node("g2", 0.0, 0.02), node("p2", 1.0, 0.0), node("g3", 1.0, 0.01)];
        let coords = coordinates(&nodes);
        let mut ids = SequentialIds::starting_at(10);
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();

        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        let root = assembler.add_root(&node("dc", 5.0, 5.0)).unwrap();
        let first = assembler.add_cluster(&promoted(1, "p1", &["g1", "g2"]), &coords).unwrap();
        let second = assembler.add_cluster(&promoted(2, "p2", &["g3"]), &coords).unwrap();
        let hierarchy = assembler.finish();

        assert_eq!(root, 10);
        assert_eq!(hierarchy.len(), 6);
        let root_device = hierarchy.root().unwrap();
        assert_eq!(root_device.parent, ParentRef::Unset);
        assert_eq!(root_device.profile, ResourceProfile::for_role(DeviceRole::Cloud));

        for proxy in hierarchy.devices_at_level(Level::ClusterCoordinator) {
            assert_eq!(proxy.parent, ParentRef::Device(root));
            assert_eq!(proxy.uplink_latency_ms, 100.0);
        }
        let first_children: Vec<_> = hierarchy.children_of(first).map(|d| d.name.clone()).collect();
        assert_eq!(first_children, vec!["gateway_1", "gateway_2"]);
        let second_children: Vec<_> = hierarchy.children_of(second).map(|d| d.name.clone()).collect();
        assert_eq!(second_children, vec!["gateway_3"]);
        assert!(hierarchy.devices_at_level(Level::ClusterMember).all(|d| d.uplink_latency_ms == 4.0));

        assert_eq!(links.len(), 6);
        assert_eq!(links.node_of(first), Some(&NodeId::from("p1")));

        let labels: Vec<_> = recorder.snapshot().iter().map(|r| (r.block, r.level, r.parent_block, r.label.as_str())).collect();
        assert_eq!(
            labels,
            vec![
                (0, 0, -1, "Datacenter"),
                (1, 1, 0, "Block 1 Proxy"),
                (1, 2, 1, "GW 1"),
                (1, 2, 1, "GW 2"),
                (2, 1, 0, "Block 2 Proxy"),
                (2, 2, 2, "GW 3"),
            ]
        );
    }

    #[test]
    fn block_zero_is_rejected() {
        let nodes = vec![node("p1", 0.0, 0.0), node("g1", 0.0, 0.01)];
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();
        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        assembler.add_root(&node("dc", 5.0, 5.0)).unwrap();
        let mut cluster = promoted(1, "p1", &["g1"]);
        cluster.block = 0;
        let err = assembler.add_cluster(&cluster, &coordinates(&nodes)).unwrap_err();
        assert!(matches!(err, TopologyError::Consistency(_)));
    }

    #[test]
    fn links_are_bound_on_finish() {
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();
        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        let root = assembler.add_root(&node("dc", 5.0, 5.0)).unwrap();
        drop(assembler);
        assert!(links.is_empty());

        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        let again = assembler.add_root(&node("dc", 5.0, 5.0)).unwrap();
        assembler.finish();
        assert_ne!(root, again);
        assert_eq!(links.len(), 1);
        assert_eq!(links.node_of(again), Some(&NodeId::from("dc")));
    }

    #[test]
    fn cluster_before_root_is_rejected() {
        let nodes = vec![node("p1", 0.0, 0.0), node("g1", 0.0, 0.01)];
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();
        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        let err = assembler.add_cluster(&promoted(1, "p1", &["g1"]), &coordinates(&nodes)).unwrap_err();
        assert!(matches!(err, TopologyError::Consistency(_)));
    }

    #[test]
    fn mobile_leaves_attach_to_nearest_member() {
        let nodes = vec![node("p1", 0.0, 0.0), node("g1", 0.0, 0.01), node("p2", 1.0, 0.0), node("g2", 1.0, 0.01)];
        let coords = coordinates(&nodes);
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();

        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        assembler.add_root(&node("dc", 5.0, 5.0)).unwrap();
        assembler.add_cluster(&promoted(1, "p1", &["g1"]), &coords).unwrap();
        assembler.add_cluster(&promoted(2, "p2", &["g2"]), &coords).unwrap();
        let users = vec![node("user_1", 0.99, 0.02), node("user_2", 0.01, 0.0)];
        let leaves = assembler.add_mobile_leaves(&users, &mut NearestMember).unwrap();
        let hierarchy = assembler.finish();

        let g2 = hierarchy.devices().iter().find(|d| d.source == NodeId::from("g2")).unwrap().id;
        let g1 = hierarchy.devices().iter().find(|d| d.source == NodeId::from("g1")).unwrap().id;
        let first = hierarchy.get(leaves[0]).unwrap();
        assert_eq!(first.parent, ParentRef::Device(g2));
        assert_eq!(first.uplink_latency_ms, 2.0);
        assert_eq!(first.level, Level::MobileLeaf);
        assert_eq!(first.block, 2);
        assert_eq!(hierarchy.get(leaves[1]).unwrap().parent, ParentRef::Device(g1));

        let last = recorder.snapshot().last().unwrap();
        assert_eq!((last.block, last.level, last.parent_block, last.label.as_str()), (1, 3, 1, "Mobile 1"));
    }

    #[test]
    fn unassigned_leaves_keep_unset_parent() {
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();
        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        assembler.add_root(&node("dc", 0.0, 0.0)).unwrap();
        let leaves = assembler.add_mobile_leaves(&[node("user_1", 0.0, 0.0)], &mut Unassigned).unwrap();
        let hierarchy = assembler.finish();

        assert_eq!(hierarchy.get(leaves[0]).unwrap().parent, ParentRef::Unset);
        let row = &recorder.snapshot()[1];
        assert_eq!((row.block, row.parent_block), (0, -1));
    }

    #[test]
    fn leaves_only_link_under_cluster_members() {
        let nodes = vec![node("p1", 0.0, 0.0), node("g1", 0.0, 0.01)];
        let mut ids = SequentialIds::default();
        let mut links = LinkTable::default();
        let mut recorder = TopologyRecorder::default();
        let mut assembler = TopologyAssembler::new(&mut ids, &mut links, &mut recorder);
        let root = assembler.add_root(&node("dc", 0.0, 0.0)).unwrap();
        let proxy = assembler.add_cluster(&promoted(1, "p1", &["g1"]), &coordinates(&nodes)).unwrap();
        let leaves = assembler.add_mobile_leaves(&[node("user_1", 0.0, 0.0)], &mut Unassigned).unwrap();
        let mut hierarchy = assembler.finish();

        let leaf = leaves[0];
        assert_eq!(hierarchy.link_leaf(leaf, root), Err(TopologyError::InvalidLeafParent { leaf, parent: root }));
        assert_eq!(hierarchy.link_leaf(leaf, proxy), Err(TopologyError::InvalidLeafParent { leaf, parent: proxy }));
        let gateway = hierarchy.children_of(proxy).next().unwrap().id;
        // A gateway is not a leaf.
        assert!(hierarchy.link_leaf(gateway, gateway).is_err());
        hierarchy.link_leaf(leaf, gateway).unwrap();
        assert_eq!(hierarchy.get(leaf).unwrap().parent, ParentRef::Device(gateway));
    }
}
