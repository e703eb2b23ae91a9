//! Location lookup used at the start of a build.

use std::collections::HashMap;

use super::types::{Coordinate, NodeId, Tier};

/// Source of node positions and tier membership.
///
/// Implemented by the location dataset loader; the build queries it once,
/// before clustering starts.
pub trait LocationResolver {
    /// Coordinate of a node or mobile user, if known.
    fn coordinate_of(&self, node: &NodeId) -> Option<Coordinate>;

    /// Nodes of a tier in dataset order.
    fn nodes_at_tier(&self, tier: Tier) -> Vec<NodeId>;

    /// Mobile end-user ids in dataset order.
    fn mobile_users(&self) -> Vec<NodeId> {
        Vec::new()
    }
}

/// In-memory resolver backed by insertion-ordered lists.
#[derive(Debug, Default, Clone)]
pub struct StaticLocations {
    coordinates: HashMap<NodeId, Coordinate>,
    tiers: Vec<(NodeId, Tier)>,
    users: Vec<NodeId>,
}

impl StaticLocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tiered infrastructure node.
    pub fn add_node(&mut self, id: impl Into<NodeId>, tier: Tier, coordinate: Coordinate) -> &mut Self {
        let id = id.into();
        self.coordinates.insert(id.clone(), coordinate);
        self.tiers.push((id, tier));
        self
    }

    /// Register a node in a tier without a coordinate.
    pub fn add_unlocated_node(&mut self, id: impl Into<NodeId>, tier: Tier) -> &mut Self {
        self.tiers.push((id.into(), tier));
        self
    }

    /// Register a mobile end user at its initial position.
    pub fn add_mobile_user(&mut self, id: impl Into<NodeId>, coordinate: Coordinate) -> &mut Self {
        let id = id.into();
        self.coordinates.insert(id.clone(), coordinate);
        self.users.push(id);
        self
    }
}

impl LocationResolver for StaticLocations {
    fn coordinate_of(&self, node: &NodeId) -> Option<Coordinate> {
        self.coordinates.get(node).copied()
    }

    fn nodes_at_tier(&self, tier: Tier) -> Vec<NodeId> {
        self.tiers.iter().filter(|(_, t)| *t == tier).map(|(id, _)| id.clone()).collect()
    }

    fn mobile_users(&self) -> Vec<NodeId> {
        self.users.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_keep_insertion_order() {
        let mut locations = StaticLocations::new();
        locations
            .add_node("b", Tier::Proxy, Coordinate::new(1.0, 1.0))
            .add_node("cloud", Tier::Cloud, Coordinate::new(0.0, 0.0))
            .add_node("a", Tier::Proxy, Coordinate::new(2.0, 2.0));

        assert_eq!(locations.nodes_at_tier(Tier::Proxy), vec![NodeId::from("b"), NodeId::from("a")]);
        assert_eq!(locations.nodes_at_tier(Tier::Gateway), Vec::<NodeId>::new());
        assert_eq!(locations.coordinate_of(&NodeId::from("a")), Some(Coordinate::new(2.0, 2.0)));
    }

    #[test]
    fn unlocated_nodes_have_no_coordinate() {
        let mut locations = StaticLocations::new();
        locations.add_unlocated_node("ghost", Tier::Gateway);
        assert_eq!(locations.nodes_at_tier(Tier::Gateway).len(), 1);
        assert!(locations.coordinate_of(&NodeId::from("ghost")).is_none());
    }
}
