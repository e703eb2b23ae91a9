//! Error type for topology build failures.

use super::types::{DeviceId, NodeId, Tier};

/// Which required node set turned out empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptySource {
    Tier(Tier),
    /// The combined `Proxy` + `Gateway` nodes that get clustered.
    ClusteringPool,
}

impl std::fmt::Display for EmptySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptySource::Tier(tier) => write!(f, "tier '{}'", tier),
            EmptySource::ClusteringPool => write!(f, "clustering pool"),
        }
    }
}

/// Errors that abort a topology build.
///
/// A build that fails during assembly rolls back the rows it recorded and
/// binds no devices, so no partial hierarchy is ever exposed.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    EmptyTier(EmptySource),
    MissingCoordinate(NodeId),
    DuplicateNode(NodeId),
    InvalidParameter(String),
    /// Internal invariant violated; indicates a bug, not bad input.
    Consistency(String),
    InvalidLeafParent { leaf: DeviceId, parent: DeviceId },
}

impl TopologyError {
    /// Configuration errors come from the input data; everything else is an
    /// internal failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TopologyError::EmptyTier(_) | TopologyError::MissingCoordinate(_) | TopologyError::DuplicateNode(_) | TopologyError::InvalidParameter(_)
        )
    }
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::EmptyTier(source) => write!(f, "No nodes found in {}", source),
            TopologyError::MissingCoordinate(node) => write!(f, "Node {} has no resolvable coordinate", node),
            TopologyError::DuplicateNode(node) => write!(f, "Node {} appears more than once", node),
            TopologyError::InvalidParameter(msg) => write!(f, "Invalid clustering parameter: {}", msg),
            TopologyError::Consistency(msg) => write!(f, "Consistency check failed: {}", msg),
            TopologyError::InvalidLeafParent { leaf, parent } => {
                write!(f, "Device {} cannot be linked under device {}: parent must be a cluster member", leaf, parent)
            }
        }
    }
}

impl std::error::Error for TopologyError {}
