//! Type definitions for the topology build.
//!
//! Contains the data structures shared across the build pipeline:
//! - Geographic coordinates and node identifiers
//! - Dataset tiers (`Cloud`, `Proxy`, `Gateway`)
//! - Device records, hierarchy levels and parent references
//! - Static resource profiles per device role

use serde::Deserialize;
use std::fmt;

/// Uplink latency (ms) from a cluster coordinator to the root.
pub const PROXY_UPLINK_LATENCY_MS: f64 = 100.0;
/// Uplink latency (ms) from a cluster member to its coordinator.
pub const GATEWAY_UPLINK_LATENCY_MS: f64 = 4.0;
/// Uplink latency (ms) from a mobile leaf to its gateway.
pub const MOBILE_UPLINK_LATENCY_MS: f64 = 2.0;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Opaque identifier of a dataset node or mobile user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Category label of a node in the location dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Tier {
    Cloud,
    Proxy,
    Gateway,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Cloud => write!(f, "Cloud"),
            Tier::Proxy => write!(f, "Proxy"),
            Tier::Gateway => write!(f, "Gateway"),
        }
    }
}

/// Synthetic device identifier handed out by an [`IdGenerator`](super::assembler::IdGenerator).
pub type DeviceId = u32;

/// Parent link of a device. The root, and leaves nobody claimed, stay `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Unset,
    Device(DeviceId),
}

impl ParentRef {
    pub fn device(&self) -> Option<DeviceId> {
        match self {
            ParentRef::Unset => None,
            ParentRef::Device(id) => Some(*id),
        }
    }
}

/// Position of a device in the assembled hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Apex coordinator for the whole region.
    Root = 0,
    /// Elected cluster coordinator.
    ClusterCoordinator = 1,
    /// Remaining cluster member.
    ClusterMember = 2,
    /// Mobile end-user device.
    MobileLeaf = 3,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Device role, which selects the static resource profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Cloud,
    /// Fog orchestration node (cluster coordinator).
    Fon,
    /// Fog computation node (cluster member).
    Fcn,
    Client,
}

/// Static compute/network/power characteristics of a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceProfile {
    pub mips: u64,
    pub ram: u32,
    pub uplink_bandwidth: u64,
    pub downlink_bandwidth: u64,
    pub rate_per_mips: f64,
    /// Power draw at full utilisation (W).
    pub busy_power: f64,
    /// Power draw when idle (W).
    pub idle_power: f64,
    pub storage: u64,
    pub host_bandwidth: u32,
    pub cost: f64,
    pub cost_per_memory: f64,
    pub cost_per_storage: f64,
    pub cost_per_bandwidth: f64,
}

const HOST_STORAGE: u64 = 1_000_000;
const HOST_BANDWIDTH: u32 = 10_000;

impl ResourceProfile {
    const fn with_host_defaults(
        mips: u64,
        ram: u32,
        uplink_bandwidth: u64,
        downlink_bandwidth: u64,
        rate_per_mips: f64,
        busy_power: f64,
        idle_power: f64,
    ) -> Self {
        Self {
            mips,
            ram,
            uplink_bandwidth,
            downlink_bandwidth,
            rate_per_mips,
            busy_power,
            idle_power,
            storage: HOST_STORAGE,
            host_bandwidth: HOST_BANDWIDTH,
            cost: 3.0,
            cost_per_memory: 0.05,
            cost_per_storage: 0.001,
            cost_per_bandwidth: 0.0,
        }
    }

    /// Lookup of the fixed profile for a role.
    pub const fn for_role(role: DeviceRole) -> Self {
        match role {
            DeviceRole::Cloud => Self::with_host_defaults(44_800, 40_000, 100, 10_000, 0.01, 16.0 * 103.0, 16.0 * 83.25),
            DeviceRole::Fon | DeviceRole::Fcn => Self::with_host_defaults(2_800, 4_000, 10_000, 10_000, 0.0, 107.339, 83.4333),
            DeviceRole::Client => Self::with_host_defaults(500, 20, 1_000, 270, 0.0, 87.53, 82.44),
        }
    }
}

/// A constructed device in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub level: Level,
    pub role: DeviceRole,
    pub parent: ParentRef,
    pub uplink_latency_ms: f64,
    pub profile: ResourceProfile,
    /// Dataset node (or mobile user) this device was built from.
    pub source: NodeId,
    pub coordinate: Coordinate,
    /// Block number of the cluster the device belongs to; 0 for the root and
    /// for leaves without a parent.
    pub block: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_order_lexicographically() {
        let mut ids = vec![NodeId::from("res_2"), NodeId::from("res_10"), NodeId::from("res_1")];
        ids.sort();
        assert_eq!(ids, vec![NodeId::from("res_1"), NodeId::from("res_10"), NodeId::from("res_2")]);
    }

    #[test]
    fn profiles_are_selected_by_role() {
        let cloud = ResourceProfile::for_role(DeviceRole::Cloud);
        assert_eq!(cloud.mips, 44_800);
        assert_eq!(cloud.busy_power, 1648.0);
        assert_eq!(cloud.idle_power, 1332.0);

        let client = ResourceProfile::for_role(DeviceRole::Client);
        assert_eq!(client.ram, 20);
        assert_eq!(client.downlink_bandwidth, 270);
        assert_eq!(ResourceProfile::for_role(DeviceRole::Fon), ResourceProfile::for_role(DeviceRole::Fcn));
    }

    #[test]
    fn coordinate_finiteness() {
        assert!(Coordinate::new(-37.8, 144.9).is_finite());
        assert!(!Coordinate::new(f64::NAN, 144.9).is_finite());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_finite());
    }
}
