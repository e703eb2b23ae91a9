//! Geo-proximity clustering and fog topology bootstrap.
//!
//! Partitions located infrastructure nodes into range- and capacity-bounded
//! clusters, elects one coordinator per cluster, and assembles the device
//! hierarchy (root → cluster coordinators → cluster members → mobile leaves)
//! that a fog simulation starts from.
//!
//! ## Module Organization
//!
//! - `common`: location dataset and build configuration loading
//! - `topology`: distance, clustering, election, assembly and CSV recording

pub mod common;
pub mod topology;
