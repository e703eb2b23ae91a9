//! Location dataset loading, parsing, and validation logic.
//!
//! A scene lists the infrastructure nodes of a region with their tier and
//! coordinate, plus the initial positions of mobile users. A loaded scene
//! acts as the [`LocationResolver`] for a topology build.

use anyhow::Context;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;

use crate::topology::{Coordinate, LocationResolver, NodeId, Tier};

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Infrastructure node entry.
#[derive(Debug, Deserialize, Clone)]
pub struct SceneNode {
    pub node_id: NodeId,
    pub tier: Tier,
    pub latitude: f64,
    pub longitude: f64,
}

/// Mobile user entry with its initial position.
#[derive(Debug, Deserialize, Clone)]
pub struct MobileUser {
    pub user_id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// All infrastructure nodes, in dataset order.
    pub nodes: Vec<SceneNode>,
    /// Mobile users, in dataset order.
    #[serde(default)]
    pub mobile_users: Vec<MobileUser>,
    /// Lookup built after parsing.
    #[serde(skip)]
    coordinates: HashMap<NodeId, Coordinate>,
}

impl Scene {
    /// Parse and validate a scene from JSON text.
    pub fn from_json(data: &str) -> Result<Scene, SceneLoadError> {
        let mut scene: Scene = serde_json::from_str(data)
            .context("Invalid JSON format")
            .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

        validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

        scene.coordinates = scene
            .nodes
            .iter()
            .map(|n| (n.node_id.clone(), Coordinate::new(n.latitude, n.longitude)))
            .chain(scene.mobile_users.iter().map(|u| (u.user_id.clone(), Coordinate::new(u.latitude, u.longitude))))
            .collect();
        Ok(scene)
    }

    pub fn node_count(&self, tier: Tier) -> usize {
        self.nodes.iter().filter(|n| n.tier == tier).count()
    }
}

impl LocationResolver for Scene {
    fn coordinate_of(&self, node: &NodeId) -> Option<Coordinate> {
        self.coordinates.get(node).copied()
    }

    fn nodes_at_tier(&self, tier: Tier) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.tier == tier).map(|n| n.node_id.clone()).collect()
    }

    fn mobile_users(&self) -> Vec<NodeId> {
        self.mobile_users.iter().map(|u| u.user_id.clone()).collect()
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    Scene::from_json(&data)
}

/// Validate scene contents.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_NODES: usize = 10000;

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() + scene.mobile_users.len() > MAX_NODES {
        return Err(format!(
            "Node count {} exceeds maximum of {}",
            scene.nodes.len() + scene.mobile_users.len(),
            MAX_NODES
        ));
    }

    // Node and user ids share one namespace
    let mut ids = HashSet::new();
    for id in scene.nodes.iter().map(|n| &n.node_id).chain(scene.mobile_users.iter().map(|u| &u.user_id)) {
        if !ids.insert(id) {
            return Err(format!("Duplicate id found: {}", id));
        }
    }

    for node in &scene.nodes {
        if !node.latitude.is_finite() || !node.longitude.is_finite() {
            return Err(format!("Node {} has a non-finite coordinate ({}, {})", node.node_id, node.latitude, node.longitude));
        }
    }
    for user in &scene.mobile_users {
        if !user.latitude.is_finite() || !user.longitude.is_finite() {
            return Err(format!("Mobile user {} has a non-finite coordinate ({}, {})", user.user_id, user.latitude, user.longitude));
        }
    }

    Ok(())
}
