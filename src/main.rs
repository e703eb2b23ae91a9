use anyhow::Context;
use chrono::Local;
use env_logger::Builder;
use log::{LevelFilter, error, info, warn};

use geo_cluster_topology::common::{BuildConfig, load_scene};
use geo_cluster_topology::topology::{LinkTable, NearestMember, SequentialIds, TopologyRecorder, build_topology};

fn load_config(scene_path: &str) -> anyhow::Result<BuildConfig> {
    let config_path = BuildConfig::config_path_from_scene(scene_path);
    if !config_path.exists() {
        info!("No {} found, using default settings", config_path.display());
        return Ok(BuildConfig::default());
    }
    BuildConfig::load(&config_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))
}

fn run(scene_path: &str) -> anyhow::Result<()> {
    let config = load_config(scene_path)?;
    let scene = load_scene(scene_path).with_context(|| format!("Failed to load scene {}", scene_path))?;
    info!("Loaded {} nodes and {} mobile users from {}", scene.nodes.len(), scene.mobile_users.len(), scene_path);

    let mut ids = SequentialIds::default();
    let mut links = LinkTable::default();
    let mut recorder = TopologyRecorder::new(config.region_tag.clone());

    let topology = build_topology(&scene, &config.settings(), &mut ids, &mut links, &mut NearestMember, &mut recorder)
        .context("Topology build aborted")?;

    info!(
        "Clusters generated: {} promoted of {}, {} devices",
        topology.promoted.len(),
        topology.partition.clusters.len(),
        topology.hierarchy.len()
    );

    // The hierarchy stays valid even if the artifact cannot be written
    match recorder.flush_and_clear(&config.output_dir, &Local::now()) {
        Ok(path) => info!("Topology written to {}", path.display()),
        Err(e) => {
            error!("Failed to write topology CSV to {}: {}", config.output_dir.display(), e);
            warn!("{} rows were not exported", recorder.len());
        }
    }

    Ok(())
}

fn main() {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("geo_cluster_topology"), LevelFilter::Debug)
        .init();

    let Some(scene_path) = std::env::args().nth(1) else {
        error!("Usage: geo-cluster-topology <scene.json>");
        std::process::exit(2);
    };

    if let Err(e) = run(&scene_path) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
