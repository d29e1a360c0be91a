//! Entity graph demo entry point.
//!
//! Builds a small scene under an engine-managed root, wires a few logging
//! listeners, shuffles the hierarchy around and prints the result.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run -- --depth 2
//! cargo run -- --json --config ./entitygraph.ini
//! ```

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::{error, info};

use entitygraph::components::UnitSpec;
use entitygraph::entities::{NodeId, SystemTag, World};
use entitygraph::resources::engine::{Engine, Roster};
use entitygraph::resources::graphconfig::GraphConfig;

/// Entity graph demo
#[derive(Parser)]
#[command(version, about = "Builds a sample entity graph and dumps it.")]
struct Cli {
    /// INI file with graph defaults (default: ./entitygraph.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the scene as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Child levels to print; overrides the configuration.
    #[arg(long, value_name = "LEVELS")]
    depth: Option<usize>,
}

#[derive(Debug, Default)]
struct Transform {
    x: f32,
    y: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => GraphConfig::with_path(path),
        None => GraphConfig::new(),
    };
    config.load_from_file().ok(); // ignore errors, use defaults
    if cli.depth.is_some() {
        config.dump_depth = cli.depth;
    }

    let mut world = World::with_config(config);
    let roster = Rc::new(Roster::new());
    world.set_engine(Some(roster.clone() as Rc<dyn Engine>));

    let root = build_scene(&mut world, &roster);

    let options = world.dump_options();
    if cli.json {
        let Some(info) = world.describe(root, options) else {
            error!("Root node vanished while building the scene");
            std::process::exit(1);
        };
        match serde_json::to_string_pretty(&info) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing scene: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", world.info_string(root, options));
    }

    if let Err(problem) = world.check_invariants() {
        error!("Graph invariant broken: {problem}");
        std::process::exit(1);
    }
}

fn build_scene(world: &mut World, roster: &Roster) -> NodeId {
    let root = world.create_node("stage", "stage");
    roster.set_root(Some(root));
    roster.add(root, "stage");
    world.attach_engine(root);

    if let Some(signals) = world.node_signals_mut(root) {
        signals.child_added.connect(0, |world: &mut World, &(_, child, index)| {
            info!(
                "'{}' joined the stage at {index}",
                world.local_name(child).unwrap_or_default()
            );
        });
        signals.child_removed.connect(0, |world: &mut World, &(_, child, index)| {
            info!(
                "'{}' left the stage from {index}",
                world.local_name(child).unwrap_or_default()
            );
        });
    }

    let transform = world.capability("Transform");
    let palette = world.capability("Palette");

    let shared_palette = world.create_unit(UnitSpec::new(palette).shareable());
    for name in ["player", "enemy", "hud"] {
        let node = world.create_node(name, name);
        world.add_child(root, node, None);
        let unit = world.create_unit(UnitSpec::new(transform).with_payload(Transform::default()));
        world.attach(unit, node, None, None);
        world.attach(shared_palette, node, None, None);
        world.add_system(node, SystemTag("render"));
    }

    if let Some(player) = world.child_by_name(root, "player") {
        if let Some(unit) = world.component(player, transform) {
            if let Some(position) = world.unit_payload_mut::<Transform>(unit) {
                position.x = 10.0;
                position.y = 4.0;
                info!("player placed at ({}, {})", position.x, position.y);
            }
        }
        let weapon = world.create_node("weapon", "weapon");
        world.add_child(player, weapon, None);
    }

    // Draw the HUD first, then put the enemy to sleep along with its subtree.
    if let Some(hud) = world.child_by_name(root, "hud") {
        world.set_child_index(root, hud, 0);
    }
    if let Some(enemy) = world.child_by_name(root, "enemy") {
        world.sleep(enemy);
        let dropped = world.create_node("loot", "loot");
        world.add_child(enemy, dropped, None);
    }

    info!(
        "Scene ready: {} nodes, {} units, palette shared by {}",
        world.node_count(),
        world.unit_count(),
        world.manager_count(shared_palette)
    );
    root
}
