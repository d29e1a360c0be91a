//! Graph configuration resource.
//!
//! Holds the defaults applied by a [`World`](crate::entities::world::World)
//! and loads/saves them from an INI configuration file. Missing keys keep the
//! safe defaults below.
//!
//! # Configuration File Format
//!
//! ```ini
//! [nodes]
//! auto_dispose = true
//!
//! [units]
//! auto_dispose = true
//!
//! [dump]
//! depth = -1
//! components = true
//! managers = false
//!
//! [debug]
//! check_invariants = false
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_NODE_AUTO_DISPOSE: bool = true;
const DEFAULT_UNIT_AUTO_DISPOSE: bool = true;
const DEFAULT_DUMP_DEPTH: Option<usize> = None;
const DEFAULT_DUMP_COMPONENTS: bool = true;
const DEFAULT_DUMP_MANAGERS: bool = false;
const DEFAULT_CHECK_INVARIANTS: bool = false;
const DEFAULT_CONFIG_PATH: &str = "./entitygraph.ini";

/// Graph configuration resource.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Auto-dispose flag given to newly created nodes.
    pub node_auto_dispose: bool,
    /// Auto-dispose flag given to newly created units.
    pub unit_auto_dispose: bool,
    /// Child depth printed by dumps; `None` prints the whole subtree.
    pub dump_depth: Option<usize>,
    /// Include each node's components in dumps.
    pub dump_components: bool,
    /// Include the managers of shareable components in dumps.
    pub dump_managers: bool,
    /// Validate the whole graph after every outermost mutation (debug builds).
    pub check_invariants: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            node_auto_dispose: DEFAULT_NODE_AUTO_DISPOSE,
            unit_auto_dispose: DEFAULT_UNIT_AUTO_DISPOSE,
            dump_depth: DEFAULT_DUMP_DEPTH,
            dump_components: DEFAULT_DUMP_COMPONENTS,
            dump_managers: DEFAULT_DUMP_MANAGERS,
            check_invariants: DEFAULT_CHECK_INVARIANTS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded config: node auto-dispose={}, unit auto-dispose={}, dump depth={:?}, check invariants={}",
            self.node_auto_dispose, self.unit_auto_dispose, self.dump_depth, self.check_invariants
        );

        Ok(())
    }

    /// Load configuration from INI text instead of a file.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_owned())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [nodes] section
        if let Some(auto_dispose) = config.getbool("nodes", "auto_dispose").ok().flatten() {
            self.node_auto_dispose = auto_dispose;
        }

        // [units] section
        if let Some(auto_dispose) = config.getbool("units", "auto_dispose").ok().flatten() {
            self.unit_auto_dispose = auto_dispose;
        }

        // [dump] section
        if let Some(depth) = config.getint("dump", "depth").ok().flatten() {
            self.dump_depth = usize::try_from(depth).ok();
        }
        if let Some(components) = config.getbool("dump", "components").ok().flatten() {
            self.dump_components = components;
        }
        if let Some(managers) = config.getbool("dump", "managers").ok().flatten() {
            self.dump_managers = managers;
        }

        // [debug] section
        if let Some(check) = config.getbool("debug", "check_invariants").ok().flatten() {
            self.check_invariants = check;
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("nodes", "auto_dispose", Some(self.node_auto_dispose.to_string()));
        config.set("units", "auto_dispose", Some(self.unit_auto_dispose.to_string()));
        let depth = self.dump_depth.map_or(-1, |depth| depth as i64);
        config.set("dump", "depth", Some(depth.to_string()));
        config.set("dump", "components", Some(self.dump_components.to_string()));
        config.set("dump", "managers", Some(self.dump_managers.to_string()));
        config.set("debug", "check_invariants", Some(self.check_invariants.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
