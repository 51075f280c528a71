use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::model::pillar::DEFAULT_ADMIN_MARKER;
use crate::model::{Pillar, PillarSet, Platform};
use crate::ordering::{OrderingSettings, SortMode};

/// Directory holding a board's config and database.
pub const BOARD_DIR: &str = ".laneboard";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "board.sqlite3";

/// Per-board configuration, threaded explicitly into every engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_admin_marker")]
    pub admin_marker: String,
    #[serde(default = "default_pillars")]
    pub pillars: Vec<Pillar>,
    #[serde(default)]
    pub lanes: LaneConfig,
    #[serde(default)]
    pub evergreen: EvergreenConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            admin_marker: default_admin_marker(),
            pillars: default_pillars(),
            lanes: LaneConfig::default(),
            evergreen: EvergreenConfig::default(),
            ordering: OrderingConfig::default(),
            allocation: AllocationConfig::default(),
        }
    }
}

impl BoardConfig {
    #[must_use]
    pub fn pillar_set(&self) -> PillarSet {
        PillarSet::new(self.pillars.clone(), &self.admin_marker)
    }

    #[must_use]
    pub const fn ordering_settings(&self) -> OrderingSettings {
        OrderingSettings {
            freshness_threshold_ms: self.ordering.freshness_threshold_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfig {
    #[serde(default = "default_visible_lanes")]
    pub visible: Vec<Platform>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            visible: default_visible_lanes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvergreenConfig {
    #[serde(default = "default_cycle_days")]
    pub cycle_days: u32,
}

impl Default for EvergreenConfig {
    fn default() -> Self {
        Self {
            cycle_days: default_cycle_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingConfig {
    #[serde(default)]
    pub default_mode: SortMode,
    /// Activity timestamps closer than this are treated as concurrent.
    #[serde(default = "default_freshness_threshold_ms")]
    pub freshness_threshold_ms: i64,
    #[serde(default)]
    pub show_archived: bool,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            default_mode: SortMode::default(),
            freshness_threshold_ms: default_freshness_threshold_ms(),
            show_archived: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Commit attempts before a sequence conflict is surfaced to the caller.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub board: BoardConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

#[must_use]
pub fn board_dir(project_root: &Path) -> PathBuf {
    project_root.join(BOARD_DIR)
}

#[must_use]
pub fn board_db_path(project_root: &Path) -> PathBuf {
    board_dir(project_root).join(DB_FILE)
}

#[must_use]
pub fn is_initialized(project_root: &Path) -> bool {
    board_dir(project_root).is_dir()
}

pub fn load_board_config(project_root: &Path) -> Result<BoardConfig> {
    let path = board_dir(project_root).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(BoardConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<BoardConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the default config unless one already exists. Returns the path.
pub fn write_default_config(project_root: &Path) -> Result<PathBuf> {
    let dir = board_dir(project_root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(path);
    }

    let rendered = toml::to_string_pretty(&BoardConfig::default())
        .context("Failed to render default config")?;
    std::fs::write(&path, rendered)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("laneboard/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let board = load_board_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        board,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_admin_marker() -> String {
    DEFAULT_ADMIN_MARKER.to_string()
}

fn default_pillars() -> Vec<Pillar> {
    vec![
        Pillar::new("admin", "[Admin] Housekeeping"),
        Pillar::new("education", "Education"),
        Pillar::new("community", "Community"),
        Pillar::new("product", "Product"),
    ]
}

fn default_visible_lanes() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

const fn default_cycle_days() -> u32 {
    90
}

const fn default_freshness_threshold_ms() -> i64 {
    2_000
}

const fn default_max_attempts() -> u32 {
    3
}
