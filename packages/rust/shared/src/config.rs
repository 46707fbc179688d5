//! Application configuration for the Tipitaka builder.
//!
//! User config lives at `~/.tipitaka-builder/tipitaka-builder.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TipitakaError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tipitaka-builder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tipitaka-builder";

/// Script code of the source texts; conversion to it is a no-op.
pub const NATIVE_SCRIPT: &str = "mymr";

// ---------------------------------------------------------------------------
// Config structs (matching tipitaka-builder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Script code of the stored texts.
    #[serde(default = "default_native_script")]
    pub native_script: String,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Transliteration bridge subprocess.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Output tree layout.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Fixed strings written into generated documents.
    #[serde(default)]
    pub labels: LabelsConfig,

    /// Target script profiles.
    #[serde(default = "default_scripts")]
    pub scripts: Vec<ScriptProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            native_script: default_native_script(),
            defaults: DefaultsConfig::default(),
            bridge: BridgeConfig::default(),
            layout: LayoutConfig::default(),
            labels: LabelsConfig::default(),
            scripts: default_scripts(),
        }
    }
}

fn default_native_script() -> String {
    NATIVE_SCRIPT.into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the SQLite record store.
    #[serde(default = "default_database")]
    pub database: String,

    /// Root of the generated content tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Build mode: "hierarchy" or "chapters".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Basket whose books are generated.
    #[serde(default = "default_basket")]
    pub basket: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            output_dir: default_output_dir(),
            mode: default_mode(),
            basket: default_basket(),
        }
    }
}

fn default_database() -> String {
    "db/tipitaka_pali.db".into()
}
fn default_output_dir() -> String {
    "src/content/docs".into()
}
fn default_mode() -> String {
    "hierarchy".into()
}
fn default_basket() -> String {
    "mula".into()
}

/// `[bridge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interpreter used to run the bridge script.
    #[serde(default = "default_bridge_command")]
    pub command: String,

    /// Bridge script path.
    #[serde(default = "default_bridge_script")]
    pub script: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: default_bridge_command(),
            script: default_bridge_script(),
        }
    }
}

fn default_bridge_command() -> String {
    "python3".into()
}
fn default_bridge_script() -> String {
    "packages/py/aksharamukha-bridge/bridge.py".into()
}

/// `[layout]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Top-level directories under each script root.
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,

    /// Directories under each section.
    #[serde(default = "default_subsections")]
    pub subsections: Vec<String>,

    /// Categories nested under `su/`.
    #[serde(default = "default_sutta_subdivisions")]
    pub sutta_subdivisions: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            subsections: default_subsections(),
            sutta_subdivisions: default_sutta_subdivisions(),
        }
    }
}

fn default_sections() -> Vec<String> {
    ["mula", "attha", "tika"].map(String::from).to_vec()
}
fn default_subsections() -> Vec<String> {
    ["vi", "su", "bi"].map(String::from).to_vec()
}
fn default_sutta_subdivisions() -> Vec<String> {
    ["di", "ma", "sa", "an", "ku"].map(String::from).to_vec()
}

/// `[labels]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Word for "page" used in markers and page titles.
    #[serde(default = "default_page_label")]
    pub page: String,

    /// Body of a chapter with no pages.
    #[serde(default = "default_no_content")]
    pub no_content: String,

    /// Placeholder for a page whose content is missing.
    #[serde(default = "default_empty_page")]
    pub empty_page: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            page: default_page_label(),
            no_content: default_no_content(),
            empty_page: default_empty_page(),
        }
    }
}

fn default_page_label() -> String {
    "หน้า".into()
}
fn default_no_content() -> String {
    "ไม่มีเนื้อหา".into()
}
fn default_empty_page() -> String {
    "<!-- ไม่มีเนื้อหาในหน้านี้ -->".into()
}

/// A literal substring substitution applied after transliteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub from: String,
    pub to: String,
}

impl Correction {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// `[[scripts]]` entry: how to reach one target script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProfile {
    /// ISO 15924-style code, also the script's output directory.
    pub code: String,
    /// Engine name of the source script.
    pub from: String,
    /// Engine name of the destination script.
    pub to: String,
    /// Applied in order after transliteration.
    #[serde(default)]
    pub corrections: Vec<Correction>,
}

impl ScriptProfile {
    /// The identity profile of the native script.
    pub fn native(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            from: String::new(),
            to: String::new(),
            corrections: Vec::new(),
        }
    }

    /// True when conversion through this profile is a no-op.
    pub fn is_identity(&self) -> bool {
        self.from.is_empty() || self.to.is_empty() || self.from == self.to
    }
}

fn default_scripts() -> Vec<ScriptProfile> {
    let profile = |code: &str, to: &str, corrections: &[(&str, &str)]| ScriptProfile {
        code: code.into(),
        from: "Burmese".into(),
        to: to.into(),
        corrections: corrections
            .iter()
            .map(|(from, to)| Correction::new(*from, *to))
            .collect(),
    };

    vec![
        profile("romn", "IASTPali", &[("..", ".")]),
        profile("thai", "Thai", &[("ึ", "ิํ"), ("๚", ".")]),
        profile("deva", "Devanagari", &[("..", ".")]),
        profile("khmr", "Khmer", &[("៕", ".")]),
        profile("lana", "TaiTham", &[("᪩", ".")]),
        profile("laoo", "LaoPali", &[("ຯຯ", ".")]),
        profile("sinh", "Sinhala", &[("..", ".")]),
    ]
}

impl AppConfig {
    /// All script codes in build order: native first, then configured targets.
    pub fn script_codes(&self) -> Vec<String> {
        std::iter::once(self.native_script.clone())
            .chain(self.scripts.iter().map(|s| s.code.clone()))
            .collect()
    }

    /// Resolve the conversion profile for `code`.
    pub fn profile(&self, code: &str) -> Result<ScriptProfile> {
        if code == self.native_script {
            return Ok(ScriptProfile::native(code));
        }
        self.scripts
            .iter()
            .find(|s| s.code == code)
            .cloned()
            .ok_or_else(|| TipitakaError::config(format!("unknown script code '{code}'")))
    }

    /// Check script codes are unique and profiles are complete.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for code in self.script_codes() {
            if code.is_empty() {
                return Err(TipitakaError::validation("empty script code"));
            }
            if !seen.insert(code.clone()) {
                return Err(TipitakaError::validation(format!(
                    "duplicate script code '{code}'"
                )));
            }
        }
        for profile in &self.scripts {
            if profile.from.is_empty() || profile.to.is_empty() {
                return Err(TipitakaError::validation(format!(
                    "script '{}' needs both `from` and `to`",
                    profile.code
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tipitaka-builder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TipitakaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tipitaka-builder/tipitaka-builder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TipitakaError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TipitakaError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TipitakaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TipitakaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TipitakaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
