//! Configuration structures for the modspec crawler.
//!
//! This module provides configuration types for all components:
//!
//! - [`ScanConfig`] - Engine settings (registry, working folder, pacing)
//! - [`ClassifierConfig`] - The fixed lookup tables injected into the import classifier
//! - [`ReportConfig`] - Weights for the rewrite-cost estimate
//! - [`ProbeConfig`] - Commands used by the opt-in export-shape probe
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values used for the
//! public npm registry and the Node.js runtime. Nothing here is read from the
//! environment; an optional JSON file can override individual fields through
//! [`Config::load`].

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted index.
const INDEX_FILE: &str = "data.json";

/// File name of the in-flight package checkpoint.
const CHECKPOINT_FILE: &str = "progress.json";

/// File name of the downloaded archive.
const ARCHIVE_FILE: &str = "package.tgz";

/// Modules shipped with the Node.js runtime that need no installation.
///
/// A specifier counts as built-in only on an exact match against this table.
pub const NODE_BUILTIN_MODULES: &[&str] = &[
    "_debugger",
    "_http_agent",
    "_http_client",
    "_http_common",
    "_http_incoming",
    "_http_outgoing",
    "_http_server",
    "_linklist",
    "_stream_duplex",
    "_stream_passthrough",
    "_stream_readable",
    "_stream_transform",
    "_stream_writable",
    "_tls_legacy",
    "_tls_wrap",
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "freelist",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "smalloc",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "vm",
    "zlib",
];

/// Which analysis a crawl performs.
///
/// Each variant owns its own working folder so their indexes never mix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanVariant {
    /// Static classification of `require` specifiers.
    #[default]
    ModuleSpec,
    /// Installs each package and inspects the shape of its runtime export.
    ExportShape,
}

impl ScanVariant {
    /// Returns the fixed working folder for this variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use ms_core::ScanVariant;
    ///
    /// assert_eq!(ScanVariant::ModuleSpec.default_work_dir(), "_work");
    /// assert_eq!(ScanVariant::ExportShape.default_work_dir(), "_overwrite");
    /// ```
    #[must_use]
    pub fn default_work_dir(self) -> Utf8PathBuf {
        match self {
            Self::ModuleSpec => Utf8PathBuf::from("_work"),
            Self::ExportShape => Utf8PathBuf::from("_overwrite"),
        }
    }

    /// Returns the pause between consecutive packages, in milliseconds.
    #[must_use]
    pub const fn default_delay_ms(self) -> u64 {
        match self {
            Self::ModuleSpec => 2000,
            Self::ExportShape => 500,
        }
    }

    /// Returns a short label for log lines and report headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ModuleSpec => "module-spec",
            Self::ExportShape => "export-shape",
        }
    }
}

/// Configuration for the scan engine.
///
/// # Examples
///
/// ```
/// use ms_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.registry_url, "https://registry.npmjs.org");
/// assert_eq!(config.dependency_dir, "node_modules");
/// assert!(config.persist_every_file);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Base URL of the package registry, without a trailing slash.
    pub registry_url: String,

    /// Working folder holding `data.json`, the current archive, and the
    /// extracted tree.
    pub work_dir: Utf8PathBuf,

    /// Name of the nested dependency directory that is never walked.
    pub dependency_dir: String,

    /// Name of the extraction subfolder inside the working folder.
    pub extract_dir: String,

    /// Pause between consecutive packages within one run, in milliseconds.
    pub delay_ms: u64,

    /// Checkpoint the in-flight package after every analyzed file, so a
    /// restart resumes at the next file instead of refetching the archive.
    pub persist_every_file: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_owned(),
            work_dir: ScanVariant::ModuleSpec.default_work_dir(),
            dependency_dir: "node_modules".to_owned(),
            extract_dir: "package".to_owned(),
            delay_ms: ScanVariant::ModuleSpec.default_delay_ms(),
            persist_every_file: true,
        }
    }
}

impl ScanConfig {
    /// Creates the default configuration for a scan variant.
    #[must_use]
    pub fn for_variant(variant: ScanVariant) -> Self {
        Self {
            work_dir: variant.default_work_dir(),
            delay_ms: variant.default_delay_ms(),
            ..Self::default()
        }
    }

    /// Path of the persisted index inside the working folder.
    #[must_use]
    pub fn index_path(&self) -> Utf8PathBuf {
        self.work_dir.join(INDEX_FILE)
    }

    /// Path of the in-flight package checkpoint inside the working folder.
    #[must_use]
    pub fn checkpoint_path(&self) -> Utf8PathBuf {
        self.work_dir.join(CHECKPOINT_FILE)
    }

    /// Path every downloaded archive is written to, whatever its URL.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.work_dir.join(ARCHIVE_FILE)
    }

    /// Path of the extraction subfolder inside the working folder.
    #[must_use]
    pub fn extract_path(&self) -> Utf8PathBuf {
        self.work_dir.join(&self.extract_dir)
    }
}

/// Static tables injected into the import classifier.
///
/// # Examples
///
/// ```
/// use ms_core::ClassifierConfig;
///
/// let config = ClassifierConfig::default();
/// assert_eq!(config.import_function, "require");
/// assert!(config.builtin_modules.iter().any(|m| m == "fs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Name of the import function; only bare calls to it are counted.
    pub import_function: String,

    /// Source extension (without the dot), compared case-insensitively.
    pub source_extension: String,

    /// Runtime built-in module names, matched exactly.
    pub builtin_modules: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            import_function: "require".to_owned(),
            source_extension: "js".to_owned(),
            builtin_modules: NODE_BUILTIN_MODULES
                .iter()
                .map(|&m| m.to_owned())
                .collect(),
        }
    }
}

/// Character weights for the rewrite-cost estimate.
///
/// The estimate answers: how many characters would be added if every
/// built-in import gained a scheme prefix (`node:`) and every relative
/// import gained an explicit extension (`.js`)?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Characters added per built-in specifier.
    pub builtin_rewrite_cost: u64,
    /// Characters added per third-party package specifier.
    pub package_rewrite_cost: u64,
    /// Characters added per relative specifier.
    pub relative_rewrite_cost: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            builtin_rewrite_cost: 5,
            package_rewrite_cost: 0,
            relative_rewrite_cost: 3,
        }
    }
}

/// Commands for the export-shape probe.
///
/// The probe executes downloaded code and is only used by
/// [`ScanVariant::ExportShape`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Program and arguments that install a package's production dependencies.
    pub install_command: Vec<String>,

    /// JavaScript runtime used to load the package.
    pub node_binary: String,

    /// Upper bound for each spawned command, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            install_command: vec![
                "npm".to_owned(),
                "install".to_owned(),
                "--production".to_owned(),
            ],
            node_binary: "node".to_owned(),
            timeout_secs: 120,
        }
    }
}

/// Root configuration for the crawler.
///
/// # Examples
///
/// ```
/// use ms_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// let parsed: Config = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, parsed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine configuration.
    pub scan: ScanConfig,

    /// Import classifier tables.
    pub classifier: ClassifierConfig,

    /// Report weights.
    pub report: ReportConfig,

    /// Export-shape probe commands.
    pub probe: ProbeConfig,
}

impl Config {
    /// Creates the default configuration for a scan variant.
    #[must_use]
    pub fn for_variant(variant: ScanVariant) -> Self {
        Self {
            scan: ScanConfig::for_variant(variant),
            ..Self::default()
        }
    }

    /// Loads a configuration file, filling missing fields from `base`.
    ///
    /// Only the sections and fields present in the file are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::InvalidOption`] if a loaded value is unusable.
    pub fn load(path: &Utf8Path, base: Self) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let overrides: serde_json::Value = serde_json::from_str(&content)?;

        let mut merged = serde_json::to_value(&base)?;
        merge_json(&mut merged, overrides);

        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.registry_url.trim().is_empty() {
            return Err(ConfigError::invalid("scan.registry_url", "must not be empty"));
        }
        if self.scan.work_dir.as_str().is_empty() {
            return Err(ConfigError::invalid("scan.work_dir", "must not be empty"));
        }
        if self.scan.extract_dir.is_empty() || self.scan.extract_dir.contains(['/', '\\']) {
            return Err(ConfigError::invalid("scan.extract_dir", "must be a single folder name"));
        }
        if [INDEX_FILE, CHECKPOINT_FILE, ARCHIVE_FILE].contains(&self.scan.extract_dir.as_str()) {
            return Err(ConfigError::invalid(
                "scan.extract_dir",
                "must not reuse a working folder file name",
            ));
        }
        if self.classifier.import_function.is_empty() {
            return Err(ConfigError::invalid("classifier.import_function", "must not be empty"));
        }
        if self.probe.install_command.is_empty() {
            return Err(ConfigError::invalid("probe.install_command", "must name a program"));
        }
        Ok(())
    }
}

/// Recursively overlays `overrides` onto `base`, object by object.
fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
