//! The opt-in export-shape probe.
//!
//! Unlike the import classifier this analyzer executes downloaded code: it
//! installs the package's production dependencies and loads its main module
//! in a child `node` process. It is only used by the `export-shape` variant
//! and never by default. Both commands run with the extracted package as
//! their working directory and are killed when the configured timeout ends.

use std::process::{Output, Stdio};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ms_core::{ExportShape, ProbeConfig};
use serde::Deserialize;
use tracing::{info, warn};

use crate::analyzer::{Analyzer, AnalyzerMode, PackageContext};
use crate::error::ScanError;

/// Loads the package in the working directory and prints its export shape.
const LOAD_SCRIPT: &str = "var m = require(process.cwd());\
console.log(JSON.stringify({\
type: typeof m, \
objectProto: Object.getPrototypeOf(m) === Object.prototype, \
keys: Object.keys(m)}));";

/// What the load script prints.
#[derive(Debug, Deserialize)]
struct LoadReport {
    #[serde(rename = "type")]
    type_of: String,
    #[serde(rename = "objectProto")]
    object_proto: bool,
    keys: Vec<String>,
}

/// Records whether a package replaces its exports object.
///
/// Install failures are logged and tolerated: many packages load fine
/// without their optional dependencies. A package whose module cannot be
/// loaded is rejected with an error record.
#[derive(Debug, Clone)]
pub struct ExportShapeProbe {
    config: ProbeConfig,
}

impl ExportShapeProbe {
    /// Creates the probe with its commands and timeout.
    #[must_use]
    pub const fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Runs a command in `dir`, returning `None` if it timed out.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: &Utf8Path,
    ) -> Result<Option<Output>, ScanError> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => Ok(Some(output)),
            Ok(Err(source)) => Err(ScanError::Command {
                program: program.to_owned(),
                source,
            }),
            Err(_) => Ok(None),
        }
    }

    async fn install(&self, dir: &Utf8Path) -> Result<(), ScanError> {
        let Some((program, args)) = self.config.install_command.split_first() else {
            return Ok(());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Installing dependencies");
        match self.run(program, &args, dir).await? {
            Some(output) if output.status.success() => {}
            Some(output) => warn!(
                status = %output.status,
                "Dependency install failed, loading the package anyway"
            ),
            None => warn!(
                timeout_secs = self.config.timeout_secs,
                "Dependency install timed out, loading the package anyway"
            ),
        }
        Ok(())
    }
}

impl Analyzer for ExportShapeProbe {
    type Record = ExportShape;

    fn mode(&self) -> AnalyzerMode {
        AnalyzerMode::Package
    }

    async fn on_package(&mut self, package: &PackageContext<'_>) -> Result<ExportShape, ScanError> {
        let dir = package_dir(package.root).await;
        self.install(&dir).await?;

        info!("Loading package module");
        let output = self
            .run(&self.config.node_binary, &["-e", LOAD_SCRIPT], &dir)
            .await?
            .ok_or_else(|| ScanError::PackageRejected("Package module timed out".to_owned()))?;

        if !output.status.success() {
            return Err(ScanError::PackageRejected(
                "Package module could not be loaded".to_owned(),
            ));
        }

        let report = parse_load_report(&output.stdout).ok_or_else(|| {
            ScanError::PackageRejected("Package module printed no export shape".to_owned())
        })?;

        Ok(ExportShape::from_probe(
            &report.type_of,
            report.object_proto,
            report.keys,
        ))
    }
}

/// The folder holding `package.json`: the archive's `package/` folder when
/// present, else the extraction root.
async fn package_dir(root: &Utf8Path) -> Utf8PathBuf {
    let nested = root.join("package");
    match tokio::fs::metadata(&nested).await {
        Ok(meta) if meta.is_dir() => nested,
        _ => root.to_owned(),
    }
}

/// Reads the last non-empty stdout line; packages may print while loading.
fn parse_load_report(stdout: &[u8]) -> Option<LoadReport> {
    let text = String::from_utf8_lossy(stdout);
    let line = text.lines().rev().find(|line| !line.trim().is_empty())?;
    serde_json::from_str(line.trim()).ok()
}
