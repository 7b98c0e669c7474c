//! Timestamped JSON artifacts under `results/<workload>/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::config::WorkloadSpec;
use crate::device::DeviceInfo;
use crate::error::{BenchError, Result};

/// Directory name used for results relative to the working directory.
pub const RESULTS_DIR: &str = "results";

/// Body of a persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub workload: String,
    pub device_info: DeviceInfo,
    pub test_result: Value,
    pub execution_date: Value,
}

/// Writes aggregated workload results to durable storage.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    root: PathBuf,
}

impl ResultWriter {
    /// Create a writer rooted at `root`, made absolute against the working directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact of `workload`.
    pub fn workload_dir(&self, workload: &str) -> PathBuf {
        self.root.join(workload)
    }

    /// Persist `payload` for `spec` and return the absolute path written.
    ///
    /// An artifact with the same name (same second, CPU and browser) is overwritten.
    pub fn persist<T: Serialize>(
        &self,
        device: &DeviceInfo,
        spec: &WorkloadSpec,
        payload: &T,
    ) -> Result<PathBuf> {
        self.persist_at(Local::now(), device, spec, payload)
    }

    pub(crate) fn persist_at<Tz: TimeZone, T: Serialize>(
        &self,
        timestamp: DateTime<Tz>,
        device: &DeviceInfo,
        spec: &WorkloadSpec,
        payload: &T,
    ) -> Result<PathBuf>
    where
        Tz::Offset: std::fmt::Display,
    {
        let dir = self.workload_dir(&spec.name);
        let persistence = |path: &Path, source: io::Error| BenchError::Persistence {
            workload: spec.name.clone(),
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&dir).map_err(|err| persistence(&dir, err))?;

        let path = dir.join(artifact_filename(&timestamp, device));
        let body = to_pretty_json(payload).map_err(|err| persistence(&path, err))?;
        fs::write(&path, body).map_err(|err| persistence(&path, err))?;

        debug!(workload = %spec.name, path = %path.display(), "Wrote result artifact");
        Ok(path)
    }

    /// Read a previously written artifact.
    pub fn load(path: &Path) -> anyhow::Result<ResultRecord> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Unable to read result artifact {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed result artifact {}", path.display()))
    }
}

/// `<YYYYMMDDHHMMSS>_<cpu>_<browser>.json` for the given local timestamp.
pub fn artifact_filename<Tz: TimeZone>(timestamp: &DateTime<Tz>, device: &DeviceInfo) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}.json",
        compact_timestamp(timestamp),
        sanitize_cpu(&device.cpu),
        device.browser
    )
}

/// Wall-clock time at whole-second precision with separators stripped.
pub fn compact_timestamp<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format("%Y%m%d%H%M%S").to_string()
}

/// Drop ® and ™ and collapse each whitespace run into a single hyphen.
///
/// Leading and trailing runs become hyphens too.
pub fn sanitize_cpu(cpu: &str) -> String {
    let mut sanitized = String::with_capacity(cpu.len());
    let mut prev_ws = false;
    for ch in cpu.chars().filter(|ch| !matches!(ch, '\u{00ae}' | '\u{2122}')) {
        if ch.is_whitespace() {
            if !prev_ws {
                sanitized.push('-');
            }
            prev_ws = true;
        } else {
            sanitized.push(ch);
            prev_ws = false;
        }
    }
    sanitized
}

fn to_pretty_json<T: Serialize>(payload: &T) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    payload.serialize(&mut serializer).map_err(io::Error::from)?;
    Ok(buffer)
}
