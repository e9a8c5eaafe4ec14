//! Tool configuration: which external backends to drive and where they live.
//!
//! The configuration is an explicit value handed to the pipeline; nothing is
//! read from global state once it has been built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::outcome::{codes, PipelineError, PipelineResult};

/// Boolean mesh engine backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EngineKind {
    #[default]
    Cork,
    OpenScad,
}

/// Solid format converter backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ConverterKind {
    #[default]
    FreeCad,
    MeshLab,
}

fn unknown_backend(kind: &str, value: &str) -> PipelineError {
    PipelineError::missing_capability(
        codes::UNKNOWN_BACKEND,
        format!("Unrecognized {} mode: {}", kind, value),
    )
}

impl FromStr for EngineKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cork" => Ok(Self::Cork),
            "openscad" => Ok(Self::OpenScad),
            _ => Err(unknown_backend("mesh engine", s)),
        }
    }
}

impl FromStr for ConverterKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freecad" => Ok(Self::FreeCad),
            "meshlab" => Ok(Self::MeshLab),
            _ => Err(unknown_backend("converter", s)),
        }
    }
}

impl TryFrom<String> for EngineKind {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for ConverterKind {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Cork => "cork",
            EngineKind::OpenScad => "openscad",
        })
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConverterKind::FreeCad => "freecad",
            ConverterKind::MeshLab => "meshlab",
        })
    }
}

fn invalid_config(message: String) -> PipelineError {
    PipelineError::validation(codes::CONFIG_INVALID, message)
}

/// Directory of the running executable, used for bundled tools.
fn bundle_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

/// Locations of the external executables.
///
/// Bare program names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub cork: PathBuf,
    pub openscad: PathBuf,
    pub meshlab: PathBuf,
    pub freecad_python: PathBuf,
    /// Helper script run by the FreeCAD python interpreter as
    /// `python <script> <input> <output>`. The bundled helper is written
    /// here if the file does not exist yet.
    pub freecad_script: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        let bundle = bundle_dir();
        if cfg!(windows) {
            Self {
                cork: bundle.join("cork.exe"),
                openscad: bundle.join("openscad.exe"),
                meshlab: PathBuf::from(r"C:\Program Files\VCG\MeshLab\meshlabserver.exe"),
                freecad_python: PathBuf::from(r"C:\Program Files\FreeCAD 0.14\bin\python.exe"),
                freecad_script: bundle.join("freecadscript.py"),
            }
        } else {
            Self {
                cork: bundle.join("cork"),
                openscad: PathBuf::from("openscad"),
                meshlab: PathBuf::from("meshlabserver"),
                freecad_python: PathBuf::from("python"),
                freecad_script: bundle.join("freecadscript.py"),
            }
        }
    }
}

/// Complete configuration of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub engine: EngineKind,
    pub converter: ConverterKind,
    /// Extension of the final output file, without the dot.
    pub output_extension: String,
    /// Keep intermediate files when a run fails.
    pub keep_intermediates: bool,
    pub tools: ToolPaths,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            converter: ConverterKind::default(),
            output_extension: "stl".to_string(),
            keep_intermediates: false,
            tools: ToolPaths::default(),
        }
    }
}

impl ToolConfig {
    /// Parses a JSON configuration. Missing keys take their default value.
    ///
    /// Malformed JSON is [`codes::CONFIG_INVALID`]; a well formed file naming
    /// an unknown engine or converter is [`codes::UNKNOWN_BACKEND`].
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| invalid_config(format!("invalid tool configuration: {}", e)))?;
        if let Some(name) = value.get("engine").and_then(|v| v.as_str()) {
            name.parse::<EngineKind>()?;
        }
        if let Some(name) = value.get("converter").and_then(|v| v.as_str()) {
            name.parse::<ConverterKind>()?;
        }
        serde_json::from_value(value)
            .map_err(|e| invalid_config(format!("invalid tool configuration: {}", e)))
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let contents = crate::io::read_to_string(path).map_err(|e| {
            invalid_config(format!(
                "could not read tool configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Writes the configuration as pretty printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
