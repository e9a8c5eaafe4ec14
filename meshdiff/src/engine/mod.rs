//! External engines driven by the pipeline.
//!
//! Both capabilities follow the same narrow contract: the engine is given
//! input and output paths and run as a blocking child process. Whether it
//! worked is decided by the caller from the existence of the output file,
//! never from the exit status.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ConverterKind, EngineKind, ToolConfig};
use crate::files::IntermediateFiles;
use crate::outcome::PipelineResult;

mod boolean;
mod convert;

pub use boolean::{CorkEngine, OpenScadEngine};
pub use convert::{FreeCadConverter, MeshLabConverter};

/// Mesh boolean supported by every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Difference,
    Intersection,
}

/// Engine computing booleans between two OFF solids.
pub trait BooleanEngine {
    fn name(&self) -> &'static str;

    /// Fails if the engine executable cannot be found.
    fn ensure_available(&self) -> PipelineResult<()>;

    /// `true` if the engine writes the reserved script file.
    fn uses_script(&self) -> bool {
        false
    }

    /// Runs `op` on `first` and `second`, asking the engine to write
    /// `output`. An error means the process could not be run at all.
    fn run(
        &self,
        op: BooleanOp,
        first: &Path,
        second: &Path,
        output: &Path,
        files: &IntermediateFiles,
    ) -> io::Result<()>;
}

/// Converter between the user facing solid format and OFF.
pub trait FormatConverter {
    fn name(&self) -> &'static str;

    /// Asks the converter to translate `input` into `output`; the formats
    /// are inferred from the extensions. An error means the process could
    /// not be run at all.
    fn convert(&self, input: &Path, output: &Path) -> io::Result<()>;
}

/// Builds the boolean engine selected in `config`.
pub fn engine_for(config: &ToolConfig) -> Box<dyn BooleanEngine> {
    match config.engine {
        EngineKind::Cork => Box::new(CorkEngine::new(&config.tools.cork)),
        EngineKind::OpenScad => Box::new(OpenScadEngine::new(&config.tools.openscad)),
    }
}

/// Builds the format converter selected in `config`.
pub fn converter_for(config: &ToolConfig) -> Box<dyn FormatConverter> {
    match config.converter {
        ConverterKind::FreeCad => Box::new(FreeCadConverter::new(
            &config.tools.freecad_python,
            &config.tools.freecad_script,
        )),
        ConverterKind::MeshLab => Box::new(MeshLabConverter::new(&config.tools.meshlab)),
    }
}

/// Locates an executable. Paths with a directory component are checked
/// as given; bare names are searched on `PATH`.
pub fn resolve_executable(program: &Path) -> Option<PathBuf> {
    resolve_in(program, std::env::var_os("PATH"))
}

fn resolve_in(program: &Path, search_path: Option<OsString>) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    match which::which_in(program, search_path, cwd) {
        Ok(found) => Some(found),
        Err(e) => {
            log::debug!("{} not found on PATH: {}", program.display(), e);
            None
        }
    }
}

/// Runs `program` with `args` and waits for it to exit.
///
/// The exit status and any output are only logged.
pub(crate) fn run_tool<I, S>(program: &Path, args: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    log::debug!("running {:?}", command);
    let output = command.output()?;
    if !output.status.success() {
        log::warn!("{} exited with {}", program.display(), output.status);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        log::debug!("{} stderr: {}", program.display(), stderr.trim());
    }
    Ok(())
}
