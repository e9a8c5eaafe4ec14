//! Format converter backends.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{run_tool, FormatConverter};

/// Conversion helper run by FreeCAD's python.
pub const FREECAD_HELPER: &str = include_str!("freecadscript.py");

/// FreeCAD's bundled python running a conversion helper script:
/// `python <script> <input> <output>`.
///
/// When no file exists at the script path, [`FREECAD_HELPER`] is written
/// there before the first conversion.
#[derive(Debug, Clone)]
pub struct FreeCadConverter {
    python: PathBuf,
    script: PathBuf,
}

impl FreeCadConverter {
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }

    fn install_helper(&self) -> io::Result<()> {
        if self.script.is_file() {
            return Ok(());
        }
        log::info!("writing FreeCAD helper to {}", self.script.display());
        fs::write(&self.script, FREECAD_HELPER)
    }
}

impl FormatConverter for FreeCadConverter {
    fn name(&self) -> &'static str {
        "freecad"
    }

    fn convert(&self, input: &Path, output: &Path) -> io::Result<()> {
        self.install_helper()?;
        run_tool(
            &self.python,
            [self.script.as_os_str(), input.as_os_str(), output.as_os_str()],
        )
    }
}

/// MeshLab's batch server: `meshlabserver -i <input> -o <output>`.
#[derive(Debug, Clone)]
pub struct MeshLabConverter {
    program: PathBuf,
}

impl MeshLabConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl FormatConverter for MeshLabConverter {
    fn name(&self) -> &'static str {
        "meshlab"
    }

    fn convert(&self, input: &Path, output: &Path) -> io::Result<()> {
        run_tool(
            &self.program,
            [OsStr::new("-i"), input.as_os_str(), OsStr::new("-o"), output.as_os_str()],
        )
    }
}
