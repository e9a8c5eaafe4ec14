//! Boolean engine backends.

use std::fs;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use super::{resolve_executable, run_tool, BooleanEngine, BooleanOp};
use crate::files::{IntermediateFiles, Role};
use crate::outcome::{codes, PipelineError, PipelineResult};

/// The cork command line tool: `cork -diff|-isct a b out`.
#[derive(Debug, Clone)]
pub struct CorkEngine {
    program: PathBuf,
}

impl CorkEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl BooleanEngine for CorkEngine {
    fn name(&self) -> &'static str {
        "cork"
    }

    fn ensure_available(&self) -> PipelineResult<()> {
        match resolve_executable(&self.program) {
            Some(_) => Ok(()),
            None => Err(PipelineError::missing_capability(
                codes::CORK_MISSING,
                format!(
                    "cork was selected as meshdiff engine, but the executable could not be found: {}",
                    self.program.display()
                ),
            )),
        }
    }

    fn run(
        &self,
        op: BooleanOp,
        first: &Path,
        second: &Path,
        output: &Path,
        _files: &IntermediateFiles,
    ) -> io::Result<()> {
        let flag = match op {
            BooleanOp::Difference => "-diff",
            BooleanOp::Intersection => "-isct",
        };
        run_tool(
            &self.program,
            [OsStr::new(flag), first.as_os_str(), second.as_os_str(), output.as_os_str()],
        )
    }
}

/// OpenSCAD driven through a generated script: `openscad -o out open.scad`.
#[derive(Debug, Clone)]
pub struct OpenScadEngine {
    program: PathBuf,
}

impl OpenScadEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

fn scad_string(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

/// OpenSCAD source applying `op` to two imported meshes.
pub fn scad_script(op: BooleanOp, first: &Path, second: &Path) -> String {
    let operation = match op {
        BooleanOp::Difference => "difference",
        BooleanOp::Intersection => "intersection",
    };
    format!(
        "{}(){{import(\"{}\");import(\"{}\");}}",
        operation,
        scad_string(first),
        scad_string(second)
    )
}

impl BooleanEngine for OpenScadEngine {
    fn name(&self) -> &'static str {
        "openscad"
    }

    fn ensure_available(&self) -> PipelineResult<()> {
        match resolve_executable(&self.program) {
            Some(_) => Ok(()),
            None => Err(PipelineError::missing_capability(
                codes::OPENSCAD_MISSING,
                format!(
                    "openscad was selected as meshdiff engine, but the executable could not be found: {}",
                    self.program.display()
                ),
            )),
        }
    }

    fn uses_script(&self) -> bool {
        true
    }

    fn run(
        &self,
        op: BooleanOp,
        first: &Path,
        second: &Path,
        output: &Path,
        files: &IntermediateFiles,
    ) -> io::Result<()> {
        let script = files.path(Role::EngineScript);
        fs::write(&script, scad_script(op, first, second))?;
        run_tool(
            &self.program,
            [OsStr::new("-o"), output.as_os_str(), script.as_os_str()],
        )
    }
}
