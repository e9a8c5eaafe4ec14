//! Reserved intermediate files written beside the output file.
//!
//! File names are fixed per directory. Any existing file with one of these
//! names in the output directory is deleted and overwritten without warning,
//! and two runs targeting the same directory at the same time will clobber
//! each other's intermediates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Logical role of an intermediate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Drum synthesized from the point cloud.
    PointCloud,
    /// Reference solid converted to OFF.
    Solid,
    /// Bounding prism, only written when clipping to a cube.
    Prism,
    /// Difference before clipping, only written when clipping to a cube.
    Difference,
    /// Final mesh in OFF, converted into the output file.
    Output,
    /// Script consumed by the OpenSCAD engine.
    EngineScript,
}

/// Reserved file name and a short explanation of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedFile {
    pub role: Role,
    pub name: &'static str,
    pub description: &'static str,
}

pub static RESERVED_FILES: [ReservedFile; 6] = [
    ReservedFile {
        role: Role::PointCloud,
        name: "pc.off",
        description: "point cloud in intermediate OFF format",
    },
    ReservedFile {
        role: Role::Solid,
        name: "stl.off",
        description: "STL input mesh in intermediate OFF format",
    },
    ReservedFile {
        role: Role::Prism,
        name: "cube.off",
        description: "prism representing limits in XYZ axes in intermediate OFF format",
    },
    ReservedFile {
        role: Role::Difference,
        name: "int.off",
        description: "intermediate file (before applying XYZ limits) in OFF format",
    },
    ReservedFile {
        role: Role::Output,
        name: "out.off",
        description: "output mesh in intermediate OFF format",
    },
    ReservedFile {
        role: Role::EngineScript,
        name: "open.scad",
        description: "specification file for the OpenSCAD mesh engine (if used)",
    },
];

/// Looks up the reserved entry for `role`.
pub fn reserved(role: Role) -> &'static ReservedFile {
    let idx = match role {
        Role::PointCloud => 0,
        Role::Solid => 1,
        Role::Prism => 2,
        Role::Difference => 3,
        Role::Output => 4,
        Role::EngineScript => 5,
    };
    &RESERVED_FILES[idx]
}

/// Removes a file if it exists. Failures are logged and otherwise ignored.
pub fn remove_file(path: &Path) {
    if !path.is_file() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not remove {}: {}", path.display(), e),
    }
}

/// Concrete paths of the intermediate files for one output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateFiles {
    dir: PathBuf,
    roles: Vec<Role>,
}

impl IntermediateFiles {
    /// Intermediate files in `dir`. The engine script is only part of the set
    /// when `with_script` is set.
    pub fn new(dir: impl Into<PathBuf>, with_script: bool) -> Self {
        let roles = RESERVED_FILES
            .iter()
            .map(|f| f.role)
            .filter(|&r| with_script || r != Role::EngineScript)
            .collect();
        Self {
            dir: dir.into(),
            roles,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, role: Role) -> PathBuf {
        self.dir.join(reserved(role).name)
    }

    /// Paths of every file in the set.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.roles.iter().map(|&r| self.path(r)).collect()
    }

    /// Deletes every file in the set.
    pub fn remove_all(&self) {
        for path in self.paths() {
            remove_file(&path);
        }
    }
}

/// Removes the intermediate files when dropped, unless the run finished or
/// the files are kept for inspection.
#[derive(Debug)]
pub struct CleanupGuard<'a> {
    files: &'a IntermediateFiles,
    keep_on_failure: bool,
    armed: bool,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(files: &'a IntermediateFiles, keep_on_failure: bool) -> Self {
        Self {
            files,
            keep_on_failure,
            armed: true,
        }
    }

    /// Marks the run as successful and removes every intermediate file.
    pub fn finish(mut self) {
        self.armed = false;
        self.files.remove_all();
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.keep_on_failure {
            log::info!(
                "run failed, keeping intermediate files in {}",
                self.files.dir().display()
            );
        } else {
            self.files.remove_all();
        }
    }
}
