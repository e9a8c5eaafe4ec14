//! Uniform result channel shared by every pipeline stage.
//!
//! Stages return `Result<T, PipelineError>` and propagate with `?`. The
//! pipeline entry point folds the final result into an [`Outcome`], the flat
//! structure consumed by front-ends: a success flag, a message, the index of
//! the offending argument (for focusing an input field) and a stable numeric
//! code.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Broad category of a failure. Callers branch on this or on the code, never
/// on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// User supplied arguments are inconsistent or malformed.
    Validation,
    /// Triangulation or boundary extraction failed.
    Geometry,
    /// A configured external executable could not be found.
    MissingCapability,
    /// An external process did not produce its promised output.
    ExternalProcess,
    /// Unexpected fault caught at the pipeline boundary.
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Geometry => "geometry",
            ErrorClass::MissingCapability => "missing capability",
            ErrorClass::ExternalProcess => "external process",
            ErrorClass::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Failure raised by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct PipelineError {
    class: ErrorClass,
    code: i32,
    arg_index: Option<usize>,
    message: String,
}

impl PipelineError {
    pub fn new(class: ErrorClass, code: i32, message: impl Into<String>) -> Self {
        Self {
            class,
            code,
            arg_index: None,
            message: message.into(),
        }
    }

    /// Creates a validation error tagged with the offending argument index.
    pub fn argument(index: usize, code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, code, message).at(index)
    }

    /// Creates a validation error that is not attributable to one argument.
    pub fn validation(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, code, message)
    }

    pub fn geometry(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Geometry, code, message)
    }

    pub fn missing_capability(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::MissingCapability, code, message)
    }

    pub fn external(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ExternalProcess, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, codes::INTERNAL, message)
    }

    /// Tags the error with the index of the offending argument.
    pub fn at(mut self, index: usize) -> Self {
        self.arg_index = Some(index);
        self
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn arg_index(&self) -> Option<usize> {
        self.arg_index
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Stable numeric error codes.
///
/// Codes that depend on a limit field are computed from the field's argument
/// index, see [`codes::limit`].
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const INTERNAL: i32 = 1;
    pub const POINT_CLOUD_MISSING: i32 = 2;
    pub const SOLID_MISSING: i32 = 3;
    pub const OUTPUT_EXTENSION: i32 = 4;
    pub const OUTPUT_DIRECTORY: i32 = 5;
    pub const XY_WITHOUT_Z: i32 = 6;
    pub const ZSUB_INVALID: i32 = 7;
    pub const ZSUB_NOT_POSITIVE: i32 = 8;
    pub const CUBE_LIMITS_INCOMPLETE: i32 = 10;
    pub const LIMITS_INCONSISTENT: i32 = 11;
    pub const POINT_CLOUD_UNREADABLE: i32 = 12;
    pub const POINT_CLOUD_EMPTY: i32 = 13;
    pub const POINT_CLOUD_COLUMNS: i32 = 14;
    pub const SYNTHESIS_FAILED: i32 = 15;
    pub const PRISM_NOT_WRITTEN: i32 = 16;
    pub const DRUM_NOT_WRITTEN: i32 = 17;
    pub const SOLID_NOT_CONVERTED: i32 = 18;
    pub const SOLID_CONVERTER_FAILED: i32 = 19;
    pub const DIFFERENCE_FAILED: i32 = 20;
    pub const INTERSECTION_FAILED: i32 = 21;
    pub const OUTPUT_NOT_CONVERTED: i32 = 22;
    pub const OUTPUT_CONVERTER_FAILED: i32 = 23;
    pub const OUTPUT_MISSING: i32 = 24;
    pub const CONFIG_INVALID: i32 = 25;
    pub const CORK_MISSING: i32 = 26;
    pub const OPENSCAD_MISSING: i32 = 27;
    pub const UNKNOWN_BACKEND: i32 = 28;
    pub const ENGINE_LAUNCH_FAILED: i32 = 29;
    pub const TOP_TRIANGULATION_FAILED: i32 = 30;
    pub const BOUNDARY_NOT_SIMPLE: i32 = 31;
    pub const BASE_TRIANGULATION_FAILED: i32 = 32;

    /// Bases for the limit field codes; the field offset (0 for Xmin through
    /// 5 for Zmax) is added to them.
    pub const LIMIT_EMPTY: i32 = 40;
    pub const LIMIT_UNPARSABLE: i32 = 50;
    pub const LIMIT_ORDER: i32 = 60;
    pub const LIMIT_NAN: i32 = 70;
    pub const LIMIT_INFINITE: i32 = 80;

    /// Code for a limit failure of kind `base` on argument `arg_index`.
    pub fn limit(base: i32, arg_index: usize) -> i32 {
        base + (arg_index as i32 - crate::sanitize::XMIN_ARG as i32)
    }
}

/// Flat outcome of a pipeline run, handed to front-ends.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Outcome {
    pub ok: bool,
    pub message: Option<String>,
    pub arg_index: Option<usize>,
    pub code: Option<i32>,
    pub class: Option<ErrorClass>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            arg_index: None,
            code: Some(codes::SUCCESS),
            class: None,
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self {
            ok: false,
            message: Some(err.message().to_string()),
            arg_index: err.arg_index(),
            code: Some(err.code()),
            class: Some(err.class()),
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            Some(code) => code,
            None if self.ok => codes::SUCCESS,
            None => -1,
        }
    }
}

impl From<PipelineResult<String>> for Outcome {
    fn from(result: PipelineResult<String>) -> Self {
        match result {
            Ok(message) => Outcome::success(message),
            Err(err) => Outcome::failure(&err),
        }
    }
}
