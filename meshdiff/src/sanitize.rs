//! Validation of raw user input into a [`PipelineContext`].
//!
//! Validation happens in two passes. [`sanitize_arguments`] checks that files
//! exist and that every requested limit field parses as a number.
//! [`check_limits`] runs later, right before synthesis, and checks that the
//! parsed limits make sense for the requested clip mode. Every failure is
//! tagged with the index of the offending argument so that a front-end can
//! focus the matching input field.

use std::io;
use std::path::{Path, PathBuf};

use crate::limits::{Axis, AxisLimits, Range};
use crate::outcome::{codes, PipelineError, PipelineResult};

pub const POINT_CLOUD_ARG: usize = 0;
pub const SOLID_ARG: usize = 1;
pub const OUTPUT_ARG: usize = 2;
pub const USE_XY_ARG: usize = 3;
pub const USE_Z_ARG: usize = 4;
pub const XMIN_ARG: usize = 5;
pub const XMAX_ARG: usize = 6;
pub const YMIN_ARG: usize = 7;
pub const YMAX_ARG: usize = 8;
pub const ZMIN_ARG: usize = 9;
pub const ZMAX_ARG: usize = 10;
pub const ZSUB_ARG: usize = 11;

const ENDPOINT_NAMES: [&str; 2] = ["min", "max"];

/// Argument index of the `min` (endpoint 0) or `max` (endpoint 1) field of
/// `axis`.
pub fn limit_arg(axis: Axis, endpoint: usize) -> usize {
    XMIN_ARG + 2 * axis.index() + endpoint
}

/// Unvalidated arguments as typed by the user.
///
/// Paths, limits and the base offset are kept as strings; only the two
/// switches are already booleans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArguments {
    pub point_cloud: String,
    pub solid: String,
    pub output: String,
    pub use_xy: bool,
    pub use_z: bool,
    pub xmin: String,
    pub xmax: String,
    pub ymin: String,
    pub ymax: String,
    pub zmin: String,
    pub zmax: String,
    pub zsub: String,
}

impl RawArguments {
    /// Arguments without any limits.
    pub fn new(
        point_cloud: impl Into<String>,
        solid: impl Into<String>,
        output: impl Into<String>,
        zsub: impl Into<String>,
    ) -> Self {
        Self {
            point_cloud: point_cloud.into(),
            solid: solid.into(),
            output: output.into(),
            zsub: zsub.into(),
            ..Self::default()
        }
    }

    /// Enables the Z cull with the given bounds.
    pub fn with_z(mut self, zmin: impl Into<String>, zmax: impl Into<String>) -> Self {
        self.use_z = true;
        self.zmin = zmin.into();
        self.zmax = zmax.into();
        self
    }

    /// Enables the XY clip with the given bounds. The Z cull must be enabled
    /// separately.
    pub fn with_xy(
        mut self,
        xmin: impl Into<String>,
        xmax: impl Into<String>,
        ymin: impl Into<String>,
        ymax: impl Into<String>,
    ) -> Self {
        self.use_xy = true;
        self.xmin = xmin.into();
        self.xmax = xmax.into();
        self.ymin = ymin.into();
        self.ymax = ymax.into();
        self
    }

    fn limit_fields(&self, axis: Axis) -> [&str; 2] {
        match axis {
            Axis::X => [&self.xmin, &self.xmax],
            Axis::Y => [&self.ymin, &self.ymax],
            Axis::Z => [&self.zmin, &self.zmax],
        }
    }

    fn uses(&self, axis: Axis) -> bool {
        match axis {
            Axis::X | Axis::Y => self.use_xy,
            Axis::Z => self.use_z,
        }
    }
}

/// Validated input for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineContext {
    point_cloud: PathBuf,
    solid: PathBuf,
    output: PathBuf,
    use_cube: bool,
    limits: AxisLimits,
    zsub: f64,
}

impl PipelineContext {
    pub fn point_cloud(&self) -> &Path {
        &self.point_cloud
    }

    pub fn solid(&self) -> &Path {
        &self.solid
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// `true` when the result is clipped against the bounding prism.
    pub fn use_cube(&self) -> bool {
        self.use_cube
    }

    pub fn limits(&self) -> &AxisLimits {
        &self.limits
    }

    pub fn zsub(&self) -> f64 {
        self.zsub
    }

    /// Directory holding the output file and the intermediate files.
    pub fn output_dir(&self) -> &Path {
        self.output.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Second validation pass, see [`check_limits`].
    pub fn check(&self) -> PipelineResult<()> {
        check_limits(self.use_cube, &self.limits, self.zsub)
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// First validation pass.
///
/// `output_extension` is the extension produced by the configured format
/// converter (without the leading dot). Limits of axes that are not requested
/// are ignored.
pub fn sanitize_arguments(
    raw: &RawArguments,
    output_extension: &str,
) -> PipelineResult<PipelineContext> {
    let point_cloud = Path::new(&raw.point_cloud);
    if !point_cloud.is_file() {
        return Err(PipelineError::argument(
            POINT_CLOUD_ARG,
            codes::POINT_CLOUD_MISSING,
            format!("Error: point cloud input file does not exist: {}", raw.point_cloud),
        ));
    }
    let solid = Path::new(&raw.solid);
    if !solid.is_file() {
        return Err(PipelineError::argument(
            SOLID_ARG,
            codes::SOLID_MISSING,
            format!("Error: STL input file does not exist: {}", raw.solid),
        ));
    }
    let output = Path::new(&raw.output);
    if !has_extension(output, output_extension) {
        return Err(PipelineError::argument(
            OUTPUT_ARG,
            codes::OUTPUT_EXTENSION,
            format!(
                "Error: output file does not have {} extension: {}",
                output_extension.to_ascii_uppercase(),
                raw.output
            ),
        ));
    }
    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            return Err(PipelineError::argument(
                OUTPUT_ARG,
                codes::OUTPUT_DIRECTORY,
                format!("Error: output file is not in a valid directory: {}", raw.output),
            ));
        }
    }
    let to_absolute = |p: &Path| {
        absolute(p).map_err(|e| {
            PipelineError::internal(format!("could not resolve {}: {}", p.display(), e))
        })
    };
    let point_cloud = to_absolute(point_cloud)?;
    let solid = to_absolute(solid)?;
    let output = to_absolute(output)?;

    if raw.use_xy && !raw.use_z {
        return Err(PipelineError::argument(
            USE_XY_ARG,
            codes::XY_WITHOUT_Z,
            "Error: if XY axes are enabled, Z axis must be also enabled",
        ));
    }

    let mut limits = AxisLimits::none();
    for axis in Axis::ALL {
        if !raw.uses(axis) {
            continue;
        }
        let mut values = [0.0; 2];
        for (endpoint, field) in raw.limit_fields(axis).iter().enumerate() {
            let idx = limit_arg(axis, endpoint);
            let text = field.trim();
            if text.is_empty() {
                return Err(PipelineError::argument(
                    idx,
                    codes::limit(codes::LIMIT_EMPTY, idx),
                    format!("Error: empty field for {}{}", axis.name(), ENDPOINT_NAMES[endpoint]),
                ));
            }
            values[endpoint] = text.parse::<f64>().map_err(|_| {
                PipelineError::argument(
                    idx,
                    codes::limit(codes::LIMIT_UNPARSABLE, idx),
                    format!(
                        "Error: invalid value for {}{}: {}",
                        axis.name(),
                        ENDPOINT_NAMES[endpoint],
                        text
                    ),
                )
            })?;
        }
        limits = limits.with(axis, Range::new(values[0], values[1]));
    }

    let zsub = raw.zsub.trim().parse::<f64>().map_err(|_| {
        PipelineError::argument(
            ZSUB_ARG,
            codes::ZSUB_INVALID,
            format!("Error: invalid value for zsub: {}", raw.zsub),
        )
    })?;

    Ok(PipelineContext {
        point_cloud,
        solid,
        output,
        use_cube: raw.use_xy,
        limits,
        zsub,
    })
}

/// Second validation pass: numeric sanity of the limits and the base offset.
///
/// With `use_cube` all three axes must be populated, ordered, not NaN and
/// finite. Without it, only a Z range may be present; it must be ordered and
/// not NaN but may be infinite. No limits at all is valid.
pub fn check_limits(use_cube: bool, limits: &AxisLimits, zsub: f64) -> PipelineResult<()> {
    if zsub.is_nan() || zsub <= 0.0 {
        return Err(PipelineError::argument(
            ZSUB_ARG,
            codes::ZSUB_NOT_POSITIVE,
            "The depth parameter zsub must be higher than 0",
        ));
    }
    let axes: &[Axis] = if use_cube {
        if limits.all().is_none() {
            return Err(PipelineError::validation(
                codes::CUBE_LIMITS_INCOMPLETE,
                "all limits must be correctly populated",
            ));
        }
        &Axis::ALL
    } else if limits.get(Axis::X).is_some() || limits.get(Axis::Y).is_some() {
        return Err(PipelineError::validation(
            codes::LIMITS_INCONSISTENT,
            "Incorrect limits specification",
        ));
    } else if limits.get(Axis::Z).is_some() {
        &[Axis::Z]
    } else {
        return Ok(());
    };

    for &axis in axes {
        let Some(range) = limits.get(axis) else {
            continue;
        };
        let name = axis.name();
        for (endpoint, value) in range.endpoints().into_iter().enumerate() {
            if value.is_nan() {
                let idx = limit_arg(axis, endpoint);
                return Err(PipelineError::argument(
                    idx,
                    codes::limit(codes::LIMIT_NAN, idx),
                    format!("invalid condition: {}{} cannot be nan", name, ENDPOINT_NAMES[endpoint]),
                ));
            }
        }
        if range.min >= range.max {
            let idx = limit_arg(axis, 0);
            return Err(PipelineError::argument(
                idx,
                codes::limit(codes::LIMIT_ORDER, idx),
                format!(
                    "invalid condition: {name}min must be lower than {name}max: {}, {}",
                    range.min, range.max
                ),
            ));
        }
        if use_cube {
            for (endpoint, value) in range.endpoints().into_iter().enumerate() {
                if value.is_infinite() {
                    let idx = limit_arg(axis, endpoint);
                    return Err(PipelineError::argument(
                        idx,
                        codes::limit(codes::LIMIT_INFINITE, idx),
                        format!(
                            "{}{} cannot be infinite in this configuration",
                            name, ENDPOINT_NAMES[endpoint]
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}
