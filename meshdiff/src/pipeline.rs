//! Staged difference pipeline.
//!
//! A run goes through validation, drum synthesis, the optional bounding
//! prism, serialization of the intermediate solids, conversion of the
//! reference solid, the boolean difference, the optional clip against the
//! prism, conversion to the output format and a final check that the output
//! exists. The first failing stage ends the run.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::config::ToolConfig;
use crate::drum::drum_from_cloud;
use crate::engine::{converter_for, engine_for, BooleanEngine, BooleanOp, FormatConverter};
use crate::files::{remove_file, CleanupGuard, IntermediateFiles, Role};
use crate::io::{read_point_cloud, write_off};
use crate::limits::Axis;
use crate::mesh::Mesh;
use crate::outcome::{codes, Outcome, PipelineError, PipelineResult};
use crate::prism::bounding_prism;
use crate::sanitize::{sanitize_arguments, PipelineContext, RawArguments};

/// Pipeline bound to one boolean engine and one format converter.
pub struct Pipeline {
    engine: Box<dyn BooleanEngine>,
    converter: Box<dyn FormatConverter>,
    output_extension: String,
    keep_intermediates: bool,
}

impl Pipeline {
    pub fn new(engine: Box<dyn BooleanEngine>, converter: Box<dyn FormatConverter>) -> Self {
        Self {
            engine,
            converter,
            output_extension: "stl".to_string(),
            keep_intermediates: false,
        }
    }

    /// Pipeline using the backends selected in `config`.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(engine_for(config), converter_for(config))
            .with_output_extension(config.output_extension.clone())
            .keep_intermediates(config.keep_intermediates)
    }

    /// Extension produced by the converter, without the leading dot.
    pub fn with_output_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_extension = extension.into();
        self
    }

    /// Keep intermediate files on failure for inspection.
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    /// Runs the pipeline and folds the result into an [`Outcome`].
    ///
    /// Panics raised by any stage are reported as internal failures.
    pub fn run(&self, raw: &RawArguments) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_run(raw))) {
            Ok(result) => {
                if let Err(err) = &result {
                    log::error!("{} (code {})", err, err.code());
                }
                Outcome::from(result)
            }
            Err(payload) => {
                let backtrace = Backtrace::force_capture();
                let message = format!(
                    "Unexpected error: {}\n{}",
                    panic_message(payload.as_ref()),
                    backtrace
                );
                log::error!("{}", message);
                Outcome::failure(&PipelineError::internal(message))
            }
        }
    }

    /// Validates `raw` and executes every stage.
    pub fn try_run(&self, raw: &RawArguments) -> PipelineResult<String> {
        let ctx = sanitize_arguments(raw, &self.output_extension)?;
        ctx.check()?;
        self.engine.ensure_available()?;
        self.execute(&ctx)
    }

    /// Executes the stages for an already validated context.
    pub fn execute(&self, ctx: &PipelineContext) -> PipelineResult<String> {
        let files = IntermediateFiles::new(ctx.output_dir(), self.engine.uses_script());
        files.remove_all();
        remove_file(ctx.output());
        let guard = CleanupGuard::new(&files, self.keep_intermediates);

        log::info!(
            "meshdiff: {} - {} -> {} (engine {}, converter {})",
            ctx.point_cloud().display(),
            ctx.solid().display(),
            ctx.output().display(),
            self.engine.name(),
            self.converter.name()
        );

        let cloud = read_point_cloud(ctx.point_cloud())?;
        log::info!("read {} points", cloud.len());
        let drum = drum_from_cloud(&cloud, ctx.limits().get(Axis::Z), ctx.zsub())?;
        ensure_solid(&drum)?;

        let prism = if ctx.use_cube() {
            let ranges = ctx.limits().all().ok_or_else(|| {
                PipelineError::validation(
                    codes::CUBE_LIMITS_INCOMPLETE,
                    "Error: limits for X, Y and Z axes are required to clip the output",
                )
            })?;
            Some(bounding_prism(ranges))
        } else {
            None
        };

        let cloud_off = files.path(Role::PointCloud);
        let solid_off = files.path(Role::Solid);
        let prism_off = files.path(Role::Prism);
        let difference_off = files.path(Role::Difference);
        let output_off = files.path(Role::Output);

        if let Some(prism) = &prism {
            write_off(&prism_off, prism).map_err(|e| {
                PipelineError::external(
                    codes::PRISM_NOT_WRITTEN,
                    format!("Error trying to write the limits to {}: {}", prism_off.display(), e),
                )
            })?;
        }
        write_off(&cloud_off, &drum).map_err(|e| {
            PipelineError::external(
                codes::DRUM_NOT_WRITTEN,
                format!(
                    "Error trying to write the point cloud mesh to {}: {}",
                    cloud_off.display(),
                    e
                ),
            )
        })?;

        self.converter.convert(ctx.solid(), &solid_off).map_err(|e| {
            PipelineError::external(
                codes::SOLID_CONVERTER_FAILED,
                format!("Error trying to launch {}: {}", self.converter.name(), e),
            )
        })?;
        require_output(
            &solid_off,
            codes::SOLID_NOT_CONVERTED,
            "Error trying to convert the STL input file to OFF format",
        )?;

        let first_target = if prism.is_some() {
            &difference_off
        } else {
            &output_off
        };
        self.boolean(BooleanOp::Difference, &cloud_off, &solid_off, first_target, &files)?;
        require_output(
            first_target,
            codes::DIFFERENCE_FAILED,
            "Error trying to compute the difference between the point cloud and the STL mesh",
        )?;

        if prism.is_some() {
            self.boolean(
                BooleanOp::Intersection,
                &difference_off,
                &prism_off,
                &output_off,
                &files,
            )?;
            require_output(
                &output_off,
                codes::INTERSECTION_FAILED,
                "Error trying to apply the XYZ limits to the difference",
            )?;
        }

        self.converter.convert(&output_off, ctx.output()).map_err(|e| {
            PipelineError::external(
                codes::OUTPUT_CONVERTER_FAILED,
                format!("Error trying to launch {}: {}", self.converter.name(), e),
            )
        })?;
        require_output(
            ctx.output(),
            codes::OUTPUT_NOT_CONVERTED,
            "Error trying to convert the result to the output format",
        )?;

        let written = fs::metadata(ctx.output()).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(PipelineError::external(
                codes::OUTPUT_MISSING,
                format!("Error: output file is missing or empty: {}", ctx.output().display()),
            ));
        }

        guard.finish();
        let message = format!("output file has been written: {}", ctx.output().display());
        log::info!("{}", message);
        Ok(message)
    }

    fn boolean(
        &self,
        op: BooleanOp,
        first: &Path,
        second: &Path,
        output: &Path,
        files: &IntermediateFiles,
    ) -> PipelineResult<()> {
        log::debug!("{} {:?} {} {}", self.engine.name(), op, first.display(), second.display());
        self.engine
            .run(op, first, second, output, files)
            .map_err(|e| {
                PipelineError::external(
                    codes::ENGINE_LAUNCH_FAILED,
                    format!("Error trying to launch {}: {}", self.engine.name(), e),
                )
            })
    }
}

/// Runs one difference with the backends selected in `config`.
pub fn run_difference(config: &ToolConfig, raw: &RawArguments) -> Outcome {
    Pipeline::from_config(config).run(raw)
}

fn require_output(path: &Path, code: i32, message: &str) -> PipelineResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::external(
            code,
            format!("{}: {} was not produced", message, path.display()),
        ))
    }
}

fn ensure_solid(mesh: &Mesh) -> PipelineResult<()> {
    if mesh.indices_in_range() && mesh.is_closed() {
        return Ok(());
    }
    Err(PipelineError::geometry(
        codes::SYNTHESIS_FAILED,
        format!(
            "Error trying to generate a mesh from the point cloud: {} open edges",
            mesh.unmatched_edges().len()
        ),
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ErrorClass;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;
    use tempfile::TempDir;

    type Calls = Rc<RefCell<Vec<String>>>;

    /// Engine that writes `first` into the output and records each call.
    struct CopyEngine {
        calls: Calls,
        skip: Option<BooleanOp>,
        launchable: bool,
    }

    impl BooleanEngine for CopyEngine {
        fn name(&self) -> &'static str {
            "copy"
        }

        fn ensure_available(&self) -> PipelineResult<()> {
            Ok(())
        }

        fn run(
            &self,
            op: BooleanOp,
            first: &Path,
            _second: &Path,
            output: &Path,
            _files: &IntermediateFiles,
        ) -> io::Result<()> {
            if !self.launchable {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such engine"));
            }
            self.calls.borrow_mut().push(format!("{:?}", op));
            if self.skip != Some(op) {
                fs::copy(first, output)?;
            }
            Ok(())
        }
    }

    /// What the converter does on a given call.
    #[derive(Clone, Copy)]
    enum Step {
        Copy,
        Skip,
        Empty,
        Unlaunchable,
    }

    /// Converter following a per-call plan; calls past the plan copy.
    struct CopyConverter {
        calls: Calls,
        plan: Vec<Step>,
    }

    impl FormatConverter for CopyConverter {
        fn name(&self) -> &'static str {
            "copy"
        }

        fn convert(&self, input: &Path, output: &Path) -> io::Result<()> {
            let n = self.calls.borrow().iter().filter(|c| *c == "convert").count();
            let step = self.plan.get(n).copied().unwrap_or(Step::Copy);
            self.calls.borrow_mut().push("convert".to_string());
            match step {
                Step::Copy => fs::copy(input, output).map(|_| ()),
                Step::Skip => Ok(()),
                Step::Empty => fs::write(output, ""),
                Step::Unlaunchable => Err(io::Error::new(io::ErrorKind::NotFound, "no converter")),
            }
        }
    }

    struct PanickingConverter;

    impl FormatConverter for PanickingConverter {
        fn name(&self) -> &'static str {
            "panic"
        }

        fn convert(&self, _input: &Path, _output: &Path) -> io::Result<()> {
            panic!("converter exploded")
        }
    }

    fn pipeline(skip: Option<BooleanOp>) -> (Pipeline, Calls) {
        scripted(skip, true, Vec::new())
    }

    fn scripted(skip: Option<BooleanOp>, launchable: bool, plan: Vec<Step>) -> (Pipeline, Calls) {
        let calls: Calls = Rc::default();
        let pipeline = Pipeline::new(
            Box::new(CopyEngine {
                calls: calls.clone(),
                skip,
                launchable,
            }),
            Box::new(CopyConverter {
                calls: calls.clone(),
                plan,
            }),
        );
        (pipeline, calls)
    }

    fn cube(raw: RawArguments) -> RawArguments {
        raw.with_z("0", "5").with_xy("-1", "11", "-1", "11")
    }

    fn inputs(dir: &TempDir) -> RawArguments {
        let pc = dir.path().join("cloud.txt");
        fs::write(
            &pc,
            "0;0;1\n10;0;1.5\n10;10;2\n0;10;1.2\n5;5;3\n",
        )
        .unwrap();
        let solid = dir.path().join("ref.stl");
        fs::write(&solid, "solid ref\nendsolid ref\n").unwrap();
        RawArguments::new(
            pc.to_string_lossy(),
            solid.to_string_lossy(),
            dir.path().join("result.stl").to_string_lossy(),
            "0.5",
        )
    }

    fn leftovers(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".off") || n.ends_with(".scad"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn difference_without_limits_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = pipeline(None);
        let outcome = pipeline.run(&inputs(&dir));
        assert!(outcome.ok, "{:?}", outcome);
        assert_eq!(outcome.code, Some(codes::SUCCESS));
        let output = dir.path().join("result.stl");
        assert_eq!(
            outcome.message.as_deref(),
            Some(format!("output file has been written: {}", output.display()).as_str())
        );
        assert!(fs::read_to_string(&output).unwrap().starts_with("OFF\n"));
        assert_eq!(*calls.borrow(), ["convert", "Difference", "convert"]);
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn cube_limits_add_intersection_stage() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = pipeline(None);
        let outcome = pipeline.run(&cube(inputs(&dir)));
        assert!(outcome.ok, "{:?}", outcome);
        assert_eq!(
            *calls.borrow(),
            ["convert", "Difference", "Intersection", "convert"]
        );
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn missing_difference_output_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(Some(BooleanOp::Difference));
        let outcome = pipeline.run(&inputs(&dir));
        assert!(!outcome.ok);
        assert_eq!(outcome.code, Some(codes::DIFFERENCE_FAILED));
        assert_eq!(outcome.class, Some(ErrorClass::ExternalProcess));
        assert!(leftovers(&dir).is_empty());
        assert!(!dir.path().join("result.stl").exists());
    }

    #[test]
    fn missing_intersection_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(Some(BooleanOp::Intersection));
        let outcome = pipeline.run(&cube(inputs(&dir)));
        assert_eq!(outcome.code, Some(codes::INTERSECTION_FAILED));
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn debug_mode_keeps_intermediates_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(Some(BooleanOp::Difference));
        let outcome = pipeline.keep_intermediates(true).run(&inputs(&dir));
        assert_eq!(outcome.code, Some(codes::DIFFERENCE_FAILED));
        assert_eq!(leftovers(&dir), ["pc.off", "stl.off"]);
    }

    #[test]
    fn validation_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("pc.off");
        fs::write(&stale, "stale").unwrap();
        let (pipeline, calls) = pipeline(None);
        let mut raw = inputs(&dir);
        raw.output = dir.path().join("result.obj").to_string_lossy().into_owned();
        let outcome = pipeline.run(&raw);
        assert_eq!(outcome.code, Some(codes::OUTPUT_EXTENSION));
        assert_eq!(outcome.arg_index, Some(2));
        assert!(stale.exists());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn geometry_failure_clears_stale_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("int.off");
        fs::write(&stale, "stale").unwrap();
        let (pipeline, _) = pipeline(None);
        // only one point lies inside the depth range
        let raw = inputs(&dir).with_z("2.9", "3.1");
        let outcome = pipeline.run(&raw);
        assert_eq!(outcome.code, Some(codes::TOP_TRIANGULATION_FAILED));
        assert_eq!(outcome.class, Some(ErrorClass::Geometry));
        assert!(!stale.exists());
    }

    #[test]
    fn unconverted_solid_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = scripted(None, true, vec![Step::Skip]);
        let outcome = pipeline.run(&inputs(&dir));
        assert_eq!(outcome.code, Some(codes::SOLID_NOT_CONVERTED));
        assert_eq!(*calls.borrow(), ["convert"]);
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn unconverted_output_after_clip_cleans_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = scripted(None, true, vec![Step::Copy, Step::Skip]);
        let outcome = pipeline.run(&cube(inputs(&dir)));
        assert_eq!(outcome.code, Some(codes::OUTPUT_NOT_CONVERTED));
        assert_eq!(outcome.class, Some(ErrorClass::ExternalProcess));
        assert_eq!(
            *calls.borrow(),
            ["convert", "Difference", "Intersection", "convert"]
        );
        assert!(leftovers(&dir).is_empty());
        assert!(!dir.path().join("result.stl").exists());
    }

    #[test]
    fn unconverted_output_keeps_every_stage_in_debug_mode() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = scripted(None, true, vec![Step::Copy, Step::Skip]);
        let outcome = pipeline.keep_intermediates(true).run(&cube(inputs(&dir)));
        assert_eq!(outcome.code, Some(codes::OUTPUT_NOT_CONVERTED));
        assert_eq!(
            leftovers(&dir),
            ["cube.off", "int.off", "out.off", "pc.off", "stl.off"]
        );
    }

    #[test]
    fn converter_launch_failures_are_split_by_stage() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = scripted(None, true, vec![Step::Unlaunchable]);
        let outcome = pipeline.run(&inputs(&dir));
        assert_eq!(outcome.code, Some(codes::SOLID_CONVERTER_FAILED));

        let (pipeline, _) = scripted(None, true, vec![Step::Copy, Step::Unlaunchable]);
        let outcome = pipeline.run(&inputs(&dir));
        assert_eq!(outcome.code, Some(codes::OUTPUT_CONVERTER_FAILED));
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn empty_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = scripted(None, true, vec![Step::Copy, Step::Empty]);
        let outcome = pipeline.run(&inputs(&dir));
        assert!(!outcome.ok);
        assert_eq!(outcome.code, Some(codes::OUTPUT_MISSING));
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn engine_launch_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = scripted(None, false, Vec::new());
        let outcome = pipeline.run(&inputs(&dir));
        assert_eq!(outcome.code, Some(codes::ENGINE_LAUNCH_FAILED));
        assert_eq!(outcome.class, Some(ErrorClass::ExternalProcess));
        assert!(outcome.message.unwrap().contains("no such engine"));
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn open_drum_is_a_synthesis_failure() {
        let mut mesh = drum_from_cloud(
            &[
                crate::geometry::Point3::new(0.0, 0.0, 0.0),
                crate::geometry::Point3::new(1.0, 0.0, 0.0),
                crate::geometry::Point3::new(0.0, 1.0, 0.0),
            ],
            None,
            1.0,
        )
        .unwrap();
        assert!(ensure_solid(&mesh).is_ok());
        mesh.triangles.pop();
        let err = ensure_solid(&mesh).unwrap_err();
        assert_eq!(err.code(), codes::SYNTHESIS_FAILED);
        assert_eq!(err.class(), ErrorClass::Geometry);
    }

    #[test]
    fn panics_become_internal_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = pipeline(None);
        let pipeline = Pipeline::new(base.engine, Box::new(PanickingConverter));
        let outcome = pipeline.run(&inputs(&dir));
        assert!(!outcome.ok);
        assert_eq!(outcome.code, Some(codes::INTERNAL));
        assert_eq!(outcome.class, Some(ErrorClass::Internal));
        assert!(outcome.message.unwrap().contains("converter exploded"));
        assert!(leftovers(&dir).is_empty());
    }
}
