use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use meshdiff::config::{ConverterKind, EngineKind, ToolConfig};
use meshdiff::files::RESERVED_FILES;
use meshdiff::{run_difference, Outcome, PipelineError, RawArguments};

#[derive(Parser)]
#[command(name = "meshdiff", version)]
#[command(about = "Subtract a reference solid from a survey point cloud", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Computes point cloud minus solid and writes the result.
    Diff {
        /// Point cloud, one `x;y;z` point per line.
        point_cloud: String,
        /// Reference solid to subtract.
        solid: String,
        /// Output file; its extension must match the converter output.
        output: String,
        /// Keep only points with ZMIN <= z <= ZMAX.
        #[arg(long, num_args = 2, value_names = ["ZMIN", "ZMAX"], allow_hyphen_values = true)]
        z: Option<Vec<String>>,
        /// Clip the result to a box; requires --z.
        #[arg(
            long,
            num_args = 4,
            value_names = ["XMIN", "XMAX", "YMIN", "YMAX"],
            allow_hyphen_values = true
        )]
        xy: Option<Vec<String>>,
        /// Depth of the drum base below the lowest point.
        #[arg(long, default_value = "0.1", allow_hyphen_values = true)]
        zsub: String,
        /// JSON tool configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Boolean engine: cork or openscad.
        #[arg(long)]
        engine: Option<String>,
        /// Format converter: freecad or meshlab.
        #[arg(long)]
        converter: Option<String>,
        /// Keep intermediate files when the run fails.
        #[arg(long)]
        keep_intermediates: bool,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Lists the intermediate files written beside the output.
    ReservedFiles,
    /// Prints the effective tool configuration as JSON.
    ShowConfig {
        /// JSON tool configuration to start from.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_logging() {
    if let Ok(path) = std::env::var("MESHDIFF_LOG") {
        match File::create(&path) {
            Ok(file) => {
                env_logger::Builder::from_default_env()
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Failed to create log file {}: {}", path, e);
                env_logger::Builder::from_default_env().init();
            }
        }
    } else {
        env_logger::Builder::from_default_env().init();
    }
}

fn tool_config(
    path: Option<PathBuf>,
    engine: Option<String>,
    converter: Option<String>,
    keep_intermediates: bool,
) -> Result<ToolConfig, PipelineError> {
    let mut config = match path {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };
    if let Some(engine) = engine {
        config.engine = engine.parse::<EngineKind>()?;
    }
    if let Some(converter) = converter {
        config.converter = converter.parse::<ConverterKind>()?;
    }
    config.keep_intermediates |= keep_intermediates;
    Ok(config)
}

fn report(outcome: &Outcome, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string(outcome) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error serializing outcome: {}", e),
        }
    } else if outcome.ok {
        println!("{}", outcome.message.as_deref().unwrap_or_default());
    } else {
        let message = outcome.message.as_deref().unwrap_or("unknown error");
        match outcome.arg_index {
            Some(idx) => eprintln!("{} (argument {})", message, idx),
            None => eprintln!("{}", message),
        }
    }
    ExitCode::from(outcome.exit_code().clamp(0, 255) as u8)
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Diff {
            point_cloud,
            solid,
            output,
            z,
            xy,
            zsub,
            config,
            engine,
            converter,
            keep_intermediates,
            json,
        } => {
            let config = match tool_config(config, engine, converter, keep_intermediates) {
                Ok(config) => config,
                Err(err) => return report(&Outcome::failure(&err), json),
            };
            let mut raw = RawArguments::new(point_cloud, solid, output, zsub);
            if let Some([zmin, zmax]) = z.as_deref() {
                raw = raw.with_z(zmin.as_str(), zmax.as_str());
            }
            if let Some([xmin, xmax, ymin, ymax]) = xy.as_deref() {
                raw = raw.with_xy(xmin.as_str(), xmax.as_str(), ymin.as_str(), ymax.as_str());
            }
            report(&run_difference(&config, &raw), json)
        }
        Commands::ReservedFiles => {
            for file in RESERVED_FILES.iter() {
                println!("{:<10} {}", file.name, file.description);
            }
            ExitCode::SUCCESS
        }
        Commands::ShowConfig { config } => match tool_config(config, None, None, false) {
            Ok(config) => {
                println!("{}", config.to_json());
                ExitCode::SUCCESS
            }
            Err(err) => report(&Outcome::failure(&err), false),
        },
    }
}
