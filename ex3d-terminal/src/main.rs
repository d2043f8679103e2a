/// EX3D command line exporter
///
/// Usage:
///   ex3d export --output demo.3mf [--depth 5] [--size 60]
///   ex3d export --scene scene.json --output scene.glb
///   ex3d inspect demo.stl

use clap::Parser;
use ex3d_terminal::{inspect, run_export, Cli, Command, Report};
use std::io::{self, stdout};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut report = Report::new(stdout());
    let result = match &cli.command {
        Command::Export(args) => run_export(args).and_then(|output| {
            report.diagnostics(&output.diagnostics)?;
            report.exported(&output, &args.output.display().to_string())
        }),
        Command::Inspect { file } => {
            inspect(file).and_then(|mesh| report.inspected(&mesh, &file.display().to_string()))
        }
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report.failed(&e.to_string())?;
            Ok(ExitCode::FAILURE)
        }
    }
}
