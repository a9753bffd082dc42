//! strata CLI - slice STL meshes into planar contour layers
//!
//! Reads an ASCII or binary STL file, welds it into a connected topology,
//! and writes the traced layers as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strata_math::Aabb3;
use strata_mesh::{import_file, CancelFlag};
use strata_slicer::{place_on_plate, SlicerSettings, Slicer, SETTING_KEYS};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod progress;

use progress::BarProgress;

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about = "Planar STL slicer", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice an STL file into contour layers
    Slice {
        /// Input STL file (ASCII or binary)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output JSON file (default: stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Settings file (TOML)
        #[arg(short, long, value_name = "SETTINGS")]
        settings: Option<PathBuf>,

        /// Write the effective settings to this file
        #[arg(long, value_name = "FILE")]
        output_settings: Option<PathBuf>,

        /// Override a setting, e.g. `--set layer_height=0.2` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Trace planes on the calling thread only
        #[arg(long)]
        sequential: bool,

        /// Slice the mesh where it is instead of placing it on the plate
        #[arg(long)]
        no_place: bool,
    },
    /// Display mesh statistics for an STL file
    Info {
        /// Input STL file
        input: PathBuf,

        /// Vertex merge tolerance
        #[arg(long, default_value = "0.02")]
        tolerance: f64,
    },
    /// List the settings accepted by `--set`
    Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match cli.command {
        Commands::Slice {
            input,
            output,
            settings,
            output_settings,
            overrides,
            sequential,
            no_place,
        } => {
            let settings = load_settings(settings.as_deref(), &overrides)?;
            if let Some(path) = output_settings {
                settings
                    .save(&path)
                    .with_context(|| format!("writing settings to {}", path.display()))?;
                info!(path = %path.display(), "Wrote effective settings");
            }
            slice_file(&input, output.as_deref(), &settings, !sequential, !no_place)?;
        }
        Commands::Info { input, tolerance } => {
            show_info(&input, tolerance)?;
        }
        Commands::Settings => {
            let defaults = SlicerSettings::default();
            print!("{}", defaults.to_toml_string()?);
            println!();
            println!("Keys: {}", SETTING_KEYS.join(", "));
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>, overrides: &[String]) -> Result<SlicerSettings> {
    let mut settings = match path {
        Some(path) => SlicerSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => SlicerSettings::default(),
    };
    settings.apply_overrides(overrides.iter().map(String::as_str))?;
    settings.validate()?;
    Ok(settings)
}

fn slice_file(
    input: &Path,
    output: Option<&Path>,
    settings: &SlicerSettings,
    parallel: bool,
    place: bool,
) -> Result<()> {
    let cancel = CancelFlag::new();

    let mut import_progress = BarProgress::new("import")?;
    let topology = import_file(input, settings.tolerance, &mut import_progress, &cancel)
        .with_context(|| format!("importing {}", input.display()))?;
    if !topology.is_watertight() {
        warn!(
            boundary_edges = topology.boundary_edge_count(),
            "Mesh is not watertight, some contours may stay open"
        );
    }

    let topology = if place {
        place_on_plate(&topology, settings)?
    } else {
        topology
    };

    let mut slice_progress = BarProgress::new("slice")?;
    let model = Slicer::new(&topology, settings)
        .with_cancel(cancel)
        .parallel(parallel)
        .run(&mut slice_progress)?;

    let json = serde_json::to_string_pretty(&model)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "Sliced {} into {} layers ({} contours) -> {}",
                input.display(),
                model.layer_count(),
                model.contour_count(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            writeln!(stdout)?;
        }
    }

    if model.premature_closure_count() > 0 {
        warn!(
            premature = model.premature_closure_count(),
            "Some contours did not close cleanly"
        );
    }

    Ok(())
}

fn show_info(input: &Path, tolerance: f64) -> Result<()> {
    let mut progress = BarProgress::new("import")?;
    let topology = import_file(input, tolerance, &mut progress, &CancelFlag::new())
        .with_context(|| format!("importing {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Tolerance: {tolerance}");
    println!();
    println!("Vertices: {}", topology.vertex_count());
    println!("Edges: {}", topology.edge_count());
    println!("Faces: {}", topology.face_count());
    println!("Boundary edges: {}", topology.boundary_edge_count());
    println!("Watertight: {}", if topology.is_watertight() { "yes" } else { "no" });
    println!("Bounds: {}", format_bounds(&topology.bounds()));

    Ok(())
}

fn format_bounds(bounds: &Aabb3) -> String {
    if bounds.is_empty() {
        return "(empty)".to_string();
    }
    let size = bounds.size();
    format!(
        "[{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}] (size {:.3} x {:.3} x {:.3})",
        bounds.min.x,
        bounds.min.y,
        bounds.min.z,
        bounds.max.x,
        bounds.max.y,
        bounds.max.z,
        size.x,
        size.y,
        size.z
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use strata_math::Point3;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_slice_overrides() {
        let cli = Cli::try_parse_from([
            "strata",
            "slice",
            "part.stl",
            "-o",
            "part.json",
            "--set",
            "layer_height=0.2",
            "--set",
            "scale=2",
            "--sequential",
        ])
        .unwrap();
        match cli.command {
            Commands::Slice {
                input,
                output,
                overrides,
                sequential,
                no_place,
                ..
            } => {
                assert_eq!(input, PathBuf::from("part.stl"));
                assert_eq!(output, Some(PathBuf::from("part.json")));
                assert_eq!(overrides, vec!["layer_height=0.2", "scale=2"]);
                assert!(sequential);
                assert!(!no_place);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_load_settings_applies_overrides() {
        let settings =
            load_settings(None, &["layer_height=0.2".to_string(), "scale=2".to_string()])
                .unwrap();
        assert_eq!(settings.layer_height, 0.2);
        assert_eq!(settings.scale, 2.0);
    }

    #[test]
    fn test_load_settings_rejects_unknown_key() {
        assert!(load_settings(None, &["nozzle=0.4".to_string()]).is_err());
    }

    #[test]
    fn test_format_bounds() {
        assert_eq!(format_bounds(&Aabb3::empty()), "(empty)");
        let b = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        assert!(format_bounds(&b).contains("size 1.000 x 2.000 x 3.000"));
    }
}
