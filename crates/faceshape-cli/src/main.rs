use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceshape_core::{scorer, FaceShapeDetector, Measurement};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod frames;

use frames::OutputMode;

#[derive(Parser)]
#[command(name = "faceshape", about = "Face-shape classification from face-mesh landmarks")]
struct Cli {
    /// Classifier config (TOML). Defaults to $FACESHAPE_CONFIG, then built-in values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded landmark frames (JSON Lines) through the detector
    Detect {
        /// Frames file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Print one human-readable line per frame instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Score a single measurement and print every archetype's candidate
    Score {
        #[arg(long, allow_negative_numbers = true)]
        jaw: f64,
        #[arg(long, allow_negative_numbers = true)]
        cheekbone: f64,
        #[arg(long, allow_negative_numbers = true)]
        forehead: f64,
        #[arg(long, allow_negative_numbers = true)]
        length: f64,
    },
    /// List the archetype catalog
    Catalog,
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect { input, summary } => {
            let mode = if summary { OutputMode::Summary } else { OutputMode::Json };
            let mut detector = FaceShapeDetector::new(config)?;
            let stdout = io::stdout().lock();
            if input == "-" {
                frames::replay(&mut detector, io::stdin().lock(), stdout, mode)?;
            } else {
                let file = std::fs::File::open(&input).with_context(|| format!("opening {input}"))?;
                frames::replay(&mut detector, BufReader::new(file), stdout, mode)?;
            }
        }
        Commands::Score { jaw, cheekbone, forehead, length } => {
            let m = Measurement { jaw, cheekbone, forehead, length };
            let scored = scorer::score_shapes(&m, &config, None);
            println!("{}", serde_json::to_string_pretty(&scored)?);
        }
        Commands::Catalog => {
            let mut out = io::stdout().lock();
            writeln!(out, "{:<10} {:^20}  {:^20}", "shape", "ideal L/W J/C F/C", "weight")?;
            for a in &config.archetypes {
                writeln!(
                    out,
                    "{:<10} {:>6.2} {:>6.2} {:>6.2}  {:>6.2} {:>6.2} {:>6.2}",
                    a.shape, a.ideal[0], a.ideal[1], a.ideal[2], a.weight[0], a.weight[1], a.weight[2],
                )?;
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_accepts_negative_values() {
        let cli = Cli::try_parse_from([
            "faceshape", "score", "--jaw", "-1", "--cheekbone", "0", "--forehead", "-0.5", "--length", "1.2",
        ])
        .unwrap();
        match cli.command {
            Commands::Score { jaw, cheekbone, forehead, length } => {
                assert_eq!(jaw, -1.0);
                assert_eq!(cheekbone, 0.0);
                assert_eq!(forehead, -0.5);
                assert_eq!(length, 1.2);
            }
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["faceshape", "catalog", "--config", "shapes.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("shapes.toml")));
        assert!(matches!(cli.command, Commands::Catalog));
    }
}
