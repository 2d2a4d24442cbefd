use std::path::PathBuf;

use clap::Parser;

/// Headless layer compositor.
///
/// Stacks the given images as layers (the first one fixes the canvas size),
/// applies an optional JSON recipe of effects and geometry edits, and writes
/// the flattened result as PNG.
#[derive(Parser, Debug)]
#[command(
    name = "mesmerise",
    version,
    about = "Layer images, apply effects and export a flattened PNG",
    arg_required_else_help = true
)]
pub struct CliArgs {
    /// Image files to stack, bottom first.
    #[arg(short, long = "layer", value_name = "IMAGE", num_args = 1.., required_unless_present = "list_effects")]
    pub layers: Vec<PathBuf>,

    /// JSON recipe with per-layer effects, moves, resizes and a crop.
    #[arg(short, long, value_name = "RECIPE.json")]
    pub recipe: Option<PathBuf>,

    /// Editor config JSON. Missing fields take their defaults.
    #[arg(short, long, value_name = "CONFIG.json")]
    pub config: Option<PathBuf>,

    /// Fixed grain seed, overriding the config.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output PNG path.
    #[arg(short, long, value_name = "FILE", default_value = "mesmerised.png")]
    pub output: PathBuf,

    /// Print the effect catalog as JSON and exit.
    #[arg(long)]
    pub list_effects: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
