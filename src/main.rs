use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maze_bot_runtime::config::RobotConfig;
use maze_bot_runtime::surface::MazeVariant;

#[derive(Parser, Debug)]
#[command(name = "maze-bot-runtime", about = "Motion and surface runtime for the maze robot")]
struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drive simulated motors instead of the servo bus
    #[arg(long)]
    simulate: bool,

    /// Override the maze variant
    #[arg(long, value_enum)]
    maze: Option<MazeVariant>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match RobotConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RobotConfig::default(),
    };
    if let Some(maze) = cli.maze {
        config.maze = maze;
    }
    info!("Maze {:?}, metrics {:?}", config.maze, config.maze.metrics());

    if let Err(e) = maze_bot_runtime::runtime::run(config, cli.simulate).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
