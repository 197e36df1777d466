use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "reveille-cli", version, about = "Reveille CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm time inspection
    Time {
        #[command(subcommand)]
        action: commands::time::TimeAction,
    },
    /// In-process multi-device simulation
    Simulate {
        #[command(subcommand)]
        action: commands::simulate::SimulateAction,
    },
    /// Device configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Time { action } => commands::time::run(action),
        Commands::Simulate { action } => commands::simulate::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
