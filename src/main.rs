//! Command Gateway CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use command_gateway::{
    init_logging, render, CommandGateway, ExecutionOutcome, GatewayConfig, PolicyMode,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "command-gateway")]
#[command(about = "Validate and run shell commands under a fixed policy", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (.yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Policy mode, overriding the configuration file
    #[arg(long, global = true)]
    mode: Option<PolicyMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command line and print the result
    Run {
        /// Full command line, e.g. "ls -la /var/log"
        command: String,

        /// Seconds before the command is killed
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Validate a command line and print what would run, without running it
    Check {
        /// Full command line
        command: String,
    },

    /// List whitelisted commands
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config = config.with_mode(mode);
    }

    let gateway = CommandGateway::new(config).context("invalid gateway configuration")?;

    match cli.command {
        Commands::Run { command, timeout } => {
            println!("{}", gateway.run_command(&command, timeout).await);
        }
        Commands::Check { command } => match gateway.plan(&command) {
            Ok(plan) => println!("ALLOWED ({}): {}", gateway.mode(), plan.describe()),
            Err(denial) => println!("{}", render(&ExecutionOutcome::Denied(denial))),
        },
        Commands::List => list_commands(&gateway),
    }

    Ok(())
}

fn list_commands(gateway: &CommandGateway) {
    if gateway.mode() == PolicyMode::Unrestricted {
        println!("Unrestricted mode: every command is allowed.");
        return;
    }

    let whitelist = &gateway.config().whitelist;
    println!("Whitelisted Commands ({}):", whitelist.len());
    println!();

    for entry in whitelist.entries() {
        println!(
            "  {} - {}",
            entry.command,
            entry.description.as_deref().unwrap_or("No description")
        );
    }

    let filter = &gateway.config().filter;
    println!();
    println!("Max args: {}", filter.max_args);
    println!("Max arg length: {}", filter.max_arg_len);
    println!("Denied characters: {}", filter.denied_chars);
}
