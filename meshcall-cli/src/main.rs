mod simulation;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use meshcall_client::peer::{NegotiationState, PeerLinkSummary};
use meshcall_client::transport::ConnectionHealth;
use simulation::{ParticipantReport, SimulationOptions, simulate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshcall-sim")]
#[command(about = "Simulates a mesh meeting on in-process signaling and loopback connections")]
struct Cli {
    /// Log negotiation details.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Simulate {
        #[arg(short, long, default_value_t = 3)]
        participants: usize,

        /// Have the first participant share a screen once the mesh settles.
        #[arg(long)]
        screen_share: bool,

        /// Index of a participant to remove after the mesh settles.
        #[arg(long)]
        drop: Option<usize>,

        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Simulate {
            participants,
            screen_share,
            drop,
            timeout_ms,
        } => {
            println!(
                "{}",
                format!("📡 Simulating a meeting with {participants} participants...")
                    .green()
                    .bold()
            );

            let reports = simulate(SimulationOptions {
                participants,
                screen_share,
                drop,
                timeout_ms,
            })
            .await?;

            for report in &reports {
                print_report(report);
            }
            println!("{}", "✨ Mesh settled".green().bold());
        }
    }

    Ok(())
}

fn print_report(report: &ParticipantReport) {
    let mut title = format!("● {}", report.user_id).cyan().bold().to_string();
    if report.screen_sharing {
        title.push_str(&" (sharing screen)".magenta().to_string());
    }
    println!("{title}");

    if report.links.is_empty() {
        println!("   {}", "no links".dimmed());
    }
    for link in &report.links {
        println!("   → {}", describe_link(link));
    }
}

fn describe_link(link: &PeerLinkSummary) -> String {
    let state = format!("{:?}", link.state);
    let state = if link.state == NegotiationState::Stable {
        state.green()
    } else {
        state.yellow()
    };

    let health = format!("{:?}", link.health);
    let health = match link.health {
        ConnectionHealth::Connected => health.green(),
        ConnectionHealth::Failed | ConnectionHealth::Closed => health.red(),
        _ => health.yellow(),
    };

    let role = if link.is_initiator { "offerer" } else { "answerer" };
    format!("{} {} {} ({})", link.user_id, state, health, role.dimmed())
}
