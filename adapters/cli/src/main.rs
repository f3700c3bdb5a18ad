#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a lobby scenario and prints what each
//! local connection would submit to the server.

mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lobby_core::{
    ConnectionKind, ForceId, ForceSnapshot, PlayerId, SendingConnection, TeamId, UnitId,
    UnitSnapshot,
};
use lobby_system_actions::LobbyActions;
use lobby_system_routing::{deliver, MessageSink};
use lobby_world::query;
use log::{info, warn, LevelFilter};

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays lobby scenarios", long_about = None)]
struct CliArgs {
    /// Path to the scenario TOML file
    #[arg(long)]
    scenario: PathBuf,

    /// Log every planning decision
    #[arg(long)]
    verbose: bool,

    /// Seed for random crew generation
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Prints every outbound message on its own line.
struct Printer;

impl Printer {
    fn sender(sender: SendingConnection) -> String {
        match sender.kind {
            ConnectionKind::Operator => format!("operator {}", sender.player),
            ConnectionKind::Automated => format!("bot {}", sender.player),
        }
    }
}

impl MessageSink for Printer {
    fn send_add(&mut self, sender: SendingConnection, units: &[UnitSnapshot]) {
        println!("[{}] add units {}", Self::sender(sender), unit_list(units));
    }

    fn send_update(&mut self, sender: SendingConnection, units: &[UnitSnapshot]) {
        println!("[{}] update units {}", Self::sender(sender), unit_list(units));
    }

    fn send_update_force(
        &mut self,
        sender: SendingConnection,
        forces: &[ForceSnapshot],
        units: &[UnitSnapshot],
    ) {
        let names: Vec<_> = forces
            .iter()
            .map(|force| format!("{} '{}'", force.id, force.name))
            .collect();
        println!(
            "[{}] update forces [{}] with units {}",
            Self::sender(sender),
            names.join(", "),
            unit_list(units)
        );
    }

    fn send_delete(&mut self, sender: SendingConnection, units: &[UnitId]) {
        let ids: Vec<_> = units.iter().map(ToString::to_string).collect();
        println!("[{}] delete units [{}]", Self::sender(sender), ids.join(", "));
    }

    fn send_delete_forces(&mut self, sender: SendingConnection, forces: &[ForceId]) {
        let ids: Vec<_> = forces.iter().map(ToString::to_string).collect();
        println!("[{}] delete forces [{}]", Self::sender(sender), ids.join(", "));
    }

    fn send_team(&mut self, sender: SendingConnection, player: PlayerId, team: Option<TeamId>) {
        let team = team.map_or_else(
            || String::from("no team"),
            |team| format!("team {}", team.get()),
        );
        println!("[{}] move {player} to {team}", Self::sender(sender));
    }
}

fn unit_list(units: &[UnitSnapshot]) -> String {
    let ids: Vec<_> = units.iter().map(|unit| unit.id.to_string()).collect();
    format!("[{}]", ids.join(", "))
}

/// Entry point for the lobby command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let scenario = Scenario::load(&args.scenario)?;
    let mut world = scenario.seed()?;
    let mut actions = LobbyActions::with_seed(args.seed);
    info!(
        "seeded lobby with {} units and {} forces",
        query::unit_ids(&world).len(),
        query::force_ids(&world).len()
    );

    let mut printer = Printer;
    for (index, action) in scenario.actions.iter().enumerate() {
        println!("#{index} {}", action.label());
        let mut out = Vec::new();
        match action.run(&mut actions, &mut world, &mut out) {
            Ok(()) => deliver(&out, &mut printer),
            Err(error) => {
                warn!("action #{index} rejected");
                println!("  rejected: {error}");
            }
        }
    }

    Ok(())
}
