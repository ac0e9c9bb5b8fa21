use std::{env::args, num::NonZeroUsize};

use derive_more::{Display, Error};
use retrace::{
    search::{Order, Settings},
    team::{evaluate_teams_with, with_n_teams, Filter},
};
use tracing::{info, Level};
use tracing_subscriber::{filter::Targets, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Debug, Display, Error)]
#[display(fmt = "unknown member {}", _0)]
struct UnknownMember(#[error(not(source))] String);

// retrace A B C D -e A:B -e C:D -n 2 --depth-first --max-steps 10000
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::TRACE)
        .finish()
        .with(if let Ok(var) = std::env::var("RUST_LOG") {
            var.parse()?
        } else {
            Targets::new().with_default(Level::WARN)
        })
        .init();

    let mut roster = Vec::new();
    let mut enemies = Vec::new();
    let mut teams = None;
    let mut settings = Settings::default();
    let mut args = args().skip(1);
    while let Some(arg) = args.next() {
        match &*arg {
            "-e" | "--enemies" => {
                let Some(pair) = args.next() else {
                    anyhow::bail!("missing enemy pair after {arg}")
                };
                let Some((a, b)) = pair.split_once(':') else {
                    anyhow::bail!("enemy pair {pair:?} is not of form A:B")
                };
                enemies.push((a.to_string(), b.to_string()))
            }
            "-n" | "--teams" => {
                let Some(n) = args.next() else {
                    anyhow::bail!("missing team count after {arg}")
                };
                teams = Some(n.parse::<usize>()?)
            }
            "--depth-first" => settings.order = Order::DepthFirst,
            "--max-steps" => {
                let Some(n) = args.next() else {
                    anyhow::bail!("missing step budget after {arg}")
                };
                settings.max_steps = Some(n.parse::<NonZeroUsize>()?)
            }
            member => {
                anyhow::ensure!(!member.starts_with('-'), "unknown flag {member}");
                roster.push(member.to_string())
            }
        }
    }
    for (a, b) in &enemies {
        for member in [a, b] {
            anyhow::ensure!(roster.contains(member), UnknownMember(member.clone()))
        }
    }

    let are_enemy = |a: &String, b: &String| -> anyhow::Result<bool> {
        Ok(enemies
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a)))
    };
    let mut filters = Vec::<Filter<'_, String>>::new();
    if let Some(n) = teams {
        filters.push(with_n_teams(n))
    }
    let leagues = evaluate_teams_with(roster, are_enemy, &filters, settings);
    info!(count = leagues.len(), "leagues found");
    for league in leagues {
        println!("{}", serde_json::to_string(&league)?)
    }
    Ok(())
}
