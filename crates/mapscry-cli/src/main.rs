use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mapscry")]
#[command(about = "Console poller for the mapscry snapshot engine")]
struct Args {
    /// Target process executable name
    #[arg(short, long, default_value = "D2R.exe")]
    process: String,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value_t = 150)]
    interval_ms: u64,

    /// Print each snapshot as a JSON line instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mapscry=info".parse()?))
        .init();

    let args = Args::parse();
    run(args)
}

#[cfg(target_os = "windows")]
fn run(args: Args) -> Result<()> {
    use mapscry_core::{GameData, Scry, ScryConfig};
    use std::thread;
    use std::time::Duration;
    use tracing::info;

    let mut scry = Scry::new(ScryConfig {
        process_name: args.process.clone(),
    });
    let mut last: Option<GameData> = None;

    info!("Polling {} every {}ms...", args.process, args.interval_ms);

    loop {
        if let Some(snapshot) = scry.poll() {
            if snapshot.has_game_changed(last.as_ref()) {
                info!(
                    "Game changed: seed {:#x}, {}",
                    snapshot.map_seed, snapshot.difficulty
                );
            }
            if snapshot.has_map_changed(last.as_ref()) {
                info!("Area changed: {}", snapshot.area);
            }

            if args.json {
                println!("{}", serde_json::to_string(&snapshot)?);
            } else {
                info!(
                    "{} at ({}, {}) in {}: {} monsters, {} items, {} players, {} objects, {} shrines",
                    snapshot.player_name,
                    snapshot.player_position.x,
                    snapshot.player_position.y,
                    snapshot.area,
                    snapshot.entities.monsters.len(),
                    snapshot.entities.items.len(),
                    snapshot.entities.players.len(),
                    snapshot.entities.objects.len(),
                    snapshot.entities.shrines.len(),
                );
            }

            last = Some(snapshot);
        }
        // A failed poll keeps the last good snapshot; the next tick is a
        // fresh, independent attempt.
        thread::sleep(Duration::from_millis(args.interval_ms));
    }
}

#[cfg(not(target_os = "windows"))]
fn run(_args: Args) -> Result<()> {
    anyhow::bail!("mapscry reads Windows process memory and only runs on Windows")
}
