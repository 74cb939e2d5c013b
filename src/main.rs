//! Console horse race.
//!
//! Prompts for the track length and lane count unless given on the command
//! line, draws every tick to the terminal and offers a rematch with the same
//! horses afterwards.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::LevelFilter;

use horse_race::error::{MAX_LANES, MIN_LANES};
use horse_race::game_server::roster::default_roster;
use horse_race::{
    BetResult, ConsoleRenderer, RaceOutcome, RaceServer, RaceSetup, Renderer, Terrain,
};

const FALLBACK_LANES: usize = 4;

#[derive(Parser, Debug)]
#[command(name = "horse-race", about = "Console horse race simulator")]
struct Args {
    /// Track length in steps (prompted when absent)
    #[arg(long, conflicts_with = "config")]
    length: Option<u32>,

    /// Number of lanes, 2-6 (prompted when absent)
    #[arg(long, conflicts_with = "config")]
    lanes: Option<usize>,

    /// Load the race setup from a JSON file instead of the stock roster
    #[arg(long)]
    config: Option<PathBuf>,

    /// Track surface: normal, muddy or icy
    #[arg(long)]
    terrain: Option<Terrain>,

    /// Seed for a reproducible race
    #[arg(long)]
    seed: Option<u64>,

    /// Override the fall probability coefficient
    #[arg(long)]
    fall_coefficient: Option<f64>,

    /// Delay between frames in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Stop a race that has not finished after this many ticks
    #[arg(long)]
    max_ticks: Option<u32>,

    /// Lane to bet on
    #[arg(long, requires = "bet_amount")]
    bet_lane: Option<usize>,

    /// Amount to bet
    #[arg(long, requires = "bet_lane")]
    bet_amount: Option<f64>,

    /// Print frames one after another instead of redrawing in place
    #[arg(long)]
    no_clear: bool,

    /// Run a single race without asking to play again
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    horse_race::init_logging(LevelFilter::Info);
    let args = Args::parse();

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let setup = build_setup(&args, &mut input)?;
    let mut server = RaceServer::new();
    server.init_race(&setup).context("invalid race setup")?;

    let renderer = ConsoleRenderer::new(io::stdout());
    let mut renderer = if args.no_clear {
        renderer.without_clear()
    } else {
        renderer
    };

    loop {
        if let (Some(lane), Some(amount)) = (args.bet_lane, args.bet_amount) {
            let bet = server.place_bet(lane, amount).context("could not place bet")?;
            println!(
                "Betting {:.2} on {} at odds {:.2}x",
                bet.amount, bet.horse_name, bet.odds
            );
        }

        run_race(&mut server, &mut renderer, &args)?;

        if args.once || !ask_yes_no("Play again with the same horses? (y/n): ", &mut input)? {
            break;
        }
        server.replay()?;
        println!("\n--- Restarting race! ---\n");
    }

    let stats = server.get_stats();
    log::debug!(
        "Last race: {} ticks, {:.3} ms per tick, seed {}",
        stats.ticks,
        stats.avg_tick_time_ms,
        stats.seed
    );
    Ok(())
}

fn build_setup(args: &Args, input: &mut impl BufRead) -> Result<RaceSetup> {
    let mut setup = match &args.config {
        Some(path) => RaceSetup::load(path)
            .with_context(|| format!("failed to load race setup from {}", path.display()))?,
        None => {
            let track_length = match args.length {
                Some(length) => length,
                None => prompt_track_length(input)?,
            };
            let lane_count = match args.lanes {
                Some(lanes) => lanes,
                None => prompt_lane_count(input)?,
            };
            RaceSetup {
                track_length,
                lane_count,
                horses: default_roster(lane_count),
                ..RaceSetup::default()
            }
        }
    };

    if let Some(terrain) = args.terrain {
        setup.terrain = terrain;
    }
    if let Some(seed) = args.seed {
        setup.seed = Some(seed);
    }
    if let Some(coefficient) = args.fall_coefficient {
        setup.rules.fall_coefficient = coefficient;
    }
    Ok(setup)
}

fn run_race(
    server: &mut RaceServer,
    renderer: &mut ConsoleRenderer<io::Stdout>,
    args: &Args,
) -> Result<()> {
    server.start_race()?;
    let delay = Duration::from_millis(args.delay_ms);

    while server.is_running() {
        if tick_limit_reached(args.max_ticks, server.ticks()) {
            server.pause();
            log::warn!("Race stopped after {} ticks", server.ticks());
            break;
        }
        if let Some(snapshot) = server.tick() {
            renderer.render(&snapshot)?;
        }
        if server.is_running() && !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    let outcome = server
        .outcome()
        .cloned()
        .unwrap_or(RaceOutcome::TickLimitReached);
    renderer.announce(&outcome)?;

    // A race stopped at the tick limit has no stored outcome; the bet still loses
    match server.bet().map(|bet| bet.settle(&outcome)) {
        Some(BetResult::Won { payout }) => println!("You won! Payout: {payout:.2}"),
        Some(BetResult::Lost { stake }) => println!("You lost your bet of {stake:.2}"),
        None => {}
    }
    Ok(())
}

/// No tick may start once `max_ticks` have run
fn tick_limit_reached(max_ticks: Option<u32>, ticks: u32) -> bool {
    max_ticks.is_some_and(|limit| ticks >= limit)
}

/// Read one trimmed line after printing `label`; `None` at end of input
fn prompt(label: &str, input: &mut impl BufRead) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt_track_length(input: &mut impl BufRead) -> Result<u32> {
    let raw = prompt("Enter the length of the track: ", input)?
        .ok_or_else(|| anyhow!("no track length given"))?;
    raw.parse()
        .with_context(|| format!("'{raw}' is not a valid track length"))
}

fn prompt_lane_count(input: &mut impl BufRead) -> Result<usize> {
    let raw = prompt("Enter number of lanes (2-6): ", input)?.unwrap_or_default();
    match raw.parse::<usize>() {
        Ok(lanes) if (MIN_LANES..=MAX_LANES).contains(&lanes) => Ok(lanes),
        _ => {
            println!("Invalid number of lanes. Using default of {FALLBACK_LANES}.");
            Ok(FALLBACK_LANES)
        }
    }
}

fn ask_yes_no(label: &str, input: &mut impl BufRead) -> Result<bool> {
    let answer = prompt(label, input)?.unwrap_or_default();
    Ok(matches!(answer.chars().next(), Some('y' | 'Y')))
}
