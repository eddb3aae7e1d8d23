//! Command-line simulator: plays a beatmap with autoplay input for one or more
//! players and reports the final scores.

use anyhow::{Context, Result, bail};
use clap::Parser;
use osu_ruleset::difficulty::{NullCalculator, PerformanceCalculator, RosuCalculator};
use osu_ruleset::logic;
use osu_ruleset::models::engine::Beatmap;
use osu_ruleset::models::mods::Mods;
use osu_ruleset::models::settings::RulesetConfig;
use osu_ruleset::system::autoplay::autoplay_samples;
use osu_ruleset::system::bus::{InputBus, InputFrame, SessionEvent};
use osu_ruleset::{PlayerId, PlayerSetup, Ruleset};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(name = "osu-ruleset")]
#[command(about = "Plays an osu!standard beatmap through the ruleset with autoplay input", version)]
struct Args {
    /// Path to the .osu beatmap
    map: PathBuf,

    /// Path to a TOML ruleset config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Player as NAME or NAME:MODS (e.g. `alice:HDHR`). Repeat for multiplayer.
    #[arg(short, long = "player")]
    players: Vec<String>,

    /// Maximum autoplay timing error in ms
    #[arg(short, long, default_value_t = 0.0)]
    jitter: f64,

    /// Seed for the autoplay jitter
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the final scores as JSON
    #[arg(long)]
    json: bool,

    /// Skip the performance rating
    #[arg(long)]
    no_pp: bool,
}

fn parse_player(text: &str) -> Result<PlayerSetup> {
    let (name, mods) = match text.split_once(':') {
        Some((name, mods)) => (name, mods),
        None => (text, ""),
    };
    if name.is_empty() {
        bail!("player `{}` has no name", text);
    }
    let mods = Mods::from_acronyms(mods).with_context(|| format!("unknown mods in `{}`", text))?;
    Ok(PlayerSetup::new(name, mods))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("MAIN: Booting osu-ruleset {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => RulesetConfig::load(path)
            .with_context(|| format!("failed to load config {:?}", path))?,
        None => RulesetConfig::default(),
    };

    let beatmap = Beatmap::from_path(&args.map)
        .with_context(|| format!("failed to load beatmap {:?}", args.map))?;

    let players = if args.players.is_empty() {
        vec![PlayerSetup::new("player", Mods::NONE)]
    } else {
        args.players
            .iter()
            .map(|p| parse_player(p))
            .collect::<Result<Vec<_>>>()?
    };

    let calculator: Box<dyn PerformanceCalculator> = if args.no_pp {
        Box::new(NullCalculator)
    } else {
        match RosuCalculator::from_path(&args.map) {
            Ok(calc) => Box::new(calc),
            Err(e) => {
                log::warn!("MAIN: Performance rating disabled: {}", e);
                Box::new(NullCalculator)
            }
        }
    };

    // Every player's timeline, merged into one time-ordered stream.
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut frames: Vec<InputFrame> = Vec::new();
    for (index, setup) in players.iter().enumerate() {
        let player = PlayerId(index);
        frames.extend(
            autoplay_samples(&beatmap, setup.mods, args.jitter, &mut rng)
                .into_iter()
                .map(|sample| InputFrame::Cursor {
                    player,
                    sample,
                    process_ahead: false,
                }),
        );
    }
    frames.sort_by(|a, b| frame_time(a).total_cmp(&frame_time(b)));

    let end_time = beatmap.end_time();
    let player_count = players.len();

    let ruleset = Ruleset::new(beatmap, players, config, calculator)
        .context("failed to set up the ruleset")?;

    let bus = InputBus::with_capacity(256);
    let input_tx = bus.input_tx.clone();
    let event_rx = bus.event_rx.clone();

    let producer = thread::Builder::new()
        .name("Input Thread".to_string())
        .spawn(move || {
            for frame in frames {
                if input_tx.send(frame).is_err() {
                    return;
                }
            }
            for index in 0..player_count {
                let _ = input_tx.send(InputFrame::Stopped {
                    player: PlayerId(index),
                    time: end_time + 1.0,
                });
            }
        })
        .context("failed to spawn the input thread")?;

    let logic = logic::start_thread(bus, ruleset).context("failed to spawn the logic thread")?;

    let mut judgements = 0usize;
    for event in event_rx.iter() {
        match event {
            SessionEvent::Hit(_) => judgements += 1,
            SessionEvent::Failed(player) => log::warn!("MAIN: Player {} failed", player.0),
            SessionEvent::ObjectEnded { .. } => {}
            SessionEvent::Ended => break,
        }
    }

    if producer.join().is_err() {
        bail!("input thread panicked");
    }
    let Ok(ruleset) = logic.join() else {
        bail!("logic thread panicked");
    };

    log::info!("MAIN: {} judgements published", judgements);

    if args.json {
        let scores: Vec<_> = (0..ruleset.player_count())
            .filter_map(|index| ruleset.score(PlayerId(index)))
            .collect();
        let json = serde_json::to_string_pretty(&scores).context("failed to serialize scores")?;
        println!("{}", json);
    }

    Ok(())
}

fn frame_time(frame: &InputFrame) -> f64 {
    match frame {
        InputFrame::Cursor { sample, .. } => sample.time,
        InputFrame::Stopped { time, .. } | InputFrame::Tick { time } => *time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player() {
        let setup = parse_player("alice:HDHR").unwrap();
        assert_eq!(setup.name, "alice");
        assert_eq!(setup.mods, Mods::HIDDEN | Mods::HARD_ROCK);

        assert_eq!(parse_player("bob").unwrap().mods, Mods::NONE);
        assert!(parse_player(":HD").is_err());
        assert!(parse_player("carol:XX").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["osu-ruleset", "map.osu", "-p", "a:DT", "-p", "b", "--json"]);
        assert_eq!(args.players, vec!["a:DT", "b"]);
        assert!(args.json);
        assert_eq!(args.jitter, 0.0);
    }
}
