use std::str::FromStr;
use std::time::{Duration, Instant};

use engine::{HeadlessRunner, Tick, TickClock};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::Level;
use tracing_subscriber::prelude::*;

use ledtris::playtest::TetrisLogic;
use ledtris::settings::SettingsStore;
use ledtris::tetrimino::PieceKind;
use ledtris::{GameState, Intents};

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Wall-clock cost of each runner step.
#[derive(Default)]
struct StepTimes {
    micros: Vec<f64>,
}

impl StepTimes {
    fn record(&mut self, d: Duration) {
        self.micros.push(d.as_secs_f64() * 1_000_000.0);
    }

    fn summary(mut self) -> String {
        if self.micros.is_empty() {
            return "no steps".to_string();
        }
        self.micros.sort_by(|a, b| a.total_cmp(b));
        let n = self.micros.len();
        let mean = self.micros.iter().sum::<f64>() / n as f64;
        let p99 = self.micros[(n - 1) * 99 / 100];
        let worst = self.micros[n - 1];
        format!("steps={n} mean={mean:.3}us p99={p99:.3}us worst={worst:.3}us")
    }
}

/// A restless player: mostly idle, sometimes tapping, sometimes holding down.
fn random_intents(rng: &mut StdRng, holding_down: &mut bool) -> Intents {
    if rng.gen_bool(0.02) {
        *holding_down = !*holding_down;
    }
    let mut intents = Intents {
        soft_drop: *holding_down,
        ..Intents::NONE
    };
    match rng.gen_range(0..40) {
        0 => intents.move_left = true,
        1 => intents.move_right = true,
        2 => intents.rotate_cw = true,
        3 => intents.rotate_ccw = true,
        _ => {}
    }
    intents
}

fn main() {
    let level = std::env::var("LEDTRIS_LOG")
        .ok()
        .and_then(|v| Level::from_str(&v).ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();

    let ticks = env_usize("LEDTRIS_SOAK_TICKS", 50_000).max(1);
    let seed = env_u64("LEDTRIS_SOAK_SEED", 0x1ED7);
    let period_us = env_u32("LEDTRIS_SOAK_PERIOD_US", 1_000).max(1);

    let settings = SettingsStore::from_env().load();
    let logic = TetrisLogic::from_settings(&settings, seed);
    let mut runner = HeadlessRunner::new(logic, TickClock::new(Tick::ZERO, period_us));
    let mut input_rng = StdRng::seed_from_u64(seed);
    let mut holding_down = false;

    println!("ledtris soak (headless)");
    println!("ticks={ticks} seed={seed:#x} period={period_us}us");

    let mut times = StepTimes::default();
    let mut rounds = 0usize;
    for _ in 0..ticks {
        let intents = random_intents(&mut input_rng, &mut holding_down);
        let started = Instant::now();
        runner.step(intents);
        times.record(started.elapsed());

        if runner.state().state() == GameState::GameOver {
            rounds += 1;
            let board = runner.state().scoreboard();
            println!(
                "round {rounds}: score={} level={} lines={} time={}s",
                board.score, board.level, board.lines, board.playing_time
            );
            let config = *runner.state().config();
            let clock = TickClock::new(runner.now(), period_us);
            runner = HeadlessRunner::new(
                TetrisLogic::new(config, seed.wrapping_add(rounds as u64)),
                clock,
            );
        }
    }

    let game = runner.state();
    let board = game.scoreboard();
    println!(
        "final: score={} level={} lines={} state={:?}",
        board.score,
        board.level,
        board.lines,
        game.play_state()
    );
    for (kind, count) in PieceKind::ALL.iter().zip(game.session().piece_counts()) {
        println!("  {kind:?}: {count}");
    }

    println!("{}", times.summary());
}
