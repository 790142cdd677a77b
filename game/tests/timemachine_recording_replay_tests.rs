use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use engine::regression::{
    FrameHashGolden, StateDigest, assert_or_update_golden_json, record_then_replay_and_compare,
    state_hashes, update_goldens_enabled,
};
use engine::{HeadlessRunner, Tick, TickClock, TimeMachine};
use ledtris::playtest::TetrisLogic;
use ledtris::tetrimino::PieceKind;
use ledtris::{Game, Intents, PlayConfig, PlayState};

const PERIOD_US: u32 = 20_000;

fn unique_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("ledtris_{label}_{nanos}"))
}

/// A fixed script: nudge left, spin, then hold soft drop for a while.
fn scripted_inputs(ticks: usize) -> Vec<Intents> {
    (0..ticks)
        .map(|i| match i % 50 {
            1 => Intents::left(),
            3 => Intents::rotate_cw(),
            7 => Intents::right(),
            9 => Intents::rotate_ccw(),
            20..=45 => Intents::soft_drop(),
            _ => Intents::NONE,
        })
        .collect()
}

#[test]
fn tetris_timemachine_can_be_saved_and_replayed_from_disk() {
    let logic = TetrisLogic::new(PlayConfig::default(), 123);
    let mut runner = HeadlessRunner::new(logic.clone(), TickClock::new(Tick::ZERO, PERIOD_US));

    runner.step(Intents::left());
    runner.step(Intents::rotate_cw());
    runner.step(Intents::right());

    let out = unique_temp_dir("tm").with_extension("json");
    runner
        .timemachine()
        .save_json_file(&out)
        .expect("save tetris timemachine json");

    let loaded_tm = TimeMachine::<Game>::load_json_file(&out).expect("load tetris timemachine json");
    let replay_runner = HeadlessRunner::from_timemachine(logic, loaded_tm, PERIOD_US);

    assert_eq!(replay_runner.frame(), runner.frame());
    assert_eq!(replay_runner.now(), runner.now());
    assert_eq!(replay_runner.state(), runner.state());

    let orig_tm = runner.timemachine();
    let replay_tm = replay_runner.timemachine();
    assert_eq!(replay_tm.len(), orig_tm.len());

    for frame in 0..orig_tm.len() {
        let a = orig_tm.state_at(frame).map(|s| s.digest_bytes());
        let b = replay_tm.state_at(frame).map(|s| s.digest_bytes());
        assert_eq!(a, b, "digest mismatch at frame {frame}");
    }

    let _ = fs::remove_file(out);
}

#[test]
fn long_session_replays_tick_for_tick() {
    let dir = unique_temp_dir("replay");
    let inputs = scripted_inputs(3_000);
    let artifacts = record_then_replay_and_compare(
        "scripted_session",
        &dir,
        TetrisLogic::new(PlayConfig::default(), 7),
        TickClock::new(Tick(u32::MAX - 10 * PERIOD_US), PERIOD_US),
        inputs,
    )
    .expect("replay should match the live run");
    assert_eq!(artifacts.hashes.len(), 3_001);

    let loaded = TimeMachine::<Game>::load_json_file(&artifacts.state_json).expect("reload");
    let last = loaded.state();
    assert!(last.session().piece_counts().iter().sum::<u32>() > 0);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn rewind_and_branch_changes_the_future() {
    let logic = TetrisLogic::new(PlayConfig::default(), 5);
    let mut runner = HeadlessRunner::new(logic, TickClock::new(Tick::ZERO, PERIOD_US));
    runner.run(scripted_inputs(10));
    let x_before = runner.state().session().piece().x;

    runner.rewind(8);
    assert_eq!(runner.now(), Tick(2 * PERIOD_US));
    runner.step(Intents::right());
    runner.step(Intents::right());
    assert_eq!(runner.history().len(), 5);
    assert_ne!(runner.state().session().piece().x, x_before);
    assert_eq!(runner.state().play_state(), PlayState::Normal);
}

/// Seed 2024 opens with an O and a T on deck. The hashes cover the digest
/// layout, the seeded draws and the first spawn.
#[test]
fn opening_frames_hash_to_known_values() {
    let logic = TetrisLogic::new(PlayConfig::default(), 2024);
    let mut runner = HeadlessRunner::new(logic, TickClock::new(Tick::ZERO, PERIOD_US));
    runner.step(Intents::NONE);

    let piece = runner.state().session().piece();
    assert_eq!(piece.piece(), PieceKind::O);
    assert_eq!(piece.next_piece, PieceKind::T);

    let hashes = state_hashes(runner.history().iter().map(|f| &f.state));
    assert_eq!(
        hashes,
        vec![
            "025b30fcb1614a39e030a1915ce25e235939e5786204de07ceb51a7ddc0f627b".to_string(),
            "b110e8b8314067fb639b18f08d35717343d44d2835ec04f844ad75d1bb85dd29".to_string(),
        ]
    );
}

#[test]
fn scripted_session_matches_golden_hashes() {
    let logic = TetrisLogic::new(PlayConfig::default(), 2024);
    let mut runner = HeadlessRunner::new(logic, TickClock::new(Tick::ZERO, PERIOD_US));
    runner.run(scripted_inputs(600));

    let hashes = state_hashes(runner.history().iter().map(|f| &f.state));
    let golden = FrameHashGolden::new("scripted_session_seed_2024", PERIOD_US, hashes);
    let path = engine::regression_golden_path!("scripted_session_seed_2024");
    assert_or_update_golden_json(&path, &golden, update_goldens_enabled())
        .unwrap_or_else(|e| panic!("{e}"));
}
