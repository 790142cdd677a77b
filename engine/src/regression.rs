//! Engine-level regression testing helpers.
//!
//! These utilities help you:
//! - digest every recorded state of a headless run (sha256 over caller-chosen bytes),
//! - keep those digests as a golden JSON file next to the tests, and
//! - save a run to disk, load it back, re-simulate it and assert nothing diverged.
//!
//! The engine stays game-agnostic: the game decides which bytes describe a state.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{GameLogic, HeadlessRunner, TickClock, TimeMachine};

/// Canonical byte encoding of a state for hashing.
pub trait StateDigest {
    fn digest_bytes(&self) -> Vec<u8>;
}

/// Environment flag helper: accepts `1/true/yes/on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// If set, regression tests may update golden files in-place.
pub fn update_goldens_enabled() -> bool {
    env_flag("LEDTRIS_UPDATE_GOLDENS")
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[macro_export]
macro_rules! regression_golden_path {
    ($name:expr) => {{
        let base = $crate::regression::sanitize_filename($name);
        ::std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("goldens")
            .join(format!("{base}.json"))
    }};
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn state_hashes<'a, S, I>(states: I) -> Vec<String>
where
    S: StateDigest + 'a,
    I: IntoIterator<Item = &'a S>,
{
    states
        .into_iter()
        .map(|s| sha256_hex(&s.digest_bytes()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameHashGolden {
    pub version: u32,
    pub name: String,
    pub tick_period_us: u32,
    pub hash_alg: String,
    /// One hash per recorded tick.
    pub hashes: Vec<String>,
}

impl FrameHashGolden {
    pub fn new(name: impl Into<String>, tick_period_us: u32, hashes: Vec<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            tick_period_us,
            hash_alg: "sha256".to_string(),
            hashes,
        }
    }
}

pub fn load_golden_json(path: impl AsRef<Path>) -> io::Result<FrameHashGolden> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed parsing golden json {}: {e}", path.display()),
        )
    })
}

pub fn save_golden_json(path: impl AsRef<Path>, golden: &FrameHashGolden) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, golden)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.flush()?;
    Ok(())
}

/// Compares against the golden at `path`, writing it when missing or when `update` is set.
pub fn assert_or_update_golden_json(
    path: impl AsRef<Path>,
    golden: &FrameHashGolden,
    update: bool,
) -> io::Result<()> {
    let path = path.as_ref();
    let exists = path.exists();

    if update || !exists {
        save_golden_json(path, golden)?;
        if !exists {
            eprintln!("wrote golden: {}", path.display());
        } else {
            eprintln!("updated golden: {}", path.display());
        }
        return Ok(());
    }

    let expected = load_golden_json(path)?;
    if expected.version != golden.version
        || expected.hash_alg != golden.hash_alg
        || expected.tick_period_us != golden.tick_period_us
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "golden metadata mismatch at {}:\nexpected: v{} alg={} period={}us\nactual:   v{} alg={} period={}us\n(hint: set LEDTRIS_UPDATE_GOLDENS=1 to rewrite)",
                path.display(),
                expected.version,
                expected.hash_alg,
                expected.tick_period_us,
                golden.version,
                golden.hash_alg,
                golden.tick_period_us,
            ),
        ));
    }

    if expected.hashes.len() != golden.hashes.len() {
        return Err(io::Error::other(format!(
            "golden tick count mismatch at {}: expected {} hashes, got {}\n(hint: set LEDTRIS_UPDATE_GOLDENS=1 to rewrite)",
            path.display(),
            expected.hashes.len(),
            golden.hashes.len()
        )));
    }

    if let Some((i, (a, b))) = expected
        .hashes
        .iter()
        .zip(golden.hashes.iter())
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        return Err(io::Error::other(format!(
            "golden mismatch at {} (tick {i}):\nexpected: {a}\nactual:   {b}\n(hint: set LEDTRIS_UPDATE_GOLDENS=1 to rewrite)",
            path.display()
        )));
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct RecordReplayArtifacts {
    pub state_json: PathBuf,
    pub hashes: Vec<String>,
}

/// Engine-level regression helper:
/// - run a scenario live and save its `TimeMachine` as JSON
/// - load the JSON, check every stored state digests the same as the live one
/// - re-simulate from the loaded initial frame with the same inputs and check
///   the run is deterministic tick for tick
pub fn record_then_replay_and_compare<G>(
    name: &str,
    out_dir: impl AsRef<Path>,
    game: G,
    clock: TickClock,
    inputs: impl IntoIterator<Item = G::Input>,
) -> io::Result<RecordReplayArtifacts>
where
    G: GameLogic + Clone,
    G::State: Serialize + DeserializeOwned + StateDigest,
    G::Input: Clone,
{
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let state_json = out_dir.join(format!("{}.json", sanitize_filename(name)));

    let inputs: Vec<G::Input> = inputs.into_iter().collect();

    let mut live = HeadlessRunner::new(game.clone(), clock);
    live.run(inputs.iter().cloned());
    live.timemachine().save_json_file(&state_json)?;
    let live_hashes = state_hashes(live.history().iter().map(|f| &f.state));

    let loaded = TimeMachine::<G::State>::load_json_file(&state_json)?;
    let loaded_hashes = state_hashes(loaded.history().iter().map(|f| &f.state));
    if loaded_hashes != live_hashes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} did not round-trip through json", state_json.display()),
        ));
    }

    let mut replay = HeadlessRunner::from_timemachine(game, loaded, clock.period_us());
    replay.seek(0);
    replay.run(inputs);
    let replay_hashes = state_hashes(replay.history().iter().map(|f| &f.state));

    if let Some(i) = live_hashes
        .iter()
        .zip(replay_hashes.iter())
        .position(|(a, b)| a != b)
    {
        return Err(io::Error::other(format!(
            "replay of {name} diverged at tick {i}"
        )));
    }
    if live_hashes.len() != replay_hashes.len() {
        return Err(io::Error::other(format!(
            "replay of {name} recorded {} ticks, live run recorded {}",
            replay_hashes.len(),
            live_hashes.len()
        )));
    }

    Ok(RecordReplayArtifacts {
        state_json,
        hashes: live_hashes,
    })
}
