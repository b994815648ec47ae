//! boxwire-probe: open a connection to the simulated engine, build a small
//! demo session, and print status snapshots as JSON.
//!
//! Usage: boxwire-probe [--verbose] [--osc] [master|engine|scene|song|config|all]

use std::fs::File;
use std::sync::Arc;

use boxwire_core::{serve_frame, Config, Connection, EngineBackend, OscBridge, Proxy, Result};
use boxwire_sim::SimEngine;
use boxwire_types::PatternEvent;
use serde_json::{json, Value as Json};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("boxwire")
        .join("boxwire.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("boxwire.log")));
    let Ok(log_file) = log_file else {
        eprintln!("boxwire-probe: cannot create log file, logging disabled");
        return;
    };

    if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
        eprintln!("boxwire-probe: logger already initialised");
        return;
    }

    log::info!("boxwire-probe starting (log level: {:?})", log_level);
}

/// Populate the simulator with one layered scene and a one-track song.
fn build_demo(conn: &Connection) -> Result<()> {
    let master = conn.master()?;
    master.set_tempo(128.0)?;
    master.set_timesig(4, 4)?;

    let engine = conn.engine()?;
    if let Some(scene) = engine.scene()? {
        scene.set_name("demo")?;
        let layer = scene.add_instrument_layer("sampler")?;
        layer.set_range(24, 72)?;
        if let Some(inst) = layer.instrument()? {
            let sound = inst.sound_engine()?;
            sound.set_patch(0, "Kit")?;
            sound.set_polyphony(32)?;
        }
    }

    let pattern = engine.new_pattern_from_events(
        &[
            PatternEvent::note_on(0, 9, 36, 100),
            PatternEvent::note_off(10, 9, 36, 100),
            PatternEvent::note_on(24, 9, 38, 90),
            PatternEvent::note_off(34, 9, 38, 90),
        ],
        48,
    )?;
    pattern.set_name("beat")?;

    if let Some(song) = engine.song()? {
        song.add_pattern(&pattern)?;
        let track = song.add_track()?;
        track.set_name("drums")?;
        track.add_clip(0, 0, 48, &pattern)?;
        song.set_loop(0, 48)?;
        song.update_playback()?;
    }

    conn.engine_config()?.set("io", "outputs", "2")?;
    Ok(())
}

fn dump(conn: &Connection, what: &str) -> Result<Json> {
    let engine = conn.engine()?;
    Ok(match what {
        "master" => conn.master()?.status()?.to_json(),
        "engine" => engine.status()?.to_json(),
        "scene" => match engine.scene()? {
            Some(scene) => {
                let mut snap = scene.status()?.to_json();
                let layers = scene
                    .layers()?
                    .iter()
                    .map(|l| l.status().map(|s| s.to_json()))
                    .collect::<Result<Vec<_>>>()?;
                snap["layer_status"] = Json::Array(layers);
                snap
            }
            None => Json::Null,
        },
        "song" => match engine.song()? {
            Some(song) => {
                let mut snap = song.status()?.to_json();
                let tracks = song
                    .tracks()?
                    .iter()
                    .map(|t| t.status().map(|s| s.to_json()))
                    .collect::<Result<Vec<_>>>()?;
                snap["track_status"] = Json::Array(tracks);
                snap
            }
            None => Json::Null,
        },
        "config" => {
            let store = conn.engine_config()?;
            let mut sections = serde_json::Map::new();
            for section in store.sections("")? {
                let mut keys = serde_json::Map::new();
                for key in store.keys(&section)? {
                    let value = store.get(&section, &key)?.map(Json::String).unwrap_or(Json::Null);
                    keys.insert(key, value);
                }
                sections.insert(section, Json::Object(keys));
            }
            Json::Object(sections)
        }
        _ => json!({
            "master": dump(conn, "master")?,
            "engine": dump(conn, "engine")?,
            "scene": dump(conn, "scene")?,
            "song": dump(conn, "song")?,
            "config": dump(conn, "config")?,
        }),
    })
}

fn open(use_osc: bool) -> Result<Arc<Connection>> {
    let config = Config::load();
    let sim = Arc::new(SimEngine::new());
    if use_osc {
        let server = sim.clone();
        let bridge = OscBridge::new(move |frame: &[u8]| {
            serve_frame(server.as_ref() as &dyn EngineBackend, frame)
        });
        Connection::open(bridge, config)
    } else {
        Connection::open(sim, config)
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let use_osc = args.iter().any(|a| a == "--osc");
    let what = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map(String::as_str)
        .unwrap_or("all");
    init_logging(verbose);

    let result = open(use_osc).and_then(|conn| {
        build_demo(&conn)?;
        let out = dump(&conn, what)?;
        let pending = conn.idle()?;
        log::debug!("{} unsolicited events drained", pending.len());
        Ok(out)
    });

    match result {
        Ok(out) => match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("boxwire-probe: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::error!("probe failed: {}", e);
            eprintln!("boxwire-probe: {}", e);
            std::process::exit(1);
        }
    }
}
