// End to end lap sessions: recorded frames through the app, display, records and session log

use std::io;
use std::path::Path;

use partylaps::display::SettingRow;
use partylaps::storage::SessionLog;
use partylaps::{
    AppConfig, ClickAction, Color, ConsoleDisplay, FileRecordStorage, FrameStatus, Label,
    LapRecordStorage, PartyLapsApp, ReferencePolicy, ReplaySource, TelemetryFrame, TrackInfo,
};
use tempfile::TempDir;

fn track() -> TrackInfo {
    TrackInfo::new("ks_vallelunga", "club_circuit", "ks_mazda_mx5_cup")
}

fn config(data_dir: &Path) -> AppConfig {
    AppConfig {
        data_dir: Some(data_dir.to_path_buf()),
        update_time_ms: 0,
        drivers: vec!["alpha".to_string(), "beta".to_string()],
        current_driver: "alpha".to_string(),
        ..AppConfig::default()
    }
}

fn frame(session_id: i32, laps_completed: u32, track_position: f32, lap_time_ms: u32) -> TelemetryFrame {
    TelemetryFrame {
        session_id,
        laps_completed,
        track_position,
        lap_time_ms,
        ..TelemetryFrame::default()
    }
}

fn session_start(session_id: i32) -> Vec<TelemetryFrame> {
    vec![frame(session_id, 0, 0., 0)]
}

/// One lap sampled every tenth of the track, then the line crossing and the settle frame
fn lap(session_id: i32, laps_before: u32, lap_time_ms: u32) -> Vec<TelemetryFrame> {
    let mut frames: Vec<_> = (1..10)
        .map(|tenth| {
            frame(
                session_id,
                laps_before,
                tenth as f32 * 0.1,
                lap_time_ms / 10 * tenth,
            )
        })
        .collect();
    for (position, time) in [(0.001, 50), (0.002, 150)] {
        frames.push(TelemetryFrame {
            last_lap_ms: lap_time_ms,
            ..frame(session_id, laps_before + 1, position, time)
        });
    }
    frames
}

/// Write `frames` as a JSON lines recording and open it
fn recording(dir: &TempDir, name: &str, frames: Vec<TelemetryFrame>) -> ReplaySource {
    let path = dir.path().join(name);
    serde_jsonlines::write_json_lines(&path, &frames).unwrap();
    ReplaySource::open(&path, track()).unwrap()
}

fn in_memory(frames: Vec<TelemetryFrame>) -> ReplaySource {
    ReplaySource::from_frames(track(), frames.into_iter().map(Ok::<_, io::Error>))
}

fn play(
    app: &mut PartyLapsApp,
    source: &mut ReplaySource,
    config: &AppConfig,
    display: &mut ConsoleDisplay,
) -> usize {
    let mut updates = 0;
    loop {
        match app.update(0.016, source, config, display) {
            FrameStatus::Finished => return updates,
            FrameStatus::Updated => updates += 1,
            status => panic!("unexpected frame status {:?}", status),
        }
    }
}

#[test]
fn test_multi_lap_session_is_logged_and_persisted() {
    let data_dir = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();
    let config = config(data_dir.path());
    let mut app = PartyLapsApp::open(track(), &config).unwrap();
    let mut display = ConsoleDisplay::new();
    app.attach(&config, &mut display);

    let frames = [session_start(1), lap(1, 0, 100_000), lap(1, 1, 96_000)].concat();
    let frame_count = frames.len();
    let mut source = recording(&recordings, "session.jsonl", frames);
    assert_eq!(play(&mut app, &mut source, &config, &mut display), frame_count);

    assert_eq!(app.tracker().laps(), &[100_000, 96_000]);
    assert_eq!(display.text(Label::LapNumber(0)), Some("1."));
    assert_eq!(display.text(Label::LapTime(0)), Some("1:40.000"));
    assert_eq!(display.color(Label::LapTime(0)), Some(Color::WHITE));
    assert_eq!(display.text(Label::LapTime(1)), Some("1:36.000"));
    assert_eq!(display.color(Label::LapTime(1)), Some(Color::GREEN));
    assert_eq!(display.text(Label::LapDelta(0)), Some("+2.000"));
    assert_eq!(display.color(Label::LapDelta(0)), Some(Color::RED));
    assert_eq!(display.text(Label::LapDelta(1)), Some("-2.000"));
    assert_eq!(display.text(Label::LapTime(2)), Some("-:--.---"));
    assert_eq!(display.text(Label::ReferenceTime), Some("1:38.000"));
    assert_eq!(display.text(Label::ReferenceHolder), Some("alpha"));
    assert_eq!(display.text(Label::TotalTime), Some("3:16.000"));
    assert_eq!(display.text(Label::Driver), Some("alpha"));
    assert_eq!(
        display.text(Label::Setting(SettingRow::BestLap)),
        Some("1:36.000")
    );

    // nothing is written mid-session
    let storage = FileRecordStorage::for_track(data_dir.path(), &track());
    assert!(storage.load_best_lap().is_none());

    // the host restarts the session
    let mut restart = in_memory(vec![frame(2, 0, 0., 100)]);
    play(&mut app, &mut restart, &config, &mut display);
    assert!(app.tracker().laps().is_empty());

    let best = storage.load_best_lap().unwrap();
    assert_eq!(best.time_ms, 96_000);
    assert_eq!(best.holder, "alpha");
    assert_eq!(best.curve.len(), 11);
    assert_eq!(storage.load_personal_bests()["alpha"].time_ms, 96_000);

    let log_dir = SessionLog::new(data_dir.path());
    let log_files: Vec<_> = std::fs::read_dir(log_dir.directory())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(log_files.len(), 1);
    let file_name = log_files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("ks_vallelunga [club_circuit] - ks_mazda_mx5_cup - "));
    assert!(file_name.ends_with(".jsonl"));

    let entries = SessionLog::read_entries(&log_files[0]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].session, 1);
    assert_eq!(entries[0].laps_ms, vec![100_000, 96_000]);
    assert_eq!(entries[0].reference, Some(ReferencePolicy::Median));
    assert_eq!(entries[0].reference_ms, Some(98_000));
    assert_eq!(entries[0].best_ms, 96_000);
    assert_eq!(entries[0].total_ms, 196_000);
}

#[test]
fn test_locked_records_survive_restart() {
    let data_dir = TempDir::new().unwrap();
    let mut config = config(data_dir.path());
    let mut display = ConsoleDisplay::new();

    let mut app = PartyLapsApp::open(track(), &config).unwrap();
    let mut source = in_memory([session_start(1), lap(1, 0, 100_000)].concat());
    play(&mut app, &mut source, &config, &mut display);
    app.shutdown(&config).unwrap();

    // next start, records locked
    let mut app = PartyLapsApp::open(track(), &config).unwrap();
    assert_eq!(app.tracker().records().best_time_ms(), 100_000);
    assert!(app.handle_click(ClickAction::ToggleLockBest, &mut config, &mut display));
    assert!(config.lock_best);

    let mut source = in_memory([session_start(5), lap(5, 0, 95_000)].concat());
    play(&mut app, &mut source, &config, &mut display);
    assert_eq!(app.tracker().records().session_best_ms(), 95_000);
    assert_eq!(app.tracker().records().best_time_ms(), 100_000);
    app.shutdown(&config).unwrap();

    let storage = FileRecordStorage::for_track(data_dir.path(), &track());
    assert_eq!(storage.load_best_lap().unwrap().time_ms, 100_000);
    assert_eq!(storage.load_personal_bests()["alpha"].time_ms, 100_000);

    // unlocked again, the same pace takes the record
    app.handle_click(ClickAction::ToggleLockBest, &mut config, &mut display);
    let mut source = in_memory(lap(5, 1, 95_000));
    play(&mut app, &mut source, &config, &mut display);
    app.shutdown(&config).unwrap();
    assert_eq!(storage.load_best_lap().unwrap().time_ms, 95_000);
}

#[test]
fn test_drivers_keep_their_own_personal_bests() {
    let data_dir = TempDir::new().unwrap();
    let mut config = config(data_dir.path());
    let mut display = ConsoleDisplay::new();
    let mut app = PartyLapsApp::open(track(), &config).unwrap();

    let mut source = in_memory([session_start(1), lap(1, 0, 100_000)].concat());
    play(&mut app, &mut source, &config, &mut display);

    app.handle_click(ClickAction::CycleDriver, &mut config, &mut display);
    assert_eq!(config.current_driver, "beta");

    let mut source = in_memory([lap(1, 1, 103_000), lap(1, 2, 98_000)].concat());
    play(&mut app, &mut source, &config, &mut display);
    assert_eq!(display.text(Label::Driver), Some("beta"));
    app.shutdown(&config).unwrap();

    let storage = FileRecordStorage::for_track(data_dir.path(), &track());
    let best = storage.load_best_lap().unwrap();
    assert_eq!((best.time_ms, best.holder.as_str()), (98_000, "beta"));
    let personal_bests = storage.load_personal_bests();
    assert_eq!(personal_bests["alpha"].time_ms, 100_000);
    assert_eq!(personal_bests["beta"].time_ms, 98_000);

    // resetting beta hands nothing back to alpha's best lap, but keeps alpha's personal best
    app.reset_best_lap(&config).unwrap();
    assert!(storage.load_best_lap().is_none());
    assert_eq!(storage.load_personal_bests().len(), 1);
    assert_eq!(storage.load_personal_bests()["alpha"].time_ms, 100_000);
}

#[test]
fn test_replay_frames_record_nothing() {
    let data_dir = TempDir::new().unwrap();
    let config = config(data_dir.path());
    let mut display = ConsoleDisplay::new();
    let mut app = PartyLapsApp::open(track(), &config).unwrap();

    let frames = [session_start(1), lap(1, 0, 100_000)]
        .concat()
        .into_iter()
        .map(|frame| TelemetryFrame {
            is_replay: true,
            ..frame
        })
        .collect();
    let mut source = in_memory(frames);
    play(&mut app, &mut source, &config, &mut display);
    app.shutdown(&config).unwrap();

    assert!(app.tracker().laps().is_empty());
    assert!(app.tracker().is_replay());
    assert!(!FileRecordStorage::for_track(data_dir.path(), &track()).path().exists());
    assert!(!SessionLog::new(data_dir.path()).directory().exists());
}

#[test]
fn test_delta_window_follows_live_delta() {
    let data_dir = TempDir::new().unwrap();
    let config = config(data_dir.path());
    let mut display = ConsoleDisplay::new();
    let mut app = PartyLapsApp::open(track(), &config).unwrap();

    let mut source = in_memory(
        [
            session_start(1),
            lap(1, 0, 100_000),
            vec![frame(1, 1, 0.5, 50_800)],
        ]
        .concat(),
    );
    play(&mut app, &mut source, &config, &mut display);

    assert_eq!(display.text(Label::CurrentDelta), Some("+0.800"));
    assert_eq!(display.text(Label::DeltaWindow), Some("+0.800"));
    assert_eq!(display.color(Label::DeltaWindow), Some(Color::RED));
    assert_eq!(display.text(Label::PersonalBestDelta), Some("+0.800"));
    assert_eq!(display.text(Label::CurrentTime), Some("1:40.800"));
}
