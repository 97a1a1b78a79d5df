use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::{info, warn};

use partylaps::{
    AppConfig, ConsoleDisplay, FileRecordStorage, FrameStatus, LapRecordStorage, PartyLapsApp,
    PartyLapsError, ReplaySource, TelemetrySource, TrackInfo,
    display::time_to_string,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file to use instead of the one in the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct TrackArgs {
    #[arg(short, long)]
    track: String,

    #[arg(short, long, default_value = "")]
    layout: String,

    #[arg(long)]
    car: String,
}

impl TrackArgs {
    fn track_info(&self) -> TrackInfo {
        TrackInfo::new(&self.track, &self.layout, &self.car)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the lap engine from recorded telemetry frames
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        track: TrackArgs,

        /// Host frame interval in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u32,

        #[arg(short, long)]
        driver: Option<String>,
    },
    /// Print the stored best lap and personal bests
    Records {
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Remove a driver's personal best, and the best lap if they hold it
    ResetBest {
        #[command(flatten)]
        track: TrackArgs,

        #[arg(short, long)]
        driver: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> AppConfig {
    let config = match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::from_local_file(),
    };
    config.unwrap_or_else(|| {
        info!("Using default settings");
        AppConfig::default()
    })
}

fn replay(
    mut config: AppConfig,
    input: &Path,
    track: TrackInfo,
    frame_ms: u32,
    driver: Option<String>,
    running: Arc<AtomicBool>,
) -> Result<(), PartyLapsError> {
    if let Some(driver) = driver {
        config.current_driver = driver;
    }

    let mut source = ReplaySource::open(input, track)?;
    let mut app = PartyLapsApp::open(source.track_info()?, &config)?;
    let mut display = ConsoleDisplay::new();
    app.attach(&config, &mut display);

    let delta_t = frame_ms as f64 / 1000.;
    let mut frames = 0usize;
    while running.load(Ordering::SeqCst) {
        match app.update(delta_t, &mut source, &config, &mut display) {
            FrameStatus::Finished => break,
            _ => frames += 1,
        }
    }

    info!(
        "Replayed {} frames, {} laps in the last session",
        frames,
        app.tracker().laps().len()
    );
    app.shutdown(&config)
}

fn records(config: &AppConfig, track: TrackInfo) -> Result<(), PartyLapsError> {
    let storage = FileRecordStorage::for_track(&config.data_dir()?, &track);
    println!("{}", track.record_stem());

    match storage.load_best_lap() {
        Some(best) => println!(
            "Best lap: {} by {}",
            time_to_string(best.time_ms as f64),
            if best.holder.is_empty() { "-" } else { best.holder.as_str() }
        ),
        None => println!("Best lap: none"),
    }
    for (driver, record) in storage.load_personal_bests() {
        println!("  {}: {}", driver, time_to_string(record.time_ms as f64));
    }
    Ok(())
}

fn reset_best(mut config: AppConfig, track: TrackInfo, driver: String) -> Result<(), PartyLapsError> {
    config.current_driver = driver;
    let mut app = PartyLapsApp::open(track, &config)?;
    app.reset_best_lap(&config)
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let config = load_config(cli.config.as_ref());

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        if !handler_flag.swap(false, Ordering::SeqCst) {
            warn!("Exiting without saving");
            std::process::exit(1);
        }
        println!("Exiting...");
    })
    .expect("Could not set Ctrl-C handler");

    match cli.command {
        Commands::Replay {
            input,
            track,
            frame_ms,
            driver,
        } => replay(config, &input, track.track_info(), frame_ms, driver, running)
            .expect("Error while replaying telemetry"),
        Commands::Records { track } => {
            records(&config, track.track_info()).expect("Error while reading lap records")
        }
        Commands::ResetBest { track, driver } => {
            reset_best(config, track.track_info(), driver).expect("Error while resetting best lap")
        }
    };
}
