use std::{
    error::Error,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use aruco_localizer::map::MarkerMap;
use aruco_localizer::{
    replay_session, FanoutSink, FramePipeline, FrameSink, ImageDirSink, JsonLinesSink,
    LocalizerConfig, Session, DEFAULT_MARKER_SIZE,
};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Localize a camera against a marker map by replaying a recorded session.
#[derive(Debug, Parser)]
#[command(author, version, about = "Marker-map camera localizer")]
struct Args {
    /// Marker map JSON.
    #[arg(long)]
    map: PathBuf,

    /// Recorded session JSON (camera info, image path and detections per frame).
    #[arg(long)]
    session: PathBuf,

    /// Optional LocalizerConfig JSON. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Edge length of the map's first marker in meters. Overrides the config.
    #[arg(long)]
    marker_size: Option<f64>,

    /// Write annotated frames into this directory (enables annotation).
    #[arg(long)]
    annotate_dir: Option<PathBuf>,

    /// JSON-lines output file for transforms and estimates. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    aruco_localizer::core::init_with_level(args.log_level.into())?;

    let mut config = match &args.config {
        Some(path) => LocalizerConfig::load_json(path)?,
        None => LocalizerConfig::default(),
    };
    if let Some(size) = args.marker_size {
        config.marker_size = size;
    }
    if args.annotate_dir.is_some() {
        config.annotate = true;
    }
    log::debug!(
        "marker size {} m (default {DEFAULT_MARKER_SIZE} m)",
        config.marker_size
    );

    let map = MarkerMap::load_json(&args.map)?;
    let session = Session::load_json(&args.session)?;
    let base_dir = args
        .session
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let out: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let mut fanout = FanoutSink::default();
    fanout.push(Arc::new(JsonLinesSink::new(out)));
    if let Some(dir) = &args.annotate_dir {
        fanout.push(Arc::new(ImageDirSink::new(dir)?));
    }
    let sink: Arc<dyn FrameSink> = Arc::new(fanout);

    let pipeline = FramePipeline::new(map, config, Arc::new(session.detector()), sink)?;
    let summary = replay_session(&pipeline, &session, base_dir);
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
