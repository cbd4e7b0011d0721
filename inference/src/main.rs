//! SiamRPN multi-object video tracking CLI
//!
//! Usage:
//!   siamrpn-track <MODEL> <VIDEO> "[[left, top, right, bottom], ...]"
//!
//! Writes `res_<video file name>` to the output directory (default `.`).

use clap::Parser;
use siamrpn_video_tracker::cli::{parse_init_boxes, Args};
use siamrpn_video_tracker::tracker_backend::create_tracker;
use siamrpn_video_tracker::video_utils::{output_path, VideoFileSink, VideoFileSource};
use siamrpn_video_tracker::{MultiObjectTracker, Result, TrackerConfig};

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    if args.cpu {
        config.use_gpu = false;
    }

    let boxes = parse_init_boxes(&args.init_boxes)?;
    log::info!("Tracking {} objects", boxes.len());

    let mut tracker = MultiObjectTracker::new(&boxes, |_| create_tracker(&args.model, &config))?;

    let mut source = VideoFileSource::open(&args.video)?;
    let (width, height) = source.frame_size();
    let out_path = output_path(&args.video, &args.output_dir)?;
    let mut sink = VideoFileSink::create(&out_path, source.fps(), width, height)?;

    tracker.run(&mut source, &mut sink)?;
    sink.finish()?;

    log::info!("Output written to {}", out_path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("siamrpn-track v{}", siamrpn_video_tracker::version());

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
