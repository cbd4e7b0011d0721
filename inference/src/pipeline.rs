//! Multi-object orchestration loop
//!
//! One [`Tracker`] per initial box. The first frame initialises every tracker
//! and is written unannotated; every later frame updates the trackers in index
//! order and draws each object's box and label.

use crate::error::{Result, TrackingError};
use crate::image_utils::{annotate, generate_colors};
use crate::types::Color;
use image::RgbImage;
use log::{debug, info};
use siamtrack::{CenterBox, CornerBox, Tracker};
use std::time::{Duration, Instant};

/// Sequential source of frames
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Sequential destination for frames
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Lifecycle of one tracker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Tracking,
}

/// One tracked object and its tracker
pub struct TrackedObject<T> {
    pub tracker: T,
    pub initial_box: CornerBox,
    pub color: Color,
    pub label: String,
    pub state: TrackerState,
    /// Latest estimate and score, if updated at least once
    pub last_estimate: Option<(CenterBox, f32)>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub frames_processed: usize,
    pub objects: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives one tracker per object across a frame sequence
pub struct MultiObjectTracker<T: Tracker> {
    objects: Vec<TrackedObject<T>>,
    frames_processed: usize,
}

impl<T: Tracker> MultiObjectTracker<T> {
    /// Build one slot per initial box
    ///
    /// The palette is generated first, so an oversized object count fails
    /// before `factory` is called. `factory` receives the object index.
    pub fn new<F>(initial_boxes: &[CornerBox], mut factory: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<T>,
    {
        let colors = generate_colors(initial_boxes.len())?;

        let objects = initial_boxes
            .iter()
            .zip(colors)
            .enumerate()
            .map(|(index, (bbox, color))| {
                Ok(TrackedObject {
                    tracker: factory(index)?,
                    initial_box: *bbox,
                    color,
                    label: format!("object_{}", index),
                    state: TrackerState::Uninitialized,
                    last_estimate: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Created {} trackers", objects.len());
        Ok(Self {
            objects,
            frames_processed: 0,
        })
    }

    pub fn objects(&self) -> &[TrackedObject<T>] {
        &self.objects
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Initialise or update every tracker on `frame` and return the annotated copy
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        let mut canvas = frame.clone();

        for (index, object) in self.objects.iter_mut().enumerate() {
            match object.state {
                TrackerState::Uninitialized => {
                    object
                        .tracker
                        .init(frame, object.initial_box.to_ltwh())
                        .map_err(TrackingError::tracker)?;
                    object.state = TrackerState::Tracking;
                    debug!("{} initialised at {}", object.label, object.initial_box);
                }
                TrackerState::Tracking => {
                    let (bbox, score) = object.tracker.update(frame).map_err(|e| {
                        TrackingError::Tracker(format!("{} (object {}): {e:#}", object.label, index))
                    })?;
                    debug!("{} -> {} score {:.3}", object.label, bbox, score);

                    canvas = annotate(&canvas, &object.label, bbox.to_pixel_box(), object.color);
                    object.last_estimate = Some((bbox, score));
                }
            }
        }

        self.frames_processed += 1;
        Ok(canvas)
    }

    /// Process every frame of `source` into `sink`
    pub fn run<S, W>(&mut self, source: &mut S, sink: &mut W) -> Result<RunStats>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
    {
        let start = Instant::now();
        let mut written = 0usize;

        while let Some(frame) = source.next_frame()? {
            let canvas = self.process_frame(&frame)?;
            sink.write_frame(&canvas)?;
            written += 1;

            if written % 100 == 0 {
                debug!("Processed {} frames", written);
            }
        }

        info!("Finish Processing");
        info!("Exiting ...");

        let stats = RunStats {
            frames_processed: written,
            objects: self.objects.len(),
            elapsed: start.elapsed(),
        };
        info!(
            "Tracked {} objects over {} frames ({:.1} FPS)",
            stats.objects,
            stats.frames_processed,
            stats.fps()
        );
        Ok(stats)
    }
}
