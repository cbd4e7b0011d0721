//! Video file input and output

use crate::error::{Result, TrackingError};
use std::path::{Path, PathBuf};

#[cfg(feature = "opencv")]
pub use self::opencv_io::{VideoFileSink, VideoFileSource};

/// FPS used when the container reports none
pub const DEFAULT_FPS: f64 = 20.0;

/// Output path for an input video: `<out_dir>/res_<file name>`
pub fn output_path(video: &Path, out_dir: &Path) -> Result<PathBuf> {
    let name = video
        .file_name()
        .ok_or_else(|| TrackingError::video(format!("Not a video file path: {}", video.display())))?;
    Ok(out_dir.join(format!("res_{}", name.to_string_lossy())))
}

#[cfg(feature = "opencv")]
mod opencv_io {
    use super::DEFAULT_FPS;
    use crate::error::{Result, TrackingError};
    use crate::pipeline::{FrameSink, FrameSource};
    use image::RgbImage;
    use opencv::{
        core::{Mat, Size},
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture, VideoWriter, CAP_ANY},
    };
    use std::path::Path;

    fn path_str(path: &Path) -> Result<&str> {
        path.to_str()
            .ok_or_else(|| TrackingError::video(format!("Invalid path: {}", path.display())))
    }

    /// Sequential frame reader over a video file
    pub struct VideoFileSource {
        capture: VideoCapture,
        frame: Mat,
        fps: f64,
        width: i32,
        height: i32,
        frames_read: u64,
    }

    impl VideoFileSource {
        pub fn open(path: &Path) -> Result<Self> {
            let path_str = path_str(path)?;
            log::info!("Opening video source: {}", path_str);

            let capture = VideoCapture::from_file(path_str, CAP_ANY)
                .map_err(|e| TrackingError::video(format!("Failed to open video source: {}", e)))?;

            if !capture.is_opened().unwrap_or(false) {
                return Err(TrackingError::video(format!(
                    "Failed to open video capture: {}",
                    path_str
                )));
            }

            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0).round() as i32;
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0).round() as i32;
            let mut fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);

            if fps <= 0.0 {
                log::warn!(
                    "Video source returned invalid FPS ({}), defaulting to {:.1}",
                    fps,
                    DEFAULT_FPS
                );
                fps = DEFAULT_FPS;
            }

            log::info!("Video properties: {}x{} @ {:.2} FPS", width, height, fps);

            Ok(Self {
                capture,
                frame: Mat::default(),
                fps,
                width,
                height,
                frames_read: 0,
            })
        }

        pub fn fps(&self) -> f64 {
            self.fps
        }

        /// Frame size reported by the container
        pub fn frame_size(&self) -> (i32, i32) {
            (self.width, self.height)
        }

        fn to_rgb_image(&self) -> Result<RgbImage> {
            let width = self.frame.cols() as u32;
            let height = self.frame.rows() as u32;

            let mut rgb_mat = Mat::default();
            imgproc::cvt_color_def(&self.frame, &mut rgb_mat, imgproc::COLOR_BGR2RGB)?;

            let data = rgb_mat
                .data_bytes()
                .map_err(|e| TrackingError::video(format!("Failed to get image data: {}", e)))?
                .to_vec();

            RgbImage::from_vec(width, height, data)
                .ok_or_else(|| TrackingError::video("Failed to create RgbImage"))
        }
    }

    impl FrameSource for VideoFileSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            let read_success = self
                .capture
                .read(&mut self.frame)
                .map_err(|e| TrackingError::video(format!("Failed to read frame: {}", e)))?;

            if !read_success || self.frame.empty() {
                log::info!("End of video stream after {} frames", self.frames_read);
                return Ok(None);
            }

            self.frames_read += 1;
            if self.frames_read % 100 == 0 {
                log::debug!("Read {} frames", self.frames_read);
            }

            self.to_rgb_image().map(Some)
        }
    }

    /// XVID video writer
    pub struct VideoFileSink {
        writer: VideoWriter,
        width: i32,
        height: i32,
        frames_written: u64,
    }

    impl VideoFileSink {
        pub fn create(path: &Path, fps: f64, width: i32, height: i32) -> Result<Self> {
            let path_str = path_str(path)?;

            let fourcc = VideoWriter::fourcc('X', 'V', 'I', 'D')?;
            let writer = VideoWriter::new(path_str, fourcc, fps, Size::new(width, height), true)
                .map_err(|e| TrackingError::video(format!("Failed to create video writer: {}", e)))?;

            if !writer.is_opened()? {
                return Err(TrackingError::video(format!(
                    "Failed to open video writer: {}",
                    path_str
                )));
            }

            log::info!("Writing output to: {} ({}x{})", path_str, width, height);
            Ok(Self {
                writer,
                width,
                height,
                frames_written: 0,
            })
        }

        pub fn frames_written(&self) -> u64 {
            self.frames_written
        }

        /// Flush and close the output file
        pub fn finish(mut self) -> Result<()> {
            self.writer.release()?;
            log::info!("Wrote {} frames", self.frames_written);
            Ok(())
        }
    }

    impl FrameSink for VideoFileSink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
            let (width, height) = (frame.width() as i32, frame.height() as i32);
            if (width, height) != (self.width, self.height) {
                return Err(TrackingError::video(format!(
                    "Frame size {}x{} does not match output size {}x{}",
                    width, height, self.width, self.height
                )));
            }

            let data_slice = frame.as_raw();

            // The Mat borrows `frame`'s buffer and is dropped before it
            let mat = unsafe {
                Mat::new_rows_cols_with_data_unsafe(
                    height,
                    width,
                    opencv::core::CV_8UC3,
                    data_slice.as_ptr() as *mut _,
                    opencv::core::Mat_AUTO_STEP,
                )?
            };

            let mut bgr_mat = Mat::default();
            imgproc::cvt_color_def(&mat, &mut bgr_mat, imgproc::COLOR_RGB2BGR)?;

            self.writer.write(&bgr_mat)?;
            self.frames_written += 1;
            Ok(())
        }
    }
}
