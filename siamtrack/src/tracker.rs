//! Capability traits shared by tracker implementations and network backends

use crate::bbox::{CenterBox, Ltwh};
use image::RgbImage;
use ndarray::Array4;

/// Single-object tracker driven one frame at a time
pub trait Tracker {
    /// Start tracking the object inside `bbox` on `frame`
    fn init(&mut self, frame: &RgbImage, bbox: Ltwh) -> anyhow::Result<()>;

    /// Estimate the object's box on the next frame
    ///
    /// Returns the center-form box and a confidence score. Fails when called before `init`.
    fn update(&mut self, frame: &RgbImage) -> anyhow::Result<(CenterBox, f32)>;
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn init(&mut self, frame: &RgbImage, bbox: Ltwh) -> anyhow::Result<()> {
        (**self).init(frame, bbox)
    }

    fn update(&mut self, frame: &RgbImage) -> anyhow::Result<(CenterBox, f32)> {
        (**self).update(frame)
    }
}

/// Raw heads produced by one forward pass
#[derive(Debug, Clone)]
pub struct NetworkOutput {
    /// `[1, 2K, S, S]` background/foreground logits
    pub cls: Array4<f32>,
    /// `[1, 4K, S, S]` dx, dy, dw, dh regression groups
    pub loc: Array4<f32>,
}

/// Siamese network forward pass over a template and a search crop
pub trait SiameseNetwork {
    fn forward(
        &mut self,
        template: &Array4<f32>,
        search: &Array4<f32>,
    ) -> anyhow::Result<NetworkOutput>;
}

impl<N: SiameseNetwork + ?Sized> SiameseNetwork for Box<N> {
    fn forward(
        &mut self,
        template: &Array4<f32>,
        search: &Array4<f32>,
    ) -> anyhow::Result<NetworkOutput> {
        (**self).forward(template, search)
    }
}
