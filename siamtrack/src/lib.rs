//! Pure Rust SiamRPN single-object tracking core
//!
//! This crate holds everything the tracker needs apart from the network
//! forward pass: box geometry, anchor and cosine window generation,
//! exemplar/search cropping and proposal decoding. The network itself sits
//! behind the [`SiameseNetwork`] trait so any backend can drive it.
//!
//! ```rust,ignore
//! use siamtrack::{Ltwh, SiamRpnParams, SiamRpnTracker, Tracker};
//!
//! let mut tracker = SiamRpnTracker::new(network, SiamRpnParams::default())?;
//! tracker.init(&first_frame, Ltwh::new(10.0, 10.0, 40.0, 40.0))?;
//! let (bbox, score) = tracker.update(&next_frame)?;
//! ```

pub mod anchors;
pub mod bbox;
pub mod crop;
pub mod siamrpn;
pub mod tracker;

pub use bbox::{CenterBox, CornerBox, Ltwh, PixelBox};
pub use siamrpn::{decode_proposals, Proposal, SiamRpnParams, SiamRpnTracker};
pub use tracker::{NetworkOutput, SiameseNetwork, Tracker};
