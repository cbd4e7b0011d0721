//! SiamRPN tracker: exemplar setup, proposal decoding and target state smoothing

use crate::anchors::{cosine_window, generate_anchors};
use crate::bbox::{CenterBox, Ltwh};
use crate::crop::{channel_mean, subwindow};
use crate::tracker::{NetworkOutput, SiameseNetwork, Tracker};
use anyhow::{bail, ensure, Context};
use image::RgbImage;
use log::{debug, trace};
use ndarray::{Array1, Array2, Array4};
use serde::{Deserialize, Serialize};

/// Tracker hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiamRpnParams {
    /// Side of the exemplar (template) crop fed to the network
    pub exemplar_size: u32,
    /// Side of the search crop fed to the network
    pub instance_size: u32,
    pub total_stride: u32,
    pub context_amount: f32,
    pub ratios: Vec<f32>,
    pub scales: Vec<f32>,
    pub penalty_k: f32,
    pub window_influence: f32,
    /// Size smoothing rate, scaled by the proposal's penalised score
    pub lr: f32,
    /// Smallest box side kept after clipping, in pixels
    pub min_size: f32,
}

impl Default for SiamRpnParams {
    fn default() -> Self {
        Self {
            exemplar_size: 127,
            instance_size: 271,
            total_stride: 8,
            context_amount: 0.5,
            ratios: vec![0.33, 0.5, 1.0, 2.0, 3.0],
            scales: vec![8.0],
            penalty_k: 0.055,
            window_influence: 0.42,
            lr: 0.295,
            min_size: 10.0,
        }
    }
}

impl SiamRpnParams {
    /// Side of the score map `S`
    pub fn score_size(&self) -> usize {
        ((self.instance_size - self.exemplar_size) / self.total_stride + 1) as usize
    }

    /// Anchor shapes per grid cell `K`
    pub fn anchor_num(&self) -> usize {
        self.ratios.len() * self.scales.len()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.exemplar_size > 0, "exemplar_size must be positive");
        ensure!(
            self.instance_size > self.exemplar_size,
            "instance_size ({}) must exceed exemplar_size ({})",
            self.instance_size,
            self.exemplar_size
        );
        ensure!(self.total_stride > 0, "total_stride must be positive");
        ensure!(
            !self.ratios.is_empty() && !self.scales.is_empty(),
            "at least one anchor ratio and scale are required"
        );
        ensure!(
            self.ratios.iter().chain(self.scales.iter()).all(|v| *v > 0.0),
            "anchor ratios and scales must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&self.window_influence),
            "window_influence must be within [0, 1], got {}",
            self.window_influence
        );
        Ok(())
    }
}

/// Best proposal from one forward pass, in search crop coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    /// Flattened anchor index `k * S^2 + i * S + j`
    pub index: usize,
    /// Offset of the proposal centre from the search crop centre
    pub offset: (f32, f32),
    pub size: (f32, f32),
    /// Foreground probability
    pub score: f32,
    pub penalty: f32,
}

fn change(r: f32) -> f32 {
    r.max(1.0 / r)
}

fn padded_size(w: f32, h: f32) -> f32 {
    let pad = (w + h) * 0.5;
    ((w + pad) * (h + pad)).sqrt()
}

/// Decode every anchor and pick the proposal with the highest penalised score
///
/// `target_sz` is the current target size scaled into search crop coordinates.
pub fn decode_proposals(
    output: &NetworkOutput,
    anchors: &Array2<f32>,
    window: &Array1<f32>,
    target_sz: (f32, f32),
    params: &SiamRpnParams,
) -> anyhow::Result<Proposal> {
    let k = params.anchor_num();
    let s = params.score_size();
    let cells = s * s;

    ensure!(
        output.cls.shape() == [1, 2 * k, s, s],
        "unexpected cls output shape {:?}, expected [1, {}, {s}, {s}]",
        output.cls.shape(),
        2 * k
    );
    ensure!(
        output.loc.shape() == [1, 4 * k, s, s],
        "unexpected loc output shape {:?}, expected [1, {}, {s}, {s}]",
        output.loc.shape(),
        4 * k
    );
    ensure!(
        anchors.nrows() == k * cells && window.len() == k * cells,
        "anchor grid does not match the score map"
    );

    let target_scale = padded_size(target_sz.0, target_sz.1);
    let target_ratio = target_sz.0 / target_sz.1;
    let wi = params.window_influence;

    let mut best: Option<(f32, Proposal)> = None;
    for a in 0..k {
        for i in 0..s {
            for j in 0..s {
                let index = a * cells + i * s + j;
                let (ax, ay, aw, ah) = (
                    anchors[[index, 0]],
                    anchors[[index, 1]],
                    anchors[[index, 2]],
                    anchors[[index, 3]],
                );

                let dx = output.loc[[0, a, i, j]];
                let dy = output.loc[[0, k + a, i, j]];
                let dw = output.loc[[0, 2 * k + a, i, j]];
                let dh = output.loc[[0, 3 * k + a, i, j]];

                let x = dx * aw + ax;
                let y = dy * ah + ay;
                let w = dw.exp() * aw;
                let h = dh.exp() * ah;

                let bg = output.cls[[0, a, i, j]];
                let fg = output.cls[[0, k + a, i, j]];
                let score = 1.0 / (1.0 + (bg - fg).exp());

                let s_c = change(padded_size(w, h) / target_scale);
                let r_c = change(target_ratio / (w / h));
                let penalty = (-(r_c * s_c - 1.0) * params.penalty_k).exp();
                let pscore = penalty * score * (1.0 - wi) + window[index] * wi;

                if best.as_ref().map_or(true, |(p, _)| pscore > *p) {
                    best = Some((
                        pscore,
                        Proposal {
                            index,
                            offset: (x, y),
                            size: (w, h),
                            score,
                            penalty,
                        },
                    ));
                }
            }
        }
    }

    match best {
        Some((_, proposal)) => Ok(proposal),
        None => bail!("score map is empty"),
    }
}

struct TargetState {
    center: (f32, f32),
    size: (f32, f32),
    template: Array4<f32>,
    avg: [u8; 3],
}

/// SiamRPN single-object tracker over any [`SiameseNetwork`] backend
pub struct SiamRpnTracker<N: SiameseNetwork> {
    net: N,
    params: SiamRpnParams,
    anchors: Array2<f32>,
    window: Array1<f32>,
    state: Option<TargetState>,
}

impl<N: SiameseNetwork> SiamRpnTracker<N> {
    pub fn new(net: N, params: SiamRpnParams) -> anyhow::Result<Self> {
        params.validate().context("invalid SiamRPN parameters")?;

        let score_size = params.score_size();
        let anchors = generate_anchors(
            params.total_stride,
            &params.scales,
            &params.ratios,
            score_size,
        );
        let window = cosine_window(score_size, params.anchor_num());

        Ok(Self {
            net,
            params,
            anchors,
            window,
            state: None,
        })
    }

    pub fn params(&self) -> &SiamRpnParams {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Current target estimate, if initialised
    pub fn target(&self) -> Option<CenterBox> {
        self.state
            .as_ref()
            .map(|s| CenterBox::new(s.center.0, s.center.1, s.size.0, s.size.1))
    }

    fn exemplar_side(&self, size: (f32, f32)) -> f32 {
        let context = self.params.context_amount * (size.0 + size.1);
        ((size.0 + context) * (size.1 + context)).sqrt()
    }
}

impl<N: SiameseNetwork> Tracker for SiamRpnTracker<N> {
    fn init(&mut self, frame: &RgbImage, bbox: Ltwh) -> anyhow::Result<()> {
        ensure!(
            bbox.width > 0.0 && bbox.height > 0.0,
            "initial box must have a positive size, got {}x{}",
            bbox.width,
            bbox.height
        );

        let center = bbox.to_center();
        let avg = channel_mean(frame);
        let s_z = self.exemplar_side((bbox.width, bbox.height)).round();
        let template = subwindow(
            frame,
            (center.cx, center.cy),
            self.params.exemplar_size,
            s_z,
            avg,
        );

        debug!(
            "SiamRPN init at ({:.1}, {:.1}) size {:.1}x{:.1}, exemplar side {}",
            center.cx, center.cy, bbox.width, bbox.height, s_z
        );

        self.state = Some(TargetState {
            center: (center.cx, center.cy),
            size: (bbox.width, bbox.height),
            template,
            avg,
        });
        Ok(())
    }

    fn update(&mut self, frame: &RgbImage) -> anyhow::Result<(CenterBox, f32)> {
        let Some(state) = self.state.as_mut() else {
            bail!("tracker updated before init");
        };
        let params = &self.params;

        let context = params.context_amount * (state.size.0 + state.size.1);
        let s_z = ((state.size.0 + context) * (state.size.1 + context)).sqrt();
        let scale_z = params.exemplar_size as f32 / s_z;
        let s_x = s_z + (params.instance_size - params.exemplar_size) as f32 / scale_z;

        let search = subwindow(
            frame,
            state.center,
            params.instance_size,
            s_x.round(),
            state.avg,
        );
        let output = self
            .net
            .forward(&state.template, &search)
            .context("network forward pass failed")?;

        let scaled_sz = (state.size.0 * scale_z, state.size.1 * scale_z);
        let best = decode_proposals(&output, &self.anchors, &self.window, scaled_sz, params)?;

        let lr = best.penalty * best.score * params.lr;
        let cx = state.center.0 + best.offset.0 / scale_z;
        let cy = state.center.1 + best.offset.1 / scale_z;
        let w = state.size.0 * (1.0 - lr) + best.size.0 / scale_z * lr;
        let h = state.size.1 * (1.0 - lr) + best.size.1 / scale_z * lr;

        let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);
        state.center = (cx.clamp(0.0, frame_w), cy.clamp(0.0, frame_h));
        state.size = (
            w.max(params.min_size).min(frame_w),
            h.max(params.min_size).min(frame_h),
        );

        trace!(
            "best anchor {} score {:.3} penalty {:.3}",
            best.index,
            best.score,
            best.penalty
        );

        Ok((
            CenterBox::new(state.center.0, state.center.1, state.size.0, state.size.1),
            best.score,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    /// Network returning a fixed response with one strong foreground anchor
    struct FixedNetwork {
        output: NetworkOutput,
        calls: usize,
        last_shapes: Option<(Vec<usize>, Vec<usize>)>,
    }

    impl FixedNetwork {
        fn peaked(params: &SiamRpnParams, anchor: usize, i: usize, j: usize, dx: f32, dy: f32) -> Self {
            let k = params.anchor_num();
            let s = params.score_size();
            let mut cls = Array4::<f32>::zeros((1, 2 * k, s, s));
            let mut loc = Array4::<f32>::zeros((1, 4 * k, s, s));
            cls[[0, k + anchor, i, j]] = 10.0;
            loc[[0, anchor, i, j]] = dx;
            loc[[0, k + anchor, i, j]] = dy;
            Self {
                output: NetworkOutput { cls, loc },
                calls: 0,
                last_shapes: None,
            }
        }
    }

    impl SiameseNetwork for FixedNetwork {
        fn forward(
            &mut self,
            template: &Array4<f32>,
            search: &Array4<f32>,
        ) -> anyhow::Result<NetworkOutput> {
            self.calls += 1;
            self.last_shapes = Some((template.shape().to_vec(), search.shape().to_vec()));
            Ok(self.output.clone())
        }
    }

    struct FailingNetwork;

    impl SiameseNetwork for FailingNetwork {
        fn forward(&mut self, _: &Array4<f32>, _: &Array4<f32>) -> anyhow::Result<NetworkOutput> {
            bail!("device lost")
        }
    }

    fn center_index(params: &SiamRpnParams, anchor: usize) -> usize {
        let s = params.score_size();
        anchor * s * s + (s / 2) * s + s / 2
    }

    #[test]
    fn test_default_params() {
        let params = SiamRpnParams::default();
        assert_eq!(params.score_size(), 19);
        assert_eq!(params.anchor_num(), 5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = SiamRpnParams {
            instance_size: 100,
            ..Default::default()
        };
        assert!(SiamRpnTracker::new(FailingNetwork, params).is_err());

        let params = SiamRpnParams {
            ratios: vec![],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_partial_json() {
        let params: SiamRpnParams = serde_json::from_str(r#"{"lr": 0.5}"#).unwrap();
        assert_abs_diff_eq!(params.lr, 0.5);
        assert_eq!(params.exemplar_size, 127);
    }

    #[test]
    fn test_decode_picks_strongest_anchor() {
        let params = SiamRpnParams::default();
        let s = params.score_size();
        let net = FixedNetwork::peaked(&params, 2, s / 2, s / 2, 0.5, -0.25);
        let anchors = generate_anchors(params.total_stride, &params.scales, &params.ratios, s);
        let window = cosine_window(s, params.anchor_num());

        let best = decode_proposals(&net.output, &anchors, &window, (64.0, 64.0), &params).unwrap();

        assert_eq!(best.index, center_index(&params, 2));
        // ratio 1 anchor is 64x64 centred on the origin
        assert_abs_diff_eq!(best.offset.0, 32.0, epsilon = 1e-4);
        assert_abs_diff_eq!(best.offset.1, -16.0, epsilon = 1e-4);
        assert_abs_diff_eq!(best.size.0, 64.0, epsilon = 1e-4);
        assert_abs_diff_eq!(best.penalty, 1.0, epsilon = 1e-4);
        assert!(best.score > 0.99);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let params = SiamRpnParams::default();
        let s = params.score_size();
        let anchors = generate_anchors(params.total_stride, &params.scales, &params.ratios, s);
        let window = cosine_window(s, params.anchor_num());
        let output = NetworkOutput {
            cls: Array4::zeros((1, 2, s, s)),
            loc: Array4::zeros((1, 20, s, s)),
        };
        assert!(decode_proposals(&output, &anchors, &window, (64.0, 64.0), &params).is_err());
    }

    #[test]
    fn test_update_before_init_fails() {
        let mut tracker = SiamRpnTracker::new(FailingNetwork, SiamRpnParams::default()).unwrap();
        let frame = RgbImage::new(64, 64);
        assert!(!tracker.is_initialized());
        assert!(tracker.update(&frame).is_err());
    }

    #[test]
    fn test_init_rejects_empty_box() {
        let mut tracker = SiamRpnTracker::new(FailingNetwork, SiamRpnParams::default()).unwrap();
        let frame = RgbImage::new(64, 64);
        assert!(tracker.init(&frame, Ltwh::new(10.0, 10.0, 0.0, 5.0)).is_err());
    }

    #[test]
    fn test_update_moves_toward_best_proposal() {
        let params = SiamRpnParams::default();
        let s = params.score_size();
        let net = FixedNetwork::peaked(&params, 2, s / 2, s / 2, 0.5, 0.0);
        let mut tracker = SiamRpnTracker::new(net, params).unwrap();
        let frame = RgbImage::from_pixel(200, 200, Rgb([90, 90, 90]));

        tracker.init(&frame, Ltwh::new(80.0, 80.0, 40.0, 40.0)).unwrap();
        let (bbox, score) = tracker.update(&frame).unwrap();

        // s_z = 80, scale_z = 127 / 80; offset 32 in crop space -> 20.16 px
        assert_abs_diff_eq!(bbox.cx, 100.0 + 32.0 * 80.0 / 127.0, epsilon = 0.05);
        assert_abs_diff_eq!(bbox.cy, 100.0, epsilon = 0.05);
        assert!(bbox.width > 40.0 && bbox.width < 40.5);
        assert!(score > 0.99);

        assert_eq!(tracker.net.calls, 1);
        let (template, search) = tracker.net.last_shapes.clone().unwrap();
        assert_eq!(template, vec![1, 3, 127, 127]);
        assert_eq!(search, vec![1, 3, 271, 271]);
    }

    #[test]
    fn test_update_clips_to_frame() {
        let params = SiamRpnParams {
            window_influence: 0.0,
            ..Default::default()
        };
        let s = params.score_size();
        // strongest proposal at the right edge of the crop
        let net = FixedNetwork::peaked(&params, 2, s / 2, s - 1, 0.0, 0.0);
        let mut tracker = SiamRpnTracker::new(net, params).unwrap();
        let frame = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));

        tracker.init(&frame, Ltwh::new(85.0, 40.0, 10.0, 10.0)).unwrap();
        let (bbox, _) = tracker.update(&frame).unwrap();

        assert_abs_diff_eq!(bbox.cx, 100.0);
        assert_abs_diff_eq!(bbox.cy, 45.0, epsilon = 1e-3);
        assert!(bbox.width >= 10.0);
        assert!(bbox.height >= 10.0);
    }

    #[test]
    fn test_network_failure_propagates() {
        let mut tracker = SiamRpnTracker::new(FailingNetwork, SiamRpnParams::default()).unwrap();
        let frame = RgbImage::new(64, 64);
        tracker.init(&frame, Ltwh::new(10.0, 10.0, 20.0, 20.0)).unwrap();
        let err = tracker.update(&frame).unwrap_err();
        assert!(format!("{err:#}").contains("device lost"));
    }

    #[test]
    fn test_reinit_restarts() {
        let params = SiamRpnParams::default();
        let s = params.score_size();
        let net = FixedNetwork::peaked(&params, 2, s / 2, s / 2, 0.0, 0.0);
        let mut tracker = SiamRpnTracker::new(net, params).unwrap();
        let frame = RgbImage::new(120, 120);

        tracker.init(&frame, Ltwh::new(10.0, 10.0, 20.0, 20.0)).unwrap();
        tracker.init(&frame, Ltwh::new(50.0, 50.0, 30.0, 30.0)).unwrap();
        assert_eq!(tracker.target(), Some(CenterBox::new(65.0, 65.0, 30.0, 30.0)));
    }
}
