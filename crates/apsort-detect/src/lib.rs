// apsort-detect/src/lib.rs
// ============================================================
// apsort-detect  –  apple freshness detection stage
// Runs the YOLO11 ONNX export of the trained checkpoint via
// Tract (pure-Rust, works on the Pi).
// ------------------------------------------------------------
// Pipeline: Array3<f32> (HWC) → Tensor (NCHW) → Vec<Detection>
// ------------------------------------------------------------
// Public API
//   * TractYolo::new(path, w, h)  – load & optimise ONNX
//   * Detector::detect(arr3)      – returns Vec<Detection>
//     where Detection { bbox, score, class }
// ============================================================

//! apple sorter – detection layer
//!
//! A backend-agnostic [`Detector`] trait plus the tract-backed
//! [`TractYolo`].  Input tensors come from `apsort-preprocess` (HWC, RGB,
//! f32 in [0,1]).  Output boxes are normalised corners so they can be drawn
//! on the original frame whatever its size.

use apsort_label::PixelBox;
use log::debug;
use ndarray::Array3;
use std::path::Path;
use thiserror::Error;
use tract_onnx::prelude::*;

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.7;
pub const MAX_DETECTIONS: usize = 300;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Model load or inference error: {0}")]
    Tract(#[from] TractError),
    #[error("Invalid input shape: expected [{expected_h}, {expected_w}, 3], got {got:?}")]
    InvalidInputShape { expected_h: usize, expected_w: usize, got: Vec<usize> },
    #[error("Invalid output shape: expected [1, 4+classes, anchors], got {0:?}")]
    InvalidOutputShape(Vec<usize>),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// A single detection: bounding box [x1,y1,x2,y2] in normalized coords plus score.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox:  [f32; 4],
    pub score: f32,
    pub class: usize,
}

impl Detection {
    /// Clamped pixel corners on a `width`×`height` frame.
    pub fn pixel_box(&self, width: u32, height: u32) -> PixelBox {
        PixelBox::from_corners(self.bbox, width, height)
    }
}

/// Trait for object detectors.
pub trait Detector {
    fn detect(&self, input: &Array3<f32>) -> Result<Vec<Detection>>;
}

/// Post-processing thresholds.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub confidence: f32,
    pub iou: f32,
    pub max_detections: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
            max_detections: MAX_DETECTIONS,
        }
    }
}

// ------------------------------------------------------------
// helpers: decode • IoU • NMS
// ------------------------------------------------------------

/// Decode a YOLO11 head laid out `[4 + classes][anchors]` (row-major, batch
/// dimension removed). Box rows are cx, cy, w, h in input pixels; class rows
/// are already sigmoid scores.
pub fn decode_predictions(
    preds: &[f32],
    num_attrs: usize,
    num_anchors: usize,
    input_w: f32,
    input_h: f32,
    confidence: f32,
) -> Vec<Detection> {
    let at = |attr: usize, anchor: usize| preds[attr * num_anchors + anchor];
    let mut dets = Vec::new();

    for a in 0..num_anchors {
        let (class, score) = (4..num_attrs)
            .map(|r| (r - 4, at(r, a)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < confidence {
            continue;
        }

        let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
        dets.push(Detection {
            bbox: [
                (cx - w / 2.0) / input_w,
                (cy - h / 2.0) / input_h,
                (cx + w / 2.0) / input_w,
                (cy + h / 2.0) / input_h,
            ],
            score,
            class,
        });
    }
    dets
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);
    let iw  = (ix2 - ix1).max(0.0);
    let ih  = (iy2 - iy1).max(0.0);
    let inter = iw * ih;
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter + 1e-6)
}

/// Class-aware NMS: boxes of different classes never suppress each other.
pub fn non_max_suppression(mut dets: Vec<Detection>, iou_thr: f32, max_det: usize) -> Vec<Detection> {
    dets.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::with_capacity(dets.len().min(max_det));

    'outer: for d in dets {
        for k in &keep {
            if k.class == d.class && iou(&d.bbox, &k.bbox) > iou_thr {
                continue 'outer;
            }
        }
        keep.push(d);
        if keep.len() >= max_det { break }
    }
    keep
}

/// Tract-powered YOLO11 detector.
pub struct TractYolo {
    model: RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>,
    input_w: usize,
    input_h: usize,
    thresholds: Thresholds,
}

impl TractYolo {
    /// Load and optimize the ONNX model for a fixed `input_w`×`input_h` input.
    pub fn new(model_path: &Path, input_w: usize, input_h: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec![1, 3, input_h, input_w]),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model, input_w, input_h, thresholds: Thresholds::default() })
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Detector for TractYolo {
    fn detect(&self, input: &Array3<f32>) -> Result<Vec<Detection>> {
        let shape = input.shape();
        if shape != [self.input_h, self.input_w, 3] {
            return Err(DetectError::InvalidInputShape {
                expected_h: self.input_h,
                expected_w: self.input_w,
                got: shape.to_vec(),
            });
        }

        // HWC → NCHW
        let (h, w) = (self.input_h, self.input_w);
        let nchw = tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            input[(y, x, c)]
        });
        let tensor: Tensor = nchw.into();

        let outputs = self.model.run(tvec![tensor.into()])?;
        let view = outputs[0].to_array_view::<f32>()?;
        let out_shape = view.shape().to_vec();
        if out_shape.len() != 3 || out_shape[0] != 1 || out_shape[1] < 5 {
            return Err(DetectError::InvalidOutputShape(out_shape));
        }
        debug!("output shape {:?}", out_shape);

        let flat: Vec<f32> = view.iter().copied().collect();
        let dets = decode_predictions(
            &flat,
            out_shape[1],
            out_shape[2],
            w as f32,
            h as f32,
            self.thresholds.confidence,
        );

        Ok(non_max_suppression(dets, self.thresholds.iou, self.thresholds.max_detections))
    }
}
