//! Validation and batch prediction.
//!
//! `yolo val` prints a table with one summary row (`all`) and one row per
//! class:
//!
//! ```text
//!                  Class     Images  Instances      Box(P          R      mAP50  mAP50-95)
//!                    all         22         45      0.812      0.744      0.833      0.567
//!            rottenApple         15         30       0.85       0.70       0.81       0.55
//! ```

use crate::{py_bool, YoloCommand};
use anyhow::{anyhow, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvalConfig {
    pub weights: PathBuf,
    pub data: PathBuf,
    pub image_size: u32,
    pub batch: u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("runs/train/apple_yolo11n/weights/best.pt"),
            data: PathBuf::from("data.yaml"),
            image_size: 640,
            batch: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictConfig {
    pub weights: PathBuf,
    /// Image file or folder
    pub source: PathBuf,
    pub image_size: u32,
    pub confidence: f32,
    pub save: bool,
    pub project: PathBuf,
    pub name: String,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("runs/train/apple_yolo11n/weights/best.pt"),
            source: PathBuf::from("train/images"),
            image_size: 640,
            confidence: 0.25,
            save: true,
            project: PathBuf::from("runs/infer"),
            name: "apple_batch".to_string(),
        }
    }
}

impl PredictConfig {
    /// Predict with the checkpoint and input size that were just validated.
    pub fn with_checkpoint(mut self, eval: &EvalConfig) -> Self {
        self.weights = eval.weights.clone();
        self.image_size = eval.image_size;
        self
    }
}

/// One row of the validation table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassMetrics {
    pub class: String,
    pub images: u32,
    pub instances: u32,
    pub precision: f32,
    pub recall: f32,
    pub map50: f32,
    pub map50_95: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValMetrics {
    pub summary: ClassMetrics,
    pub per_class: Vec<ClassMetrics>,
}

impl ClassMetrics {
    fn parse_row(line: &str) -> Option<Self> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let [class, images, instances, p, r, m50, m5095] = cols.as_slice() else {
            return None;
        };
        Some(Self {
            class: class.to_string(),
            images: images.parse().ok()?,
            instances: instances.parse().ok()?,
            precision: p.parse().ok()?,
            recall: r.parse().ok()?,
            map50: m50.parse().ok()?,
            map50_95: m5095.parse().ok()?,
        })
    }
}

impl ValMetrics {
    /// Parse the last table in the output. Rows before the final `all` row
    /// belong to an earlier table (e.g. the end-of-training validation).
    pub fn parse(output: &str) -> Option<Self> {
        let rows: Vec<ClassMetrics> = output.lines().filter_map(ClassMetrics::parse_row).collect();
        let start = rows.iter().rposition(|r| r.class == "all")?;
        let mut rows = rows.into_iter().skip(start);
        let summary = rows.next()?;
        Some(Self {
            summary,
            per_class: rows.take_while(|r| r.class != "all").collect(),
        })
    }
}

pub struct Evaluator;

impl Evaluator {
    pub(crate) fn val_command(config: &EvalConfig) -> YoloCommand {
        YoloCommand::new("val")
            .arg("model", config.weights.display())
            .arg("data", config.data.display())
            .arg("imgsz", config.image_size)
            .arg("batch", config.batch)
    }

    pub(crate) fn predict_command(config: &PredictConfig) -> YoloCommand {
        YoloCommand::new("predict")
            .arg("model", config.weights.display())
            .arg("source", config.source.display())
            .arg("imgsz", config.image_size)
            .arg("conf", config.confidence)
            .arg("save", py_bool(config.save))
            .arg("project", config.project.display())
            .arg("name", &config.name)
            .arg("exist_ok", py_bool(true))
    }

    /// Evaluate on the dataset's validation split.
    pub async fn validate(config: &EvalConfig) -> Result<ValMetrics> {
        info!("▶ Validating {}", config.weights.display());
        let out = Self::val_command(config).run().await?;
        ValMetrics::parse(&out.combined())
            .ok_or_else(|| anyhow!("no metrics table found in yolo val output"))
    }

    /// Predict over a file or folder; returns the directory annotated images go to.
    pub async fn predict(config: &PredictConfig) -> Result<PathBuf> {
        info!("▶ Predicting on {}", config.source.display());
        Self::predict_command(config).run().await?;
        Ok(config.project.join(&config.name))
    }
}
