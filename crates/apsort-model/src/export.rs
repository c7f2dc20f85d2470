//! Model export via `yolo export`
//!
//! ultralytics writes TFLite artifacts into `<stem>_saved_model/` next to the
//! weights and ONNX artifacts as `<stem>.onnx` beside them.

use crate::{py_bool, validate_onnx_model, validate_tflite_model, YoloCommand};
use anyhow::{anyhow, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Tflite,
    Onnx,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Tflite => "tflite",
            ExportFormat::Onnx => "onnx",
        }
    }
}

/// Configuration for model export operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub weights: PathBuf,
    pub format: ExportFormat,
    /// INT8 quantization; calibrated on `data`
    pub int8: bool,
    pub data: PathBuf,
    pub image_size: u32,
    pub batch: u32,
    /// Share of the dataset used for calibration
    pub fraction: f32,
    pub device: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("best.pt"),
            format: ExportFormat::Tflite,
            int8: true,
            data: PathBuf::from("data.yaml"),
            image_size: 320,
            batch: 1,
            fraction: 0.1,
            device: "cuda:0".to_string(),
        }
    }
}

/// Model export result
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub model_path: PathBuf,
    pub format: ExportFormat,
    /// Model input shape (NHWC for TFLite, NCHW for ONNX)
    pub input_shape: Vec<i64>,
}

pub struct Exporter<'a> {
    config: &'a ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    pub(crate) fn command(&self) -> YoloCommand {
        let c = self.config;
        let mut cmd = YoloCommand::new("export")
            .arg("model", c.weights.display())
            .arg("format", c.format.as_str())
            .arg("imgsz", c.image_size)
            .arg("batch", c.batch)
            .arg("device", &c.device);
        if c.int8 {
            cmd = cmd
                .arg("int8", py_bool(true))
                .arg("data", c.data.display())
                .arg("fraction", c.fraction);
        }
        cmd
    }

    pub async fn export(&self) -> Result<ExportResult> {
        info!(
            "▶ Exporting {} to {} ({}px, int8={})",
            self.config.weights.display(),
            self.config.format.as_str(),
            self.config.image_size,
            self.config.int8
        );
        self.command().run().await?;

        let model_path = self.find_exported_model()?;
        match self.config.format {
            ExportFormat::Tflite => validate_tflite_model(&model_path)?,
            ExportFormat::Onnx => validate_onnx_model(&model_path)?,
        }
        info!("✓ Exported {}", model_path.display());

        let (b, s) = (self.config.batch as i64, self.config.image_size as i64);
        Ok(ExportResult {
            model_path,
            format: self.config.format,
            input_shape: match self.config.format {
                ExportFormat::Tflite => vec![b, s, s, 3],
                ExportFormat::Onnx => vec![b, 3, s, s],
            },
        })
    }

    /// Find the exported artifact, preferring the requested precision
    pub(crate) fn find_exported_model(&self) -> Result<PathBuf> {
        let weights = &self.config.weights;
        let dir = weights.parent().unwrap_or_else(|| Path::new("."));
        let stem = weights
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let candidates: Vec<PathBuf> = match self.config.format {
            ExportFormat::Onnx => vec![dir.join(format!("{stem}.onnx"))],
            ExportFormat::Tflite => {
                let saved = dir.join(format!("{stem}_saved_model"));
                let mut names = vec![
                    format!("{stem}_float32.tflite"),
                    format!("{stem}_float16.tflite"),
                ];
                if self.config.int8 {
                    names.insert(0, format!("{stem}_full_integer_quant.tflite"));
                    names.insert(0, format!("{stem}_int8.tflite"));
                }
                names.into_iter().map(|n| saved.join(n)).collect()
            }
        };

        if let Some(found) = candidates.iter().find(|c| c.exists()) {
            return Ok(found.clone());
        }

        // If not found in standard locations, use glob to search
        if self.config.format == ExportFormat::Tflite {
            let pattern = dir.join(format!("{stem}_saved_model/*.tflite"));
            if let Some(path) = glob::glob(&pattern.to_string_lossy())?
                .flatten()
                .find(|p| p.exists())
            {
                return Ok(path);
            }
        }

        Err(anyhow!(
            "Could not find exported model in any of the expected locations: {:?}",
            candidates
        ))
    }
}
