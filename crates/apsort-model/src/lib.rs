//! # apsort-model
//!
//! A wrapper around the ultralytics `yolo` CLI and the TensorFlow Lite converter
//! for producing the apple freshness detector.
//!
//! ## Features
//!
//! - Train a YOLO11 nano checkpoint on a YOLO-format dataset
//! - Validate a checkpoint and parse the reported precision/recall/mAP
//! - Batch prediction with annotated images saved to disk
//! - Export to TFLite (optionally INT8) or ONNX
//! - Full-integer INT8 quantization with a representative dataset built in Rust

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::de::DeserializeOwned;
use std::{
    fmt::Display,
    path::Path,
};
use tokio::process::Command;

pub mod evaluate;
pub mod export;
pub mod quantize;
pub mod train;

pub use evaluate::{ClassMetrics, EvalConfig, Evaluator, PredictConfig, ValMetrics};
pub use export::{ExportConfig, ExportFormat, ExportResult, Exporter};
pub use quantize::{QuantizeConfig, Quantizer};
pub use train::{TrainConfig, TrainResult, Trainer};

/// Captured output of a finished CLI run.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CliOutput {
    /// stdout followed by stderr; ultralytics logs to either depending on version.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// One `yolo <mode> key=value ...` invocation.
#[derive(Debug, Clone)]
pub struct YoloCommand {
    mode: &'static str,
    args: Vec<(String, String)>,
}

impl YoloCommand {
    pub fn new(mode: &'static str) -> Self {
        Self {
            mode,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: &str, value: impl Display) -> Self {
        self.args.push((key.to_string(), value.to_string()));
        self
    }

    /// Arguments as passed to the process, mode first.
    pub fn to_args(&self) -> Vec<String> {
        std::iter::once(self.mode.to_string())
            .chain(self.args.iter().map(|(k, v)| format!("{k}={v}")))
            .collect()
    }

    /// Run to completion, failing with stderr on a non-zero exit.
    pub async fn run(&self) -> Result<CliOutput> {
        let args = self.to_args();
        info!("▶ yolo {}", args.join(" "));

        let mut cmd = Command::new("yolo");
        cmd.args(&args);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute yolo {} command", self.mode))?;

        let out = CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("yolo {} stdout:\n{}", self.mode, out.stdout);

        if !output.status.success() {
            return Err(anyhow!("yolo {} failed: {}", self.mode, out.stderr));
        }
        Ok(out)
    }
}

/// Python literal for a bool, as the ultralytics CLI expects.
pub(crate) fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Utility function to check if ultralytics CLI is available
pub async fn check_ultralytics_available() -> Result<bool> {
    let output = Command::new("yolo")
        .arg("--help")
        .output()
        .await;

    match output {
        Ok(output) => Ok(output.status.success()),
        Err(_) => Ok(false),
    }
}

/// Utility function to validate ONNX model
pub fn validate_onnx_model(model_path: &Path) -> Result<()> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(model_path)?;

    // Basic validation - check if we can create a session
    drop(session);
    Ok(())
}

/// Check the TFLite flatbuffer file identifier (`TFL3` at offset 4).
pub fn validate_tflite_model(model_path: &Path) -> Result<()> {
    let bytes = std::fs::read(model_path)
        .with_context(|| format!("Failed to read {}", model_path.display()))?;
    if bytes.len() < 8 || &bytes[4..8] != b"TFL3" {
        return Err(anyhow!("{} is not a TFLite model", model_path.display()));
    }
    Ok(())
}

/// Load any task configuration from a JSON file.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_command_args_order() {
        let cmd = YoloCommand::new("train")
            .arg("data", "data.yaml")
            .arg("epochs", 50)
            .arg("exist_ok", py_bool(true));
        assert_eq!(
            cmd.to_args(),
            vec!["train", "data=data.yaml", "epochs=50", "exist_ok=True"]
        );
    }

    #[test]
    fn test_tflite_identifier_check() {
        let temp_dir = tempdir().unwrap();
        let good = temp_dir.path().join("good.tflite");
        let bad = temp_dir.path().join("bad.tflite");
        std::fs::write(&good, b"\x1c\x00\x00\x00TFL3\x00\x00").unwrap();
        std::fs::write(&bad, b"PK\x03\x04").unwrap();

        assert!(validate_tflite_model(&good).is_ok());
        assert!(validate_tflite_model(&bad).is_err());
        assert!(validate_tflite_model(&temp_dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_ultralytics_check() {
        // This test will pass if ultralytics is installed, otherwise it will return false
        let available = check_ultralytics_available().await.unwrap();
        println!("Ultralytics available: {}", available);
    }
}
