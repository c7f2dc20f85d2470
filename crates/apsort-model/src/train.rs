//! Training via `yolo train`.

use crate::{py_bool, YoloCommand};
use anyhow::{anyhow, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    /// Pretrained weights to start from
    pub weights: PathBuf,
    /// Dataset descriptor (`data.yaml`)
    pub data: PathBuf,
    pub epochs: u32,
    pub image_size: u32,
    pub batch: u32,
    /// Run name; outputs go to `<project>/<name>`
    pub name: String,
    pub device: String,
    pub project: PathBuf,
    /// Reuse the run directory if it already exists
    pub exist_ok: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("yolo11n.pt"),
            data: PathBuf::from("data.yaml"),
            epochs: 50,
            image_size: 640,
            batch: 16,
            name: "apple_yolo11n".to_string(),
            device: "0".to_string(),
            project: PathBuf::from("runs/train"),
            exist_ok: true,
        }
    }
}

impl TrainConfig {
    pub fn run_dir(&self) -> PathBuf {
        self.project.join(&self.name)
    }
}

/// Paths produced by a finished run
#[derive(Debug, Clone)]
pub struct TrainResult {
    pub run_dir: PathBuf,
    pub best_weights: PathBuf,
    pub last_weights: PathBuf,
}

pub struct Trainer<'a> {
    config: &'a TrainConfig,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a TrainConfig) -> Self {
        Self { config }
    }

    pub(crate) fn command(&self) -> YoloCommand {
        let c = self.config;
        YoloCommand::new("train")
            .arg("model", c.weights.display())
            .arg("data", c.data.display())
            .arg("imgsz", c.image_size)
            .arg("epochs", c.epochs)
            .arg("batch", c.batch)
            .arg("name", &c.name)
            .arg("device", &c.device)
            .arg("project", c.project.display())
            .arg("exist_ok", py_bool(c.exist_ok))
    }

    pub async fn train(&self) -> Result<TrainResult> {
        info!(
            "▶ Training {} on {} ({} epochs, {}px, batch {})",
            self.config.weights.display(),
            self.config.data.display(),
            self.config.epochs,
            self.config.image_size,
            self.config.batch
        );
        self.command().run().await?;
        self.collect_result()
    }

    fn collect_result(&self) -> Result<TrainResult> {
        let run_dir = self.config.run_dir();
        let weights = run_dir.join("weights");
        let result = TrainResult {
            best_weights: weights.join("best.pt"),
            last_weights: weights.join("last.pt"),
            run_dir,
        };
        if !result.best_weights.exists() {
            return Err(anyhow!(
                "training finished but {} was not written",
                result.best_weights.display()
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_train_config_default() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.image_size, 640);
        assert_eq!(config.batch, 16);
        assert_eq!(config.run_dir(), PathBuf::from("runs/train/apple_yolo11n"));
    }

    #[test]
    fn test_train_command() {
        let config = TrainConfig {
            data: PathBuf::from("/ds/data.yaml"),
            ..Default::default()
        };
        let args = Trainer::new(&config).command().to_args();
        assert_eq!(args[0], "train");
        assert!(args.contains(&"model=yolo11n.pt".to_string()));
        assert!(args.contains(&"data=/ds/data.yaml".to_string()));
        assert!(args.contains(&"project=runs/train".to_string()));
        assert!(args.contains(&"exist_ok=True".to_string()));
    }

    #[test]
    fn test_collect_result_requires_best_weights() {
        let temp_dir = tempdir().unwrap();
        let config = TrainConfig {
            project: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let trainer = Trainer::new(&config);
        assert!(trainer.collect_result().is_err());

        let weights = config.run_dir().join("weights");
        std::fs::create_dir_all(&weights).unwrap();
        std::fs::write(weights.join("best.pt"), b"ckpt").unwrap();
        let result = trainer.collect_result().unwrap();
        assert_eq!(result.best_weights, weights.join("best.pt"));
        assert_eq!(result.last_weights, weights.join("last.pt"));
    }

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let config: TrainConfig = serde_json::from_str(r#"{"epochs": 5, "device": "cpu"}"#).unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.batch, 16);
    }
}
