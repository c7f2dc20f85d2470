// tools/train.rs
// ------------------------------------------------------------
// Fine-tune YOLO11n on the apple dataset.
// Outputs land in <project>/<name>/weights/{best,last}.pt
// ------------------------------------------------------------
use anyhow::Result;
use apsort_model::{check_ultralytics_available, load_config, TrainConfig, Trainer};
use apsort_tools::init_logging;
use clap::Parser;
use log::warn;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Train the apple freshness detector")]
struct Args {
    /// JSON file with a full or partial TrainConfig
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Dataset descriptor (data.yaml)
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    epochs: Option<u32>,
    #[arg(long)]
    imgsz: Option<u32>,
    #[arg(long)]
    batch: Option<u32>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    device: Option<String>,
    #[arg(long)]
    project: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<TrainConfig> {
        let mut c: TrainConfig = match &self.config {
            Some(path) => load_config(path)?,
            None => TrainConfig::default(),
        };
        if let Some(v) = self.weights { c.weights = v; }
        if let Some(v) = self.data { c.data = v; }
        if let Some(v) = self.epochs { c.epochs = v; }
        if let Some(v) = self.imgsz { c.image_size = v; }
        if let Some(v) = self.batch { c.batch = v; }
        if let Some(v) = self.name { c.name = v; }
        if let Some(v) = self.device { c.device = v; }
        if let Some(v) = self.project { c.project = v; }
        Ok(c)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let config = Args::parse().into_config()?;

    if !check_ultralytics_available().await? {
        warn!("`yolo` not found on PATH; install with: pip install ultralytics");
    }

    let result = Trainer::new(&config).train().await?;
    println!("✅ Training done: {}", result.run_dir.display());
    println!("   best: {}", result.best_weights.display());
    println!("   last: {}", result.last_weights.display());
    Ok(())
}
