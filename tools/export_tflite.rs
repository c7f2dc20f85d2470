// tools/export_tflite.rs
// ------------------------------------------------------------
// Export the trained checkpoint for the edge device:
// INT8 TFLite by default, ONNX for the Rust detector.
// ------------------------------------------------------------
use anyhow::Result;
use apsort_model::{load_config, ExportConfig, ExportFormat, Exporter};
use apsort_tools::init_logging;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Tflite,
    Onnx,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Tflite => ExportFormat::Tflite,
            Format::Onnx => ExportFormat::Onnx,
        }
    }
}

#[derive(Parser)]
#[command(about = "Export the apple detector to TFLite or ONNX")]
struct Args {
    /// JSON file with a full or partial ExportConfig
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    weights: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<Format>,
    /// Keep float weights
    #[arg(long)]
    no_int8: bool,
    /// Dataset descriptor used for INT8 calibration
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    imgsz: Option<u32>,
    #[arg(long)]
    batch: Option<u32>,
    /// Share of the dataset used for calibration
    #[arg(long)]
    fraction: Option<f32>,
    #[arg(long)]
    device: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<ExportConfig> {
        let mut c: ExportConfig = match &self.config {
            Some(path) => load_config(path)?,
            None => ExportConfig::default(),
        };
        if let Some(v) = self.weights { c.weights = v; }
        if let Some(v) = self.format { c.format = v.into(); }
        if self.no_int8 { c.int8 = false; }
        if let Some(v) = self.data { c.data = v; }
        if let Some(v) = self.imgsz { c.image_size = v; }
        if let Some(v) = self.batch { c.batch = v; }
        if let Some(v) = self.fraction { c.fraction = v; }
        if let Some(v) = self.device { c.device = v; }
        Ok(c)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let config = Args::parse().into_config()?;

    let result = Exporter::new(&config).export().await?;
    println!("✅ Export done: {}", result.model_path.display());
    println!("   Input shape: {:?}", result.input_shape);
    Ok(())
}
