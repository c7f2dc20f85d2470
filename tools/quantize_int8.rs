// tools/quantize_int8.rs
// ------------------------------------------------------------
// Full-integer (uint8 in/out) TFLite conversion of the float
// SavedModel, calibrated on ~100 training images.
// ------------------------------------------------------------
use anyhow::Result;
use apsort_model::{load_config, QuantizeConfig, Quantizer};
use apsort_tools::init_logging;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Quantize the exported detector to INT8 TFLite")]
struct Args {
    /// JSON file with a full or partial QuantizeConfig
    #[arg(long)]
    config: Option<PathBuf>,
    /// Float SavedModel directory written by `export-tflite`
    #[arg(long)]
    saved_model: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Representative images
    #[arg(long)]
    image_dir: Option<PathBuf>,
    #[arg(long)]
    imgsz: Option<u32>,
    #[arg(long)]
    max_samples: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<QuantizeConfig> {
        let mut c: QuantizeConfig = match &self.config {
            Some(path) => load_config(path)?,
            None => QuantizeConfig::default(),
        };
        if let Some(v) = self.saved_model { c.saved_model_dir = v; }
        if let Some(v) = self.output { c.output = v; }
        if let Some(v) = self.image_dir { c.image_dir = v; }
        if let Some(v) = self.imgsz { c.image_size = v; }
        if let Some(v) = self.max_samples { c.max_samples = v; }
        Ok(c)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let config = Args::parse().into_config()?;

    let output = Quantizer::new(&config).quantize().await?;
    println!("✅ Wrote fully-quantized model -> {}", output.display());
    Ok(())
}
