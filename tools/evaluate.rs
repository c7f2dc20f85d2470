// tools/evaluate.rs
// ------------------------------------------------------------
// Validate the trained checkpoint, then run batch prediction
// over a folder and save annotated images.
// ------------------------------------------------------------
use anyhow::Result;
use apsort_model::{load_config, EvalConfig, Evaluator, PredictConfig, ValMetrics};
use apsort_tools::init_logging;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Evaluate the apple detector and predict on a folder")]
struct Args {
    /// JSON file with a full or partial EvalConfig
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    weights: Option<PathBuf>,
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    imgsz: Option<u32>,
    #[arg(long)]
    batch: Option<u32>,
    /// JSON file with a full or partial PredictConfig; its weights and
    /// image size are replaced by the evaluated ones
    #[arg(long)]
    predict_config: Option<PathBuf>,
    /// Image file or folder for prediction
    #[arg(long)]
    source: Option<PathBuf>,
    #[arg(long)]
    conf: Option<f32>,
    #[arg(long)]
    project: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    /// Only run validation
    #[arg(long)]
    skip_predict: bool,
}

fn print_metrics(m: &ValMetrics) {
    println!(
        "{:>16} {:>8} {:>10} {:>8} {:>8} {:>8} {:>9}",
        "Class", "Images", "Instances", "P", "R", "mAP50", "mAP50-95"
    );
    for row in std::iter::once(&m.summary).chain(&m.per_class) {
        println!(
            "{:>16} {:>8} {:>10} {:>8.3} {:>8.3} {:>8.3} {:>9.3}",
            row.class, row.images, row.instances, row.precision, row.recall, row.map50, row.map50_95
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut eval: EvalConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => EvalConfig::default(),
    };
    if let Some(v) = args.weights { eval.weights = v; }
    if let Some(v) = args.data { eval.data = v; }
    if let Some(v) = args.imgsz { eval.image_size = v; }
    if let Some(v) = args.batch { eval.batch = v; }

    let metrics = Evaluator::validate(&eval).await?;
    print_metrics(&metrics);

    if args.skip_predict {
        return Ok(());
    }

    let mut predict = match &args.predict_config {
        Some(path) => load_config::<PredictConfig>(path)?,
        None => PredictConfig::default(),
    }
    .with_checkpoint(&eval);
    if let Some(v) = args.source { predict.source = v; }
    if let Some(v) = args.conf { predict.confidence = v; }
    if let Some(v) = args.project { predict.project = v; }
    if let Some(v) = args.name { predict.name = v; }

    let out_dir = Evaluator::predict(&predict).await?;
    println!("✅ Annotated predictions saved to {}", out_dir.display());
    Ok(())
}
