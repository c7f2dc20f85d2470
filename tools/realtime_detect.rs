// tools/realtime_detect.rs
//------------------------------------------------------------
// Live apple sorting view:
//   IP-webcam / V4L2 → preprocess → TractYolo → draw → window
// q quits; the loop also ends with the stream.
//------------------------------------------------------------
use anyhow::{Context, Result};
use apsort_camera::{frame_stream, Capture, Source};
use apsort_detect::{Detector, Thresholds, TractYolo, MAX_DETECTIONS};
use apsort_label::Palette;
use apsort_preprocess::Preprocessor;
use apsort_tools::{
    draw_box, frame_to_mat, init_logging, quit_pressed, resolve_class_names, scalar, Caption,
    FpsCounter,
};
use clap::Parser;
use log::{debug, info};
use opencv::{core::Point, highgui, imgproc};
use std::path::PathBuf;
use tokio_stream::StreamExt;

const WINDOW: &str = "Apple Sorter";
const CAPTION: Caption = Caption { font_scale: 0.6, thickness: 2 };
const FPS_WINDOW: usize = 30;

#[derive(Parser)]
#[command(about = "Detect fresh vs. rotten apples on a live video stream")]
struct Args {
    /// ONNX export of the trained checkpoint
    #[arg(long, default_value = "runs/train/apple_yolo11n/weights/best.onnx")]
    model: PathBuf,

    /// MJPEG stream URL
    #[arg(long, default_value = "http://192.168.178.153:8080/video")]
    stream_url: String,

    /// Use /dev/video<N> instead of the stream URL
    #[arg(long)]
    camera_index: Option<u32>,

    /// Detection threshold
    #[arg(long, default_value_t = 0.25)]
    confidence: f32,

    #[arg(long, default_value_t = 0.7)]
    iou: f32,

    /// Model input size (square)
    #[arg(long, default_value_t = 640)]
    imgsz: u32,

    /// data.yaml to take class names from
    #[arg(long)]
    data: Option<PathBuf>,

    /// Class names by index, comma separated (ignored with --data)
    #[arg(long, default_value = "rottenApple,freshApple")]
    names: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let names = resolve_class_names(args.data.as_deref(), &args.names)?;
    let palette = Palette::freshness();

    let detector = TractYolo::new(&args.model, args.imgsz as usize, args.imgsz as usize)
        .with_context(|| format!("loading {}", args.model.display()))?
        .with_thresholds(Thresholds {
            confidence: args.confidence,
            iou: args.iou,
            max_detections: MAX_DETECTIONS,
        });
    let pp = Preprocessor::new(args.imgsz, args.imgsz);

    let source = match args.camera_index {
        Some(i) => Source::device_index(i),
        None => Source::http(&args.stream_url)?,
    };
    let cap = Capture::open(source.clone())
        .with_context(|| format!("opening {source}"))?;
    let mut frames = frame_stream(cap);

    println!("Press 'q' to exit.");
    let mut fps = FpsCounter::new(FPS_WINDOW);
    let mut count = 0u64;

    while let Some(frame) = frames.next().await {
        let frame = frame?;

        let tensor = pp.run(&frame)?;
        let dets = detector.detect(&tensor)?;

        let mut mat = frame_to_mat(&frame)?;
        for d in &dets {
            debug!("box={:?} score={:.3} class={}", d.bbox, d.score, d.class);
            let b = d.pixel_box(frame.width, frame.height);
            let text = format!("{} {:.2}", names.label_for(d.class), d.score);
            draw_box(&mut mat, &b, palette.color_for(d.class), &text, CAPTION)?;
        }

        let rate = fps.tick();
        imgproc::put_text(
            &mut mat,
            &format!("FPS: {:.1}", rate),
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.8,
            scalar(apsort_label::style::GREEN),
            2,
            imgproc::LINE_8,
            false,
        )?;

        highgui::imshow(WINDOW, &mat)?;
        if quit_pressed(1)? {
            break;
        }

        count += 1;
        if count % 150 == 0 {
            info!("avg {:.1} FPS (last {} frames)", rate, FPS_WINDOW);
        }
    }

    highgui::destroy_all_windows()?;
    Ok(())
}
