// tools/inspect_labels.rs
// ------------------------------------------------------------
// Browse a YOLO-format split (images/ + labels/) with every
// ground-truth box drawn on its image.
//   n / any key – next image      q – quit
// cargo run -p apsort-tools --bin inspect-labels -- --dataset-root <split>
// cargo run -p apsort-tools --bin inspect-labels -- --data data.yaml --split val
// ------------------------------------------------------------
use anyhow::{anyhow, Context, Result};
use apsort_label::{fit_scale, DatasetDescriptor, Palette, Split, SplitLayout};
use apsort_tools::{annotate_split_image, init_logging, parse_names, quit_pressed, Caption};
use clap::{Parser, ValueEnum};
use opencv::{
    core::{Mat, Size, Vector},
    highgui, imgcodecs, imgproc,
    prelude::*,
};
use std::path::{Path, PathBuf};

const WINDOW: &str = "BBox Inspection";
const CAPTION: Caption = Caption { font_scale: 0.5, thickness: 1 };

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    Train,
    Val,
    Test,
}

impl From<SplitArg> for Split {
    fn from(s: SplitArg) -> Self {
        match s {
            SplitArg::Train => Split::Train,
            SplitArg::Val => Split::Val,
            SplitArg::Test => Split::Test,
        }
    }
}

#[derive(Parser)]
#[command(about = "Draw YOLO label boxes on their images")]
struct Args {
    /// Split root containing images/ and labels/ (ignored with --split)
    #[arg(long, default_value = "Rotten Apple Detection 2.v3i.yolov11/test")]
    dataset_root: PathBuf,

    /// data.yaml to take class names (and, with --split, the split root) from
    #[arg(long)]
    data: Option<PathBuf>,

    /// Split listed in --data to browse
    #[arg(long, value_enum, requires = "data")]
    split: Option<SplitArg>,

    /// Class names by index, comma separated (ignored with --data)
    #[arg(long, default_value = "normalApple,rottenApple")]
    names: String,

    /// Write annotated images here instead of opening a window
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Longest window side in pixels
    #[arg(long, default_value_t = 800)]
    max_dim: u32,
}

fn fit_to_window(image: &Mat, max_dim: u32) -> Result<Mat> {
    let (w, h) = (image.cols(), image.rows());
    let scale = fit_scale(w as u32, h as u32, max_dim);
    if scale >= 1.0 {
        return Ok(image.try_clone()?);
    }
    let mut out = Mat::default();
    imgproc::resize(
        image,
        &mut out,
        Size::new((w as f64 * scale) as i32, (h as f64 * scale) as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(out)
}

fn save(image: &Mat, dir: &Path, source: &Path) -> Result<()> {
    let out = dir.join(source.file_name().unwrap_or_default());
    imgcodecs::imwrite(&out.to_string_lossy(), image, &Vector::new())
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let descriptor = args
        .data
        .as_deref()
        .map(|path| {
            DatasetDescriptor::load(path)
                .with_context(|| format!("reading dataset descriptor {}", path.display()))
        })
        .transpose()?;

    let root = match (&descriptor, args.split) {
        (Some(d), Some(split)) => d
            .split_root(split.into())
            .ok_or_else(|| anyhow!("split not listed in the dataset descriptor"))?,
        _ => args.dataset_root.clone(),
    };
    let names = match &descriptor {
        Some(d) => d.class_names(),
        None => parse_names(&args.names),
    };
    let palette = Palette::inspection();

    let layout = SplitLayout::new(root);
    if let Err(e) = layout.check() {
        eprintln!("Error: {e}");
        return Ok(());
    }

    let images = layout.images()?;
    if images.is_empty() {
        println!("No images found in {}.", layout.image_dir().display());
        return Ok(());
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        println!(
            "Found {} images in {}. Writing annotated copies to {}.",
            images.len(),
            layout.root().display(),
            dir.display()
        );
    } else {
        println!(
            "Found {} images in {}. Press 'n' for next, 'q' to quit.",
            images.len(),
            layout.root().display()
        );
    }

    for img_path in &images {
        let Some(image) = annotate_split_image(&layout, img_path, &names, &palette, CAPTION)? else {
            continue;
        };

        if let Some(dir) = &args.output_dir {
            save(&image, dir, img_path)?;
            continue;
        }

        highgui::imshow(WINDOW, &fit_to_window(&image, args.max_dim)?)?;
        if quit_pressed(0)? {
            break;
        }
    }

    if args.output_dir.is_none() {
        highgui::destroy_all_windows()?;
    }
    Ok(())
}
