//! Shared plumbing for the apple sorter binaries: logging setup, class-name
//! resolution and OpenCV drawing.

use anyhow::{Context, Result};
use apsort_camera::BgrFrame;
use apsort_label::{
    label_anchor, Annotation, Bgr, ClassNames, DatasetDescriptor, LabelFile, Palette, PixelBox,
    SplitLayout,
};
use log::warn;
use opencv::{
    core::{Mat, Point, Scalar, CV_8UC3},
    highgui, imgcodecs, imgproc,
    prelude::*,
};
use std::{collections::VecDeque, path::Path, time::Instant};

/// `RUST_LOG` wins; defaults to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Names from `data.yaml` when given, else the comma separated fallback.
pub fn resolve_class_names(data: Option<&Path>, fallback: &str) -> Result<ClassNames> {
    if let Some(path) = data {
        let descriptor = DatasetDescriptor::load(path)
            .with_context(|| format!("reading dataset descriptor {}", path.display()))?;
        return Ok(descriptor.class_names());
    }
    Ok(parse_names(fallback))
}

pub fn parse_names(list: &str) -> ClassNames {
    ClassNames::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
}

pub fn scalar(c: Bgr) -> Scalar {
    Scalar::new(c.0 as f64, c.1 as f64, c.2 as f64, 0.0)
}

/// Text style for box captions.
#[derive(Debug, Clone, Copy)]
pub struct Caption {
    pub font_scale: f64,
    pub thickness: i32,
}

/// 2 px rectangle plus caption above (or inside, near the top edge).
pub fn draw_box(mat: &mut Mat, b: &PixelBox, color: Bgr, text: &str, caption: Caption) -> Result<()> {
    let color = scalar(color);
    imgproc::rectangle_points(
        mat,
        Point::new(b.x1, b.y1),
        Point::new(b.x2, b.y2),
        color,
        2,
        imgproc::LINE_8,
        0,
    )?;
    let (tx, ty) = label_anchor(b);
    imgproc::put_text(
        mat,
        text,
        Point::new(tx, ty),
        imgproc::FONT_HERSHEY_SIMPLEX,
        caption.font_scale,
        color,
        caption.thickness,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(())
}

/// Ground-truth boxes with `name:id` captions.
pub fn draw_annotations(
    image: &mut Mat,
    annotations: &[Annotation],
    names: &ClassNames,
    palette: &Palette,
    caption: Caption,
) -> Result<()> {
    let (w, h) = (image.cols() as u32, image.rows() as u32);
    for a in annotations {
        let b = a.pixel_box(w, h);
        let text = format!("{}:{}", names.label_for(a.class_id), a.class_id);
        draw_box(image, &b, palette.color_for(a.class_id), &text, caption)?;
    }
    Ok(())
}

/// Load one image of a split with its label boxes drawn.
///
/// `Ok(None)` when the image cannot be read. A missing or unreadable label
/// file is logged and the image is returned without boxes.
pub fn annotate_split_image(
    layout: &SplitLayout,
    image_path: &Path,
    names: &ClassNames,
    palette: &Palette,
    caption: Caption,
) -> Result<Option<Mat>> {
    let mut image = imgcodecs::imread(&image_path.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
    if image.empty() {
        warn!("Could not load image: {}. Skipping.", image_path.display());
        return Ok(None);
    }

    let label_path = layout.label_path_for(image_path);
    if !label_path.exists() {
        warn!(
            "Label file not found for {}, skipping bbox draw.",
            image_path.file_name().unwrap_or_default().to_string_lossy()
        );
        return Ok(Some(image));
    }
    match LabelFile::read(&label_path) {
        Ok(labels) => draw_annotations(&mut image, &labels.annotations, names, palette, caption)?,
        Err(e) => warn!("{e}"),
    }
    Ok(Some(image))
}

/// Copy a packed BGR frame into an owned `CV_8UC3` Mat.
pub fn frame_to_mat(frame: &BgrFrame) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&frame.data);
    Ok(mat)
}

/// Poll the window for `delay` ms; true when `q` was pressed.
pub fn quit_pressed(delay: i32) -> Result<bool> {
    Ok(highgui::wait_key(delay)? & 0xFF == b'q' as i32)
}

/// Rolling frames-per-second over the last `capacity` ticks.
pub struct FpsCounter {
    window: VecDeque<Instant>,
    capacity: usize,
}

impl FpsCounter {
    pub fn new(capacity: usize) -> Self {
        Self { window: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn tick(&mut self) -> f64 {
        self.window.push_back(Instant::now());
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.fps()
    }

    pub fn fps(&self) -> f64 {
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) if self.window.len() >= 2 => {
                let dt = last.duration_since(*first).as_secs_f64();
                if dt > 0.0 { (self.window.len() - 1) as f64 / dt } else { 0.0 }
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Vector;

    const CAPTION: Caption = Caption { font_scale: 0.5, thickness: 1 };

    fn black_png(path: &Path) {
        let mat = Mat::new_rows_cols_with_default(40, 40, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(imgcodecs::imwrite(&path.to_string_lossy(), &mat, &Vector::new()).unwrap());
    }

    #[test]
    fn split_images_with_and_without_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = SplitLayout::new(tmp.path());
        std::fs::create_dir_all(layout.image_dir()).unwrap();
        std::fs::create_dir_all(layout.label_dir()).unwrap();

        let labeled = layout.image_dir().join("labeled.png");
        let unlabeled = layout.image_dir().join("unlabeled.png");
        let corrupt = layout.image_dir().join("corrupt.jpg");
        black_png(&labeled);
        black_png(&unlabeled);
        std::fs::write(&corrupt, b"not a jpeg").unwrap();
        std::fs::write(layout.label_path_for(&labeled), "0 0.5 0.5 0.5 0.5\n1 0.5\n").unwrap();

        let names = parse_names("normalApple,rottenApple");
        let palette = Palette::inspection();

        let skipped = annotate_split_image(&layout, &corrupt, &names, &palette, CAPTION).unwrap();
        assert!(skipped.is_none());

        let plain = annotate_split_image(&layout, &unlabeled, &names, &palette, CAPTION)
            .unwrap()
            .unwrap();
        assert_eq!((plain.cols(), plain.rows()), (40, 40));
        assert!(plain.data_bytes().unwrap().iter().all(|&b| b == 0));

        let drawn = annotate_split_image(&layout, &labeled, &names, &palette, CAPTION)
            .unwrap()
            .unwrap();
        assert!(drawn.data_bytes().unwrap().iter().any(|&b| b != 0));
    }

    #[test]
    fn names_from_list() {
        let names = parse_names("rottenApple, freshApple,");
        assert_eq!(names.as_slice(), ["rottenApple", "freshApple"]);
    }

    #[test]
    fn names_from_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = tmp.path().join("data.yaml");
        std::fs::write(&yaml, "names: ['normalApple', 'rottenApple']\n").unwrap();
        let names = resolve_class_names(Some(yaml.as_path()), "ignored").unwrap();
        assert_eq!(names.label_for(0), "normalApple");
    }

    #[test]
    fn fps_needs_two_ticks() {
        let mut fps = FpsCounter::new(30);
        assert_eq!(fps.tick(), 0.0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(fps.tick() > 0.0);
    }

    #[test]
    fn frame_copies_into_mat() {
        let frame = BgrFrame {
            data: vec![1, 2, 3, 4, 5, 6],
            width: 2,
            height: 1,
            pts: std::time::Duration::ZERO,
        };
        let mat = frame_to_mat(&frame).unwrap();
        assert_eq!(mat.rows(), 1);
        assert_eq!(mat.cols(), 2);
        assert_eq!(mat.data_bytes().unwrap(), &[1, 2, 3, 4, 5, 6]);
    }
}
