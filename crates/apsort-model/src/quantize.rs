//! Full-integer INT8 quantization with the TensorFlow Lite converter
//!
//! The converter only exists in Python, so this module generates a small
//! conversion script and runs it with `python3`. The representative dataset
//! is decoded and resized here and handed over as a raw little-endian f32
//! file shaped `(N, S, S, 3)`.

use crate::validate_tflite_model;
use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use log::{info, warn};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuantizeConfig {
    /// Float SavedModel exported by ultralytics
    pub saved_model_dir: PathBuf,
    pub output: PathBuf,
    /// Training images used for calibration
    pub image_dir: PathBuf,
    pub image_size: u32,
    pub max_samples: usize,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            saved_model_dir: PathBuf::from("runs/train/apple_yolo11n/weights/best_saved_model"),
            output: PathBuf::from("best_int8.tflite"),
            image_dir: PathBuf::from("train/images"),
            image_size: 640,
            max_samples: 100,
        }
    }
}

/// Model quantizer for converting float models to INT8
pub struct Quantizer<'a> {
    config: &'a QuantizeConfig,
}

impl<'a> Quantizer<'a> {
    pub fn new(config: &'a QuantizeConfig) -> Self {
        Self { config }
    }

    /// First `max_samples` JPEGs of the image directory, sorted by name.
    pub fn representative_images(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.config.image_dir.join("*.jpg");
        let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .flatten()
            .collect();
        paths.sort();
        paths.truncate(self.config.max_samples);
        Ok(paths)
    }

    /// Decode one image, resize to S×S RGB and scale to [0,1].
    pub fn load_sample(&self, path: &Path) -> Result<Array3<f32>> {
        let s = self.config.image_size;
        let img = image::open(path)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        let rgb = image::imageops::resize(&img.to_rgb8(), s, s, FilterType::CatmullRom);
        Ok(Array3::from_shape_fn((s as usize, s as usize, 3), |(y, x, c)| {
            rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        }))
    }

    /// Stream the representative dataset to `out` as little-endian f32,
    /// one `(S,S,3)` sample after another. Unreadable images are skipped.
    /// Returns the number of samples written.
    pub fn write_representative_dataset(&self, paths: &[PathBuf], out: &Path) -> Result<usize> {
        let file = File::create(out)
            .with_context(|| format!("Failed to create {}", out.display()))?;
        let mut writer = BufWriter::new(file);
        let mut n = 0;

        for path in paths {
            let sample = match self.load_sample(path) {
                Ok(sample) => sample,
                Err(e) => {
                    warn!("skipping calibration image: {e:#}");
                    continue;
                }
            };
            write_raw_f32(&mut writer, &sample)
                .with_context(|| format!("Failed to write calibration samples to {}", out.display()))?;
            n += 1;
        }
        writer.flush()?;

        if n == 0 {
            return Err(anyhow!(
                "no usable calibration images in {}",
                self.config.image_dir.display()
            ));
        }
        Ok(n)
    }

    /// Quantize the SavedModel into `config.output`.
    pub async fn quantize(&self) -> Result<PathBuf> {
        let paths = self.representative_images()?;
        info!(
            "▶ Static-quantising {} → {} with {} calibration images",
            self.config.saved_model_dir.display(),
            self.config.output.display(),
            paths.len()
        );

        let samples = tempfile::Builder::new().suffix(".f32").tempfile()?;
        let count = self.write_representative_dataset(&paths, samples.path())?;

        let script = self.generate_quantization_script(count);
        let temp_script = tempfile::Builder::new().suffix(".py").tempfile()?;
        tokio::fs::write(temp_script.path(), script).await?;

        // paths go through argv, never into the script text
        let output = tokio::process::Command::new("python3")
            .arg(temp_script.path())
            .arg(samples.path())
            .arg(&self.config.saved_model_dir)
            .arg(&self.config.output)
            .output()
            .await
            .context("Failed to execute quantization script")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Quantization failed: {}", stderr));
        }

        validate_tflite_model(&self.config.output)?;
        info!("✓ Wrote fully-quantized model → {}", self.config.output.display());
        Ok(self.config.output.clone())
    }

    /// Generate Python script for quantization.
    /// argv: samples file, SavedModel dir, output path.
    fn generate_quantization_script(&self, count: usize) -> String {
        let s = self.config.image_size;
        format!(r#"
#!/usr/bin/env python3
import sys
import numpy as np
import tensorflow as tf

samples_path, saved_model, output = sys.argv[1:4]
SAMPLES = np.memmap(samples_path, dtype="<f4", mode="r", shape=({count}, {s}, {s}, 3))

def representative_data_gen():
    for i in range(SAMPLES.shape[0]):
        yield [np.array(SAMPLES[i:i + 1])]

converter = tf.lite.TFLiteConverter.from_saved_model(saved_model)
converter.optimizations = [tf.lite.Optimize.DEFAULT]
converter.target_spec.supported_ops = [tf.lite.OpsSet.TFLITE_BUILTINS_INT8]
converter.inference_input_type = tf.uint8
converter.inference_output_type = tf.uint8
converter.representative_dataset = representative_data_gen

with open(output, "wb") as f:
    f.write(converter.convert())
"#,
            count = count,
            s = s,
        )
    }
}

/// Little-endian f32 in logical (row-major) order.
fn write_raw_f32<W: Write>(writer: &mut W, data: &Array3<f32>) -> std::io::Result<()> {
    for v in data.iter() {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn config_for(dir: &Path) -> QuantizeConfig {
        QuantizeConfig {
            image_dir: dir.to_path_buf(),
            image_size: 8,
            max_samples: 2,
            output: dir.join("out.tflite"),
            ..Default::default()
        }
    }

    #[test]
    fn test_representative_images_sorted_and_capped() {
        let temp_dir = tempdir().unwrap();
        for name in ["c.jpg", "a.jpg", "b.jpg", "d.png"] {
            std::fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        let config = config_for(temp_dir.path());
        let paths = Quantizer::new(&config).representative_images().unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
    }

    fn read_f32(path: &Path) -> Vec<f32> {
        std::fs::read(path)
            .unwrap()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn test_representative_dataset_skips_broken_images() {
        let temp_dir = tempdir().unwrap();
        let white = temp_dir.path().join("white.jpg");
        RgbImage::from_pixel(32, 16, Rgb([255, 255, 255])).save(&white).unwrap();
        let broken = temp_dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not a jpeg").unwrap();
        let out = temp_dir.path().join("samples.f32");

        let config = config_for(temp_dir.path());
        let n = Quantizer::new(&config)
            .write_representative_dataset(&[broken, white.clone(), white], &out)
            .unwrap();
        assert_eq!(n, 2);

        let values = read_f32(&out);
        assert_eq!(values.len(), 2 * 8 * 8 * 3);
        assert!(values.iter().all(|&v| v > 0.9 && v <= 1.0));
    }

    #[test]
    fn test_representative_dataset_requires_one_image() {
        let temp_dir = tempdir().unwrap();
        let config = config_for(temp_dir.path());
        let out = temp_dir.path().join("samples.f32");
        assert!(Quantizer::new(&config).write_representative_dataset(&[], &out).is_err());
    }

    #[test]
    fn test_quantization_script_generation() {
        let temp_dir = tempdir().unwrap();
        let config = QuantizeConfig {
            saved_model_dir: PathBuf::from("it's a \\ dir"),
            ..config_for(temp_dir.path())
        };
        let script = Quantizer::new(&config).generate_quantization_script(2);

        assert!(script.contains("shape=(2, 8, 8, 3)"));
        assert!(script.contains("sys.argv[1:4]"));
        assert!(script.contains("TFLITE_BUILTINS_INT8"));
        assert!(script.contains("inference_input_type = tf.uint8"));
        assert!(!script.contains("it's a"));
        assert!(!script.contains("out.tflite"));
    }

    #[test]
    fn test_raw_f32_layout() {
        let data = Array3::from_shape_fn((1, 2, 3), |(_, x, c)| (x * 3 + c) as f32);
        let mut bytes = Vec::new();
        write_raw_f32(&mut bytes, &data).unwrap();

        assert_eq!(bytes.len(), 6 * 4);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
