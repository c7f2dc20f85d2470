//! apsort‑preprocess – BGR frames → resized, normalized RGB tensors.
//!
//! Plain stretch resize to the model input size, the same transform the
//! calibration images go through during INT8 quantization.

use anyhow::{anyhow, Result};
use apsort_camera::BgrFrame;
use ndarray::Array3;
use resize::{new, Pixel, Type};
use rgb::FromSlice;

#[derive(Clone, Debug)]
pub struct Preprocessor {
    dst_w: u32,
    dst_h: u32,
}

impl Preprocessor {
    /// Create a pre‑processor that outputs WxH RGB (0‑1.0f32).
    pub fn new(dst_w: u32, dst_h: u32) -> Self {
        Self { dst_w, dst_h }
    }

    /// Camera frame path: BGR → RGB, then [`Preprocessor::run_rgb`].
    pub fn run(&self, frame: &BgrFrame) -> Result<Array3<f32>> {
        let mut rgb = frame.data.clone();
        bgr_to_rgb_inplace(&mut rgb);
        self.run_rgb(&rgb, frame.width, frame.height)
    }

    /// Packed RGB8 `w`×`h` → (dst_h, dst_w, 3) f32 in [0,1].
    pub fn run_rgb(&self, rgb: &[u8], w: u32, h: u32) -> Result<Array3<f32>> {
        let (w, h) = (w as usize, h as usize);
        if w == 0 || h == 0 {
            return Err(anyhow!("empty frame"));
        }
        if rgb.len() != w * h * 3 {
            return Err(anyhow!("expected {} RGB bytes for {}x{}, got {}", w * h * 3, w, h, rgb.len()));
        }

        let mut dst = vec![0u8; (self.dst_w * self.dst_h * 3) as usize];

        // Create a reusable resizer instance:
        let mut resizer = new(
            w,
            h,
            self.dst_w as usize,
            self.dst_h as usize,
            Pixel::RGB8,
            Type::Triangle,
        )?;
        resizer.resize(rgb.as_rgb(), dst.as_rgb_mut())?;

        // Normalize to 0‑1 and pack into ndarray (H,W,C)
        let data: Vec<f32> = dst.iter().map(|&px| px as f32 / 255.0).collect();
        Ok(Array3::from_shape_vec(
            (self.dst_h as usize, self.dst_w as usize, 3),
            data,
        )?)
    }
}

fn bgr_to_rgb_inplace(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}
