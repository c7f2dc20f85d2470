//! Normalized boxes → pixel corners.

/// Integer pixel corners, inclusive, always inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    /// From a normalized center/size box.
    pub fn from_center(
        x_center: f64,
        y_center: f64,
        width: f64,
        height: f64,
        img_w: u32,
        img_h: u32,
    ) -> Self {
        let (w, h) = (img_w as f64, img_h as f64);
        let cx = x_center * w;
        let cy = y_center * h;
        let hw = width * w / 2.0;
        let hh = height * h / 2.0;

        Self::clamped(cx - hw, cy - hh, cx + hw, cy + hh, img_w, img_h)
    }

    /// From normalized corners `[x1, y1, x2, y2]`, as produced by the detector.
    pub fn from_corners(bbox: [f32; 4], img_w: u32, img_h: u32) -> Self {
        let (w, h) = (img_w as f64, img_h as f64);
        Self::clamped(
            bbox[0] as f64 * w,
            bbox[1] as f64 * h,
            bbox[2] as f64 * w,
            bbox[3] as f64 * h,
            img_w,
            img_h,
        )
    }

    // `as i32` truncates toward zero and saturates on NaN/inf
    fn clamped(x1: f64, y1: f64, x2: f64, y2: f64, img_w: u32, img_h: u32) -> Self {
        let max_x = img_w.saturating_sub(1) as i32;
        let max_y = img_h.saturating_sub(1) as i32;
        Self {
            x1: (x1 as i32).clamp(0, max_x),
            y1: (y1 as i32).clamp(0, max_y),
            x2: (x2 as i32).clamp(0, max_x),
            y2: (y2 as i32).clamp(0, max_y),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Where the class label text goes: above the box when there is room.
pub fn label_anchor(b: &PixelBox) -> (i32, i32) {
    if b.y1 - 6 > 10 {
        (b.x1, b.y1 - 6)
    } else {
        (b.x1, b.y1 + 12)
    }
}

/// Downscale factor so the longer side fits in `max_dim`; never upscales.
pub fn fit_scale(width: u32, height: u32, max_dim: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let m = max_dim as f64;
    (m / width as f64).min(m / height as f64).min(1.0)
}
