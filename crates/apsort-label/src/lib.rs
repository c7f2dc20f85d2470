// apsort-label/src/lib.rs
// ============================================================
// Annotation layer for the apple sorter
// YOLO text labels → typed annotations → clamped pixel boxes.
// ------------------------------------------------------------
// Public API
//   * Annotation::parse_line(line)   – one label line
//   * LabelFile::read(path)          – whole file, skip-and-log
//   * Annotation::pixel_box(w, h)    – normalized → pixel corners
//   * SplitLayout / DatasetDescriptor – images/, labels/, data.yaml
// ============================================================

//! apple sorter – annotation layer
//!
//! Labels come from an external annotation tool in the usual YOLO text
//! format: one object per line, `<class> <x_c> <y_c> <w> <h>` with the
//! four coordinates normalized to the image size.  Invalid lines are
//! recorded and skipped, they never abort the rest of the file.

use thiserror::Error;

pub mod annotation;
pub mod dataset;
pub mod file;
pub mod geometry;
pub mod style;

pub use annotation::Annotation;
pub use dataset::{DatasetDescriptor, Split, SplitLayout};
pub use file::{LabelFile, SkippedLine};
pub use geometry::{fit_scale, label_anchor, PixelBox};
pub use style::{Bgr, ClassNames, Palette};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    #[error("could not parse {field} from {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset descriptor {path}: {source}")]
    Descriptor {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("dataset directory missing: {0}")]
    MissingDir(String),
}

pub type Result<T> = std::result::Result<T, LabelError>;
