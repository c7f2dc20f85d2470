//! A single YOLO label line.

use crate::{geometry::PixelBox, LabelError, Result};
use std::str::FromStr;

/// One annotated object, coordinates normalized to [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl Annotation {
    /// Parse one line. Blank lines yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(LabelError::FieldCount(parts.len()));
        }

        Ok(Some(Self {
            class_id: parse_field("class index", parts[0])?,
            x_center: parse_coord("x center", parts[1])?,
            y_center: parse_coord("y center", parts[2])?,
            width:    parse_coord("width", parts[3])?,
            height:   parse_coord("height", parts[4])?,
        }))
    }

    /// Pixel corners on a `width`×`height` image, clamped to the image.
    pub fn pixel_box(&self, width: u32, height: u32) -> PixelBox {
        PixelBox::from_center(
            self.x_center, self.y_center, self.width, self.height, width, height,
        )
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| LabelError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

// `f64::from_str` also accepts nan/inf
fn parse_coord(field: &'static str, value: &str) -> Result<f64> {
    let v: f64 = parse_field(field, value)?;
    if !v.is_finite() {
        return Err(LabelError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(v)
}

impl FromStr for Annotation {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s)?.ok_or(LabelError::FieldCount(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let a = Annotation::parse_line("1 0.5 0.25 0.1 0.2").unwrap().unwrap();
        assert_eq!(a.class_id, 1);
        assert_eq!(a.x_center, 0.5);
        assert_eq!(a.y_center, 0.25);
        assert_eq!(a.width, 0.1);
        assert_eq!(a.height, 0.2);
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let a = Annotation::parse_line("  0\t0.5   0.5 1 1  \r").unwrap().unwrap();
        assert_eq!(a.class_id, 0);
        assert_eq!(a.width, 1.0);
    }

    #[test]
    fn blank_line_is_none() {
        assert!(Annotation::parse_line("   ").unwrap().is_none());
        assert!(Annotation::parse_line("").unwrap().is_none());
    }

    #[test]
    fn short_line_is_field_count_error() {
        let err = Annotation::parse_line("1 0.5 0.5").unwrap_err();
        assert!(matches!(err, LabelError::FieldCount(3)));
    }

    #[test]
    fn long_line_is_field_count_error() {
        let err = Annotation::parse_line("1 0.5 0.5 0.1 0.1 0.9").unwrap_err();
        assert!(matches!(err, LabelError::FieldCount(6)));
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let err = Annotation::parse_line("apple 0.5 0.5 0.1 0.1").unwrap_err();
        assert!(matches!(err, LabelError::InvalidNumber { field: "class index", .. }));

        let err = Annotation::parse_line("0 0.5 abc 0.1 0.1").unwrap_err();
        assert!(matches!(err, LabelError::InvalidNumber { field: "y center", .. }));
    }

    #[test]
    fn negative_class_is_rejected() {
        let err = Annotation::parse_line("-1 0.5 0.5 0.1 0.1").unwrap_err();
        assert!(matches!(err, LabelError::InvalidNumber { .. }));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        for line in ["0 nan 0.5 0.1 0.1", "0 0.5 inf 0.1 0.1", "0 0.5 0.5 -infinity 0.1"] {
            let err = Annotation::parse_line(line).unwrap_err();
            assert!(matches!(err, LabelError::InvalidNumber { .. }), "{line}");
        }
    }

    #[test]
    fn pixel_box_keeps_double_precision() {
        let a = Annotation::parse_line("0 0.7 0.5 0 0").unwrap().unwrap();
        let b = a.pixel_box(10, 10);
        assert_eq!((b.x1, b.x2), (7, 7));

        let a = Annotation::parse_line("0 0.075045 0.5 0.04366 0.1").unwrap().unwrap();
        assert_eq!(a.pixel_box(640, 640).x2, 62);
    }

    #[test]
    fn from_str_matches_parse_line() {
        let a: Annotation = "2 0.1 0.2 0.3 0.4".parse().unwrap();
        assert_eq!(a.class_id, 2);
        assert!("".parse::<Annotation>().is_err());
    }
}
