//! Class names and colors.

use std::borrow::Cow;

/// Color in OpenCV channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgr(pub u8, pub u8, pub u8);

pub const RED: Bgr = Bgr(0, 0, 255);
pub const GREEN: Bgr = Bgr(0, 255, 0);
pub const BLUE: Bgr = Bgr(255, 0, 0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Name for `class_id`, or the id itself when the list is too short.
    pub fn label_for(&self, class_id: usize) -> Cow<'_, str> {
        match self.0.get(class_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(class_id.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Colors picked cyclically by class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<Bgr>);

impl Palette {
    /// An empty list falls back to green.
    pub fn new(colors: Vec<Bgr>) -> Self {
        if colors.is_empty() {
            Self(vec![GREEN])
        } else {
            Self(colors)
        }
    }

    /// Red, green, blue – for browsing ground-truth labels.
    pub fn inspection() -> Self {
        Self(vec![RED, GREEN, BLUE])
    }

    /// Rotten (class 0) in red, fresh in green.
    pub fn freshness() -> Self {
        Self(vec![RED, GREEN])
    }

    pub fn color_for(&self, class_id: usize) -> Bgr {
        self.0[class_id % self.0.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_class_uses_name() {
        let names = ClassNames::new(["normalApple", "rottenApple"]);
        assert_eq!(names.label_for(1), "rottenApple");
    }

    #[test]
    fn unknown_class_falls_back_to_number() {
        let names = ClassNames::new(["normalApple", "rottenApple"]);
        assert_eq!(names.label_for(7), "7");
        assert_eq!(ClassNames::default().label_for(0), "0");
    }

    #[test]
    fn palette_cycles() {
        let p = Palette::inspection();
        assert_eq!(p.color_for(0), RED);
        assert_eq!(p.color_for(2), BLUE);
        assert_eq!(p.color_for(3), RED);
        assert_eq!(Palette::new(Vec::new()).color_for(5), GREEN);
    }
}
