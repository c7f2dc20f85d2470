//! Dataset layout on disk and the ultralytics `data.yaml` descriptor.

use crate::{ClassNames, LabelError, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// One split root, holding `images/` and `labels/`.
#[derive(Debug, Clone)]
pub struct SplitLayout {
    root: PathBuf,
}

impl SplitLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn label_dir(&self) -> PathBuf {
        self.root.join("labels")
    }

    /// Both `images/` and `labels/` must exist.
    pub fn check(&self) -> Result<()> {
        for dir in [self.image_dir(), self.label_dir()] {
            if !dir.is_dir() {
                return Err(LabelError::MissingDir(dir.display().to_string()));
            }
        }
        Ok(())
    }

    /// All `.jpg` images sorted, then all `.png` images sorted.
    pub fn images(&self) -> Result<Vec<PathBuf>> {
        let dir = self.image_dir();
        let entries = std::fs::read_dir(&dir).map_err(|source| LabelError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut by_ext: [Vec<PathBuf>; 2] = [Vec::new(), Vec::new()];
        for entry in entries {
            let path = entry
                .map_err(|source| LabelError::Io {
                    path: dir.display().to_string(),
                    source,
                })?
                .path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if let Some(i) = IMAGE_EXTENSIONS.iter().position(|&x| x == ext) {
                by_ext[i].push(path);
            }
        }

        let [mut jpgs, mut pngs] = by_ext;
        jpgs.sort();
        pngs.sort();
        jpgs.extend(pngs);
        Ok(jpgs)
    }

    /// `labels/<stem>.txt` for an image of this split.
    pub fn label_path_for(&self, image: &Path) -> PathBuf {
        let stem = image.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".txt");
        self.label_dir().join(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum NameList {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

impl Default for NameList {
    fn default() -> Self {
        NameList::List(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawDescriptor {
    path: Option<PathBuf>,
    train: Option<PathBuf>,
    val: Option<PathBuf>,
    test: Option<PathBuf>,
    #[serde(default)]
    names: NameList,
}

/// The subset of `data.yaml` this workspace reads.
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    base: PathBuf,
    raw: RawDescriptor,
}

impl DatasetDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, dir).map_err(|source| LabelError::Descriptor {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse descriptor text; relative paths resolve against `dir`.
    pub fn from_yaml(text: &str, dir: &Path) -> std::result::Result<Self, serde_yaml::Error> {
        let raw: RawDescriptor = serde_yaml::from_str(text)?;
        let base = match &raw.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => dir.join(p),
            None => dir.to_path_buf(),
        };
        Ok(Self { base, raw })
    }

    /// Class names ordered by index. Gaps in a map become numeric names.
    pub fn class_names(&self) -> ClassNames {
        match &self.raw.names {
            NameList::List(v) => ClassNames::new(v.iter().cloned()),
            NameList::Map(m) => {
                let len = m.keys().next_back().map_or(0, |k| k + 1);
                ClassNames::new((0..len).map(|i| m.get(&i).cloned().unwrap_or_else(|| i.to_string())))
            }
        }
    }

    /// Root of a split. ultralytics points splits at `<root>/images`,
    /// the trailing `images` component is stripped.
    pub fn split_root(&self, split: Split) -> Option<PathBuf> {
        let rel = match split {
            Split::Train => self.raw.train.as_ref(),
            Split::Val => self.raw.val.as_ref(),
            Split::Test => self.raw.test.as_ref(),
        }?;
        let full = if rel.is_absolute() { rel.clone() } else { self.base.join(rel) };
        if full.file_name().is_some_and(|n| n == "images") {
            full.parent().map(Path::to_path_buf)
        } else {
            Some(full)
        }
    }
}
