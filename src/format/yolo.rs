//! YOLO label export.
//!
//! One text file per image, one line per annotation, class = sub-category id.
//! Annotations without a sub-category cannot be labelled and are skipped.

use std::path::{Path, PathBuf};

use galabone_geom::clamp_unit;

use crate::format::error::FormatError;
use crate::model::Annotation;

/// Which YOLO label layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YoloFlavor {
    /// `class cx cy w h` from the axis-aligned bounds.
    #[default]
    Detect,
    /// `class x1 y1 x2 y2 x3 y3 x4 y4` from the rotated polygon.
    Obb,
}

/// Label lines for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YoloLabels {
    pub lines: Vec<String>,
    /// Annotations left out because they have no sub-category.
    pub skipped: usize,
}

impl YoloLabels {
    /// File contents, one line per label.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Format one line, or `None` when the annotation has no class.
pub fn yolo_line(annotation: &Annotation, flavor: YoloFlavor) -> Option<String> {
    let class = annotation.taxonomy().subcategory_id?;
    let line = match flavor {
        YoloFlavor::Detect => {
            let aabb = annotation.aabb();
            let c = aabb.center();
            format!(
                "{} {:.6} {:.6} {:.6} {:.6}",
                class,
                clamp_unit(c.x),
                clamp_unit(c.y),
                clamp_unit(aabb.width()),
                clamp_unit(aabb.height())
            )
        }
        YoloFlavor::Obb => {
            let coords: Vec<String> = annotation
                .polygon()
                .iter()
                .flat_map(|p| [p.x, p.y])
                .map(|v| format!("{:.6}", clamp_unit(v)))
                .collect();
            format!("{} {}", class, coords.join(" "))
        }
    };
    Some(line)
}

/// Format every annotation of one image.
pub fn yolo_labels<'a, I>(annotations: I, flavor: YoloFlavor) -> YoloLabels
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut labels = YoloLabels::default();
    for annotation in annotations {
        match yolo_line(annotation, flavor) {
            Some(line) => labels.lines.push(line),
            None => {
                log::warn!(
                    "Skipping annotation {} without sub-category in YOLO export",
                    annotation.id()
                );
                labels.skipped += 1;
            }
        }
    }
    labels
}

/// Write `<dir>/<stem>.txt` and return the written path.
pub fn write_yolo_labels(dir: &Path, stem: &str, labels: &YoloLabels) -> Result<PathBuf, FormatError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.txt", stem));
    std::fs::write(&path, labels.to_text())?;
    log::info!("Wrote {} YOLO labels to {:?}", labels.lines.len(), path);
    Ok(path)
}
