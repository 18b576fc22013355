//! Triplet sampling over a class-per-directory image catalog.
//!
//! The catalog scans `root/<class>/*.{png,jpg,jpeg}` once at build time and
//! keeps only classes with at least two images (a class needs a distinct
//! anchor/positive pair to be usable). Eligibility is decided here, fail-fast:
//! a catalog with fewer than two usable classes cannot produce a valid
//! negative and refuses to build.
//!
//! Sampling is with replacement across calls. A full pass enumerates every
//! image once as an anchor, but positive and negative picks are re-randomized
//! on every call, so two passes over the same index yield different triplets
//! unless the sampler was seeded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Errors produced while building a triplet catalog.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset root {0} does not exist or is not a directory")]
    MissingRoot(String),
    #[error("failed to scan dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("triplet sampling needs at least two classes with two or more images, found {0}")]
    NotEnoughClasses(usize),
}

/// One training triple of image paths.
///
/// Invariants: anchor and positive share a class and differ from each other;
/// negative belongs to a different class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripletPaths {
    pub anchor: PathBuf,
    pub positive: PathBuf,
    pub negative: PathBuf,
}

/// Immutable class-to-images catalog backing the sampler.
#[derive(Debug, Clone)]
pub struct TripletCatalog {
    classes: Vec<String>,
    images: Vec<Vec<PathBuf>>,
    /// Flat (class index, image index) list; one entry per anchor.
    anchors: Vec<(usize, usize)>,
}

impl TripletCatalog {
    /// Scan `root` and build the catalog. Classes are visited in sorted name
    /// order so catalog layout is deterministic across hosts.
    pub fn from_dir(root: &Path) -> Result<Self, DatasetError> {
        if !root.is_dir() {
            return Err(DatasetError::MissingRoot(root.display().to_string()));
        }

        let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        class_dirs.sort();

        let mut classes = Vec::new();
        let mut images = Vec::new();
        for dir in class_dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| is_image(path))
                .collect();
            files.sort();

            if files.len() < 2 {
                tracing::debug!(class = name, images = files.len(), "class excluded from catalog");
                continue;
            }
            classes.push(name.to_string());
            images.push(files);
        }

        if classes.len() < 2 {
            return Err(DatasetError::NotEnoughClasses(classes.len()));
        }

        let anchors = images
            .iter()
            .enumerate()
            .flat_map(|(ci, imgs)| (0..imgs.len()).map(move |ii| (ci, ii)))
            .collect();

        Ok(Self {
            classes,
            images,
            anchors,
        })
    }

    /// Number of anchor positions, i.e. the length of one sampling pass.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

/// Draws (anchor, positive, negative) path triples from a [`TripletCatalog`].
#[derive(Debug)]
pub struct TripletSampler {
    catalog: TripletCatalog,
    rng: fastrand::Rng,
}

impl TripletSampler {
    pub fn new(catalog: TripletCatalog) -> Self {
        Self {
            catalog,
            rng: fastrand::Rng::new(),
        }
    }

    /// Seeded variant for reproducible sampling.
    pub fn with_seed(catalog: TripletCatalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn catalog(&self) -> &TripletCatalog {
        &self.catalog
    }

    /// Produce the triple for anchor position `index` (0..catalog.len()).
    ///
    /// The positive is uniform over the anchor's class minus the anchor
    /// itself; the negative is uniform over a uniformly-chosen other class.
    pub fn sample(&mut self, index: usize) -> TripletPaths {
        let (class_idx, image_idx) = self.catalog.anchors[index];
        let class_images = &self.catalog.images[class_idx];

        // Uniform pick over the class excluding the anchor slot.
        let mut positive_idx = self.rng.usize(0..class_images.len() - 1);
        if positive_idx >= image_idx {
            positive_idx += 1;
        }

        // Uniform pick over the other classes, then uniform within it.
        let mut negative_class = self.rng.usize(0..self.catalog.classes.len() - 1);
        if negative_class >= class_idx {
            negative_class += 1;
        }
        let negative_images = &self.catalog.images[negative_class];
        let negative_idx = self.rng.usize(0..negative_images.len());

        TripletPaths {
            anchor: class_images[image_idx].clone(),
            positive: class_images[positive_idx].clone(),
            negative: negative_images[negative_idx].clone(),
        }
    }
}
