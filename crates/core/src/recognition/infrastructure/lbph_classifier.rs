//! Local binary pattern histogram (LBPH) face classifier.
//!
//! Each sample is encoded as 8-neighbour LBP codes (radius 1), split into a
//! grid of cells, and summarized as one normalized 256-bin histogram per
//! cell. Prediction returns the label of the nearest training sample under
//! the chi-square distance.
use std::fs;
use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::recognition::domain::face_classifier::{FaceClassifier, Prediction};

pub const DEFAULT_GRID: u32 = 8;

const BINS: usize = 256;

/// Neighbour offsets, clockwise from the top-left.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TrainedSample {
    label: u32,
    histogram: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    grid: u32,
    samples: Vec<TrainedSample>,
}

pub struct LbphClassifier {
    grid: u32,
    samples: Vec<TrainedSample>,
}

impl LbphClassifier {
    pub fn new(grid: u32) -> Self {
        Self {
            grid: grid.max(1),
            samples: Vec::new(),
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.samples.is_empty()
    }

    fn histogram(&self, image: &GrayImage) -> Vec<f32> {
        spatial_histogram(&lbp_codes(image), self.grid)
    }
}

impl Default for LbphClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_GRID)
    }
}

impl FaceClassifier for LbphClassifier {
    fn train(
        &mut self,
        samples: &[GrayImage],
        labels: &[u32],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if samples.is_empty() {
            return Err("no training samples".into());
        }
        if samples.len() != labels.len() {
            return Err(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )
            .into());
        }

        self.samples = samples
            .iter()
            .zip(labels)
            .map(|(image, &label)| TrainedSample {
                label,
                histogram: self.histogram(image),
            })
            .collect();
        Ok(())
    }

    fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file = ModelFile {
            grid: self.grid,
            samples: self.samples.clone(),
        };
        fs::write(path, serde_json::to_vec(&file)?)?;
        Ok(())
    }

    fn read(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file: ModelFile = serde_json::from_slice(&fs::read(path)?)?;
        if file.grid == 0 {
            return Err("model grid must be positive".into());
        }
        let expected = (file.grid * file.grid) as usize * BINS;
        if file.samples.iter().any(|s| s.histogram.len() != expected) {
            return Err("model histograms do not match its grid".into());
        }
        self.grid = file.grid;
        self.samples = file.samples;
        Ok(())
    }

    fn predict(&self, sample: &GrayImage) -> Result<Prediction, Box<dyn std::error::Error>> {
        if self.samples.is_empty() {
            return Err("classifier has not been trained".into());
        }
        let query = self.histogram(sample);

        let mut best = Prediction {
            label: self.samples[0].label,
            distance: f64::MAX,
        };
        for trained in &self.samples {
            let distance = chi_square(&trained.histogram, &query);
            if distance < best.distance {
                best = Prediction {
                    label: trained.label,
                    distance,
                };
            }
        }
        Ok(best)
    }
}

/// LBP code image; one pixel smaller on every side than the input.
fn lbp_codes(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(0, 0);
    }
    let mut out = GrayImage::new(w - 2, h - 2);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = image.get_pixel(x, y)[0];
            let mut code = 0u8;
            for (bit, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
                let nx = (x as i32 + dx) as u32;
                let ny = (y as i32 + dy) as u32;
                if image.get_pixel(nx, ny)[0] >= center {
                    code |= 1 << (7 - bit);
                }
            }
            out.put_pixel(x - 1, y - 1, image::Luma([code]));
        }
    }
    out
}

/// Concatenated per-cell histograms, each normalized to sum to 1.
fn spatial_histogram(codes: &GrayImage, grid: u32) -> Vec<f32> {
    let cells = (grid * grid) as usize;
    let mut hist = vec![0.0f32; cells * BINS];
    let (w, h) = codes.dimensions();
    if w == 0 || h == 0 {
        return hist;
    }

    let mut counts = vec![0u32; cells];
    for (x, y, px) in codes.enumerate_pixels() {
        let cx = (x * grid / w).min(grid - 1);
        let cy = (y * grid / h).min(grid - 1);
        let cell = (cy * grid + cx) as usize;
        hist[cell * BINS + px[0] as usize] += 1.0;
        counts[cell] += 1;
    }

    for (cell, &count) in counts.iter().enumerate() {
        if count > 0 {
            let norm = count as f32;
            for bin in &mut hist[cell * BINS..(cell + 1) * BINS] {
                *bin /= norm;
            }
        }
    }
    hist
}

/// Alternative chi-square distance, `2 * sum((a - b)^2 / (a + b))`.
///
/// With the default 8x8 grid of normalized cells this ranges over
/// `0..=256`, the scale recognition thresholds are expressed in.
fn chi_square(a: &[f32], b: &[f32]) -> f64 {
    2.0 * a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let sum = x + y;
            if sum > 0.0 {
                let diff = (x - y) as f64;
                diff * diff / sum as f64
            } else {
                0.0
            }
        })
        .sum::<f64>()
}
