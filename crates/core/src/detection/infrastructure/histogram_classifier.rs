/// Local-binary-pattern histogram face classifier.
///
/// Each face crop is reduced to grayscale, resampled to a fixed square and
/// described by per-cell LBP histograms. Prediction is nearest neighbour
/// over every trained sample using chi-square distance. No ML model is
/// required, which keeps enrollment instant and the state small enough to
/// embed in the model artifact.
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::detection::domain::classifier::{Classifier, Label, Prediction};
use crate::shared::frame::Frame;

/// Side length every crop is resampled to before description.
pub const FACE_SIZE: u32 = 100;

/// Multiplier from mean per-cell chi-square (range 0..=2) to the distance
/// reported in [`Prediction::Candidate`]. Identical crops score 0.
pub const DISTANCE_SCALE: f64 = 250.0;

const GRID: usize = 4;
const BINS: usize = 32;
const CODES_PER_BIN: usize = 256 / BINS;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TrainedSample {
    label: Label,
    histogram: Vec<f32>,
}

#[derive(Default)]
pub struct HistogramClassifier {
    samples: Vec<TrainedSample>,
}

impl HistogramClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Classifier for HistogramClassifier {
    fn train(&mut self, label: Label, samples: &[Frame]) -> Result<(), Box<dyn std::error::Error>> {
        let histograms: Vec<Vec<f32>> = samples.iter().filter_map(describe).collect();
        if histograms.is_empty() {
            return Err(format!("no usable training samples for label {label}").into());
        }
        if histograms.len() < samples.len() {
            log::warn!(
                "Skipped {} unusable samples for label {label}",
                samples.len() - histograms.len()
            );
        }
        self.samples.extend(
            histograms
                .into_iter()
                .map(|histogram| TrainedSample { label, histogram }),
        );
        Ok(())
    }

    fn predict(&self, face: &Frame) -> Prediction {
        let Some(query) = describe(face) else {
            return Prediction::NoMatch;
        };
        self.samples
            .iter()
            .map(|s| (s.label, chi_square_distance(&query, &s.histogram)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(Prediction::NoMatch, |(label, distance)| {
                Prediction::Candidate { label, distance }
            })
    }

    fn export_state(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(serde_json::to_vec(&self.samples)?)
    }

    fn import_state(&mut self, state: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let samples: Vec<TrainedSample> = serde_json::from_slice(state)?;
        if let Some(bad) = samples.iter().find(|s| s.histogram.len() != GRID * GRID * BINS) {
            return Err(format!("corrupt histogram for label {}", bad.label).into());
        }
        self.samples = samples;
        Ok(())
    }

    fn reset(&mut self) {
        self.samples.clear();
    }
}

fn describe(face: &Frame) -> Option<Vec<f32>> {
    let gray = normalized_gray(face)?;
    Some(lbp_histogram(&gray, FACE_SIZE as usize))
}

/// Grayscale pixels resampled to `FACE_SIZE` x `FACE_SIZE`.
fn normalized_gray(face: &Frame) -> Option<Vec<u8>> {
    if face.is_empty() || face.channels() == 0 {
        return None;
    }
    let gray = to_grayscale(face);
    if face.width() == FACE_SIZE && face.height() == FACE_SIZE {
        return Some(gray);
    }
    let img = image::GrayImage::from_raw(face.width(), face.height(), gray)?;
    Some(image::imageops::resize(&img, FACE_SIZE, FACE_SIZE, FilterType::Triangle).into_raw())
}

fn to_grayscale(frame: &Frame) -> Vec<u8> {
    let pixels = frame.as_ndarray();
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    let mut gray = Vec::with_capacity(w * h);
    for row in 0..h {
        for col in 0..w {
            let value = if frame.channels() >= 3 {
                let r = pixels[[row, col, 0]] as f64;
                let g = pixels[[row, col, 1]] as f64;
                let b = pixels[[row, col, 2]] as f64;
                (0.299 * r + 0.587 * g + 0.114 * b).round() as u8
            } else {
                pixels[[row, col, 0]]
            };
            gray.push(value);
        }
    }
    gray
}

/// Concatenated per-cell LBP histograms, each cell normalized to sum 1.
fn lbp_histogram(gray: &[u8], size: usize) -> Vec<f32> {
    const NEIGHBOURS: [(isize, isize); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
        (1, 0),
        (1, -1),
        (0, -1),
    ];

    let mut hist = vec![0.0f32; GRID * GRID * BINS];
    let mut counts = [0u32; GRID * GRID];
    let inner = size - 2;

    for row in 1..size - 1 {
        for col in 1..size - 1 {
            let center = gray[row * size + col];
            let mut code = 0usize;
            for (bit, (dr, dc)) in NEIGHBOURS.iter().enumerate() {
                let r = (row as isize + dr) as usize;
                let c = (col as isize + dc) as usize;
                if gray[r * size + c] >= center {
                    code |= 1 << bit;
                }
            }
            let cell = ((row - 1) * GRID / inner) * GRID + (col - 1) * GRID / inner;
            hist[cell * BINS + code / CODES_PER_BIN] += 1.0;
            counts[cell] += 1;
        }
    }

    for (cell, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        for v in &mut hist[cell * BINS..(cell + 1) * BINS] {
            *v /= count as f32;
        }
    }
    hist
}

fn chi_square_distance(a: &[f32], b: &[f32]) -> f64 {
    let chi: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            let sum = x + y;
            if sum > 0.0 {
                (x - y) * (x - y) / sum
            } else {
                0.0
            }
        })
        .sum();
    chi / (GRID * GRID) as f64 * DISTANCE_SCALE
}
