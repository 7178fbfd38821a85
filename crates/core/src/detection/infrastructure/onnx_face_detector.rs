//! YOLO-style face detection through ONNX Runtime (`ort`).
use std::path::Path;

use image::imageops::{self, FilterType};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::math::bbox_iou;

/// Square input side used when the model leaves it dynamic.
const FALLBACK_INPUT_SIDE: u32 = 640;

/// Boxes overlapping a stronger one by more than this are dropped.
const OVERLAP_LIMIT: f64 = 0.45;

/// Letterbox fill, 114 gray as the YOLO exporters expect.
const PAD_LEVEL: f32 = 114.0 / 255.0;

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    min_score: f64,
    input_side: u32,
}

impl OnnxFaceDetector {
    /// Opens the model at `model_path`. Candidates scoring below
    /// `min_score` are discarded before overlap suppression.
    pub fn new(model_path: &Path, min_score: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_side = declared_input_side(&session).unwrap_or(FALLBACK_INPUT_SIDE);
        log::debug!(
            "Face model {} ready, input {input_side}x{input_side}",
            model_path.display()
        );

        Ok(Self {
            session,
            min_score,
            input_side,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        min_size: u32,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let fit = Letterbox::fit(frame.width(), frame.height(), self.input_side);
        let input = ort::value::Tensor::from_array(input_tensor(frame, &fit))?;
        let outputs = self.session.run(ort::inputs![input])?;
        if outputs.len() == 0 {
            return Err("face model returned no outputs".into());
        }

        let raw = outputs[0].try_extract_array::<f32>()?;
        let values: Vec<f32> = raw.iter().copied().collect();
        let candidates = decode(&values, raw.shape(), self.min_score, &fit)?;

        let kept = suppress_overlaps(candidates, OVERLAP_LIMIT);
        Ok(into_regions(&kept, frame.width(), frame.height(), min_size))
    }
}

/// Spatial side of an NCHW model input, when the model fixes it.
fn declared_input_side(session: &ort::session::Session) -> Option<u32> {
    let input = session.inputs().first()?;
    if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
        if shape.len() == 4 && shape[2] > 0 {
            return Some(shape[2] as u32);
        }
    }
    None
}

/// CoreML on macOS, DirectML on Windows, plain CPU elsewhere. ONNX Runtime
/// falls back to CPU when the accelerated provider cannot be registered.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}

/// Placement of a frame inside the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    side: u32,
    scale: f64,
    width: u32,
    height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(frame_width: u32, frame_height: u32, side: u32) -> Self {
        let scale = (side as f64 / frame_width as f64).min(side as f64 / frame_height as f64);
        let width = ((frame_width as f64 * scale).round() as u32).clamp(1, side);
        let height = ((frame_height as f64 * scale).round() as u32).clamp(1, side);
        Self {
            side,
            scale,
            width,
            height,
            pad_x: (side - width) / 2,
            pad_y: (side - height) / 2,
        }
    }

    /// Maps a model-space center box back to frame `[x1, y1, x2, y2]`.
    fn to_frame(&self, cx: f64, cy: f64, w: f64, h: f64) -> [f64; 4] {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        [
            (cx - w / 2.0 - px) / self.scale,
            (cy - h / 2.0 - py) / self.scale,
            (cx + w / 2.0 - px) / self.scale,
            (cy + h / 2.0 - py) / self.scale,
        ]
    }
}

/// Resizes the frame into its letterbox slot as a `[1, 3, side, side]`
/// tensor scaled to `0..=1`. Gray frames fill all three channels.
fn input_tensor(frame: &Frame, fit: &Letterbox) -> ndarray::Array4<f32> {
    let side = fit.side as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_LEVEL);

    let resized = imageops::resize(&frame.to_rgb_image(), fit.width, fit.height, FilterType::Triangle);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let row = (fit.pad_y + y) as usize;
        let col = (fit.pad_x + x) as usize;
        for (c, value) in pixel.0.iter().enumerate() {
            tensor[[0, c, row, col]] = *value as f32 / 255.0;
        }
    }
    tensor
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    bbox: [f64; 4],
    score: f64,
}

/// Reads `[cx, cy, w, h, score, ..]` rows from a `[1, A, B]` output.
///
/// Exporters disagree on orientation; the shorter axis holds the features.
fn decode(
    values: &[f32],
    shape: &[usize],
    min_score: f64,
    fit: &Letterbox,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    let &[_, a, b] = shape else {
        return Err(format!("unexpected face model output shape {shape:?}").into());
    };
    if values.len() < a * b {
        return Err("face model output is shorter than its shape".into());
    }

    let features_first = a < b;
    let (count, features) = if features_first { (b, a) } else { (a, b) };
    if features < 5 {
        return Ok(Vec::new());
    }
    let at = |det: usize, feature: usize| -> f64 {
        let idx = if features_first {
            feature * count + det
        } else {
            det * features + feature
        };
        values[idx] as f64
    };

    Ok((0..count)
        .filter(|&det| at(det, 4) >= min_score)
        .map(|det| Candidate {
            bbox: fit.to_frame(at(det, 0), at(det, 1), at(det, 2), at(det, 3)),
            score: at(det, 4),
        })
        .collect())
}

/// Greedy non-maximum suppression, strongest first.
fn suppress_overlaps(mut candidates: Vec<Candidate>, limit: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| bbox_iou(&k.bbox, &candidate.bbox) <= limit) {
            kept.push(candidate);
        }
    }
    kept
}

/// Rounds to integer rectangles clipped to the frame; faces narrower or
/// shorter than `min_size` after clipping are dropped.
fn into_regions(kept: &[Candidate], width: u32, height: u32, min_size: u32) -> Vec<Region> {
    let min = min_size as i32;
    kept.iter()
        .map(|c| {
            let [x1, y1, x2, y2] = c.bbox.map(|v| v.round() as i32);
            Region::new(x1, y1, x2 - x1, y2 - y1).clip_to(width, height)
        })
        .filter(|r| r.width >= min && r.height >= min)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidate(bbox: [f64; 4], score: f64) -> Candidate {
        Candidate { bbox, score }
    }

    fn identity() -> Letterbox {
        Letterbox::fit(640, 640, 640)
    }

    #[test]
    fn test_wide_frame_is_padded_top_and_bottom() {
        let fit = Letterbox::fit(320, 240, 640);
        assert_relative_eq!(fit.scale, 2.0);
        assert_eq!((fit.width, fit.height), (640, 480));
        assert_eq!((fit.pad_x, fit.pad_y), (0, 80));
    }

    #[test]
    fn test_letterbox_maps_back_to_frame() {
        let fit = Letterbox::fit(320, 240, 640);
        // model box centered at (200, 280), 100x60 -> frame (75, 85)-(125, 115)
        let bbox = fit.to_frame(200.0, 280.0, 100.0, 60.0);
        for (got, want) in bbox.iter().zip([75.0, 85.0, 125.0, 115.0]) {
            assert_relative_eq!(*got, want);
        }
    }

    #[test]
    fn test_input_tensor_fills_padding_and_replicates_gray() {
        let frame = Frame::new(vec![255u8; 64 * 32], 64, 32, 1);
        let fit = Letterbox::fit(64, 32, 64);
        let tensor = input_tensor(&frame, &fit);

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_relative_eq!(tensor[[0, 1, 0, 0]], PAD_LEVEL);
        let row = fit.pad_y as usize + 4;
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, row, 10]], 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_decode_reads_both_orientations() {
        // two detections, five features: one above and one below min_score
        let rows = [
            [100.0, 100.0, 40.0, 40.0, 0.9],
            [300.0, 300.0, 40.0, 40.0, 0.2],
        ];
        let row_major: Vec<f32> = rows.iter().flatten().copied().collect();
        let mut feature_major = Vec::new();
        for f in 0..5 {
            for row in &rows {
                feature_major.push(row[f]);
            }
        }
        // pad both layouts with empty detections so the feature axis is
        // the shorter one
        let mut wide = Vec::new();
        for f in 0..5 {
            wide.extend_from_slice(&feature_major[f * 2..f * 2 + 2]);
            wide.extend_from_slice(&[0.0; 4]);
        }
        let mut tall = row_major;
        for _ in 0..4 {
            tall.extend_from_slice(&[0.0; 5]);
        }

        let from_rows = decode(&tall, &[1, 6, 5], 0.5, &identity()).unwrap();
        let from_features = decode(&wide, &[1, 5, 6], 0.5, &identity()).unwrap();

        let expected = vec![candidate([80.0, 80.0, 120.0, 120.0], 0.9f32 as f64)];
        assert_eq!(from_rows, expected);
        assert_eq!(from_features, expected);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode(&[0.0; 10], &[2, 5], 0.5, &identity()).is_err());
        assert!(decode(&[0.0; 4], &[1, 2, 5], 0.5, &identity()).is_err());
    }

    #[test]
    fn test_overlapping_boxes_keep_the_strongest() {
        let kept = suppress_overlaps(
            vec![
                candidate([0.0, 0.0, 100.0, 100.0], 0.6),
                candidate([4.0, 4.0, 104.0, 104.0], 0.95),
                candidate([300.0, 300.0, 360.0, 360.0], 0.7),
            ],
            OVERLAP_LIMIT,
        );
        let scores: Vec<f64> = kept.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.95, 0.7]);
    }

    #[test]
    fn test_small_faces_are_dropped() {
        let kept = [
            candidate([10.0, 10.0, 90.0, 90.0], 0.9),
            candidate([200.0, 200.0, 230.0, 230.0], 0.9),
        ];
        assert_eq!(into_regions(&kept, 640, 480, 40), vec![Region::new(10, 10, 80, 80)]);
    }

    #[test]
    fn test_regions_are_clipped_before_size_check() {
        let kept = [candidate([-20.0, 400.0, 80.0, 520.0], 0.9)];
        assert_eq!(into_regions(&kept, 640, 480, 10), vec![Region::new(0, 400, 80, 80)]);
        assert!(into_regions(&kept, 640, 480, 90).is_empty());
    }
}
