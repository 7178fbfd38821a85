//! Bounding-box math used by the detection backends.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Normalized cross-correlation of two equally sized sample windows.
///
/// Returns 0.0 when either window has no variance (flat patches carry no
/// information to match on).
pub fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f32>() / n as f32;
    let mean_b = b[..n].iter().sum::<f32>() / n as f32;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    cov / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        let expected = 25.0 / 175.0;
        assert!((bbox_iou(&a, &b) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ncc_identical_windows() {
        let a = [1.0, 5.0, 2.0, 8.0];
        assert!((normalized_cross_correlation(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ncc_inverted_window() {
        let a = [1.0, 5.0, 2.0, 8.0];
        let b = [8.0, 4.0, 7.0, 1.0];
        assert!((normalized_cross_correlation(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ncc_flat_window_is_zero() {
        let a = [3.0; 4];
        let b = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(normalized_cross_correlation(&a, &b), 0.0);
    }

    #[test]
    fn test_ncc_is_brightness_invariant() {
        let a = [1.0, 5.0, 2.0, 8.0];
        let b: Vec<f32> = a.iter().map(|v| v * 2.0 + 30.0).collect();
        assert!((normalized_cross_correlation(&a, &b) - 1.0).abs() < 1e-5);
    }
}
