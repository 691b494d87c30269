//! Cloud-layer height overlay points
//!
//! The instrument reports cloud layer heights as a time x layer array. For the
//! scatter overlay this is flattened to (time, height) pairs: each timestamp is
//! repeated once per layer column and pairs without a reported height (NaN) are
//! dropped.

use chrono::{DateTime, Utc};
use ndarray::Array2;

/// Flatten a time x layer height array (metres) into (time, height_km) scatter
/// points, dropping NaN heights.
pub fn cloud_points(times: &[DateTime<Utc>], heights_m: &Array2<f64>) -> Vec<(DateTime<Utc>, f64)> {
    let mut points = Vec::new();
    for (i, row) in heights_m.rows().into_iter().enumerate() {
        for height in row.iter() {
            if height.is_nan() {
                continue;
            }
            points.push((times[i], height / 1000.0));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::array;

    #[test]
    fn test_flattens_and_drops_nan() {
        let t0 = Utc.with_ymd_and_hms(2025, 4, 29, 9, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 4, 29, 10, 0, 0).unwrap();
        // 2x3 with a single NaN: exactly 5 points survive
        let heights = array![
            [1000.0, 2500.0, f64::NAN],
            [1100.0, 2600.0, 7800.0]
        ];

        let points = cloud_points(&[t0, t1], &heights);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (t0, 1.0));
        assert_eq!(points[1], (t0, 2.5));
        assert_eq!(points[2], (t1, 1.1));
        assert_eq!(points[4], (t1, 7.8));
        assert!(points.iter().all(|(_, h)| h.is_finite()));
    }

    #[test]
    fn test_single_layer_column() {
        let t0 = Utc.with_ymd_and_hms(2025, 4, 29, 9, 0, 0).unwrap();
        let heights = array![[f64::NAN]];
        assert!(cloud_points(&[t0], &heights).is_empty());
    }
}
