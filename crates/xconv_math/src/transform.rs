// Row-major matrix utilities for DMat4
//
// The legacy text format stores transforms as 16 row-major floats using the
// row-vector convention (translation in the fourth row). glam uses column
// vectors, so the same 16 numbers read as a column-major array give the
// equivalent glam matrix.

use glam::DMat4;

/// Extension trait for DMat4 to move between glam and legacy row layout.
pub trait DMat4Ext {
    /// Build a matrix from 16 row-major values in row-vector convention.
    fn from_legacy_rows(values: &[f64; 16]) -> Self;

    /// The four legacy rows of this matrix.
    fn to_legacy_rows(&self) -> [[f64; 4]; 4];

    /// True when every element is within `epsilon` of the identity.
    fn is_near_identity(&self, epsilon: f64) -> bool;
}

impl DMat4Ext for DMat4 {
    fn from_legacy_rows(values: &[f64; 16]) -> Self {
        DMat4::from_cols_array(values)
    }

    fn to_legacy_rows(&self) -> [[f64; 4]; 4] {
        let flat = self.to_cols_array();
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&flat[i * 4..i * 4 + 4]);
        }
        rows
    }

    fn is_near_identity(&self, epsilon: f64) -> bool {
        self.abs_diff_eq(DMat4::IDENTITY, epsilon)
    }
}

/// Format a float with the fixed six decimal places the legacy grammar uses.
pub fn format_fixed(value: f64) -> String {
    format!("{:.6}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_legacy_rows_translation() {
        let values = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            10.0, 20.0, 30.0, 1.0,
        ];
        let mat = DMat4::from_legacy_rows(&values);
        let moved = mat.transform_point3(DVec3::ZERO);

        assert_eq!(moved, DVec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_legacy_rows_roundtrip() {
        let values: [f64; 16] = std::array::from_fn(|i| i as f64);
        let rows = DMat4::from_legacy_rows(&values).to_legacy_rows();

        assert_eq!(rows[0], [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(rows[3], [12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn test_is_near_identity() {
        assert!(DMat4::IDENTITY.is_near_identity(1e-9));
        assert!(!DMat4::from_translation(DVec3::X).is_near_identity(1e-9));
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(1.0), "1.000000");
        assert_eq!(format_fixed(-0.25), "-0.250000");
        assert_eq!(format_fixed(0.1234567), "0.123457");
    }
}
