//! Segregation of raw (x, y, z) triplets into clean, missing and special subsets

use super::error::BinningError;

/// Parallel x/y/z arrays for one subset of the input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triplets {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Triplets {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    fn push(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }
}

/// Input split into the three disjoint subsets, original order preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segments {
    pub clean: Triplets,
    pub missing: Triplets,
    pub special: Triplets,
}

/// Category a single (x, y) pair falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Clean,
    Missing,
    Special,
}

/// Classify one pair. Special codes take precedence over missing values.
#[inline]
pub fn classify(x: f64, y: f64, special_codes_x: &[f64], special_codes_y: &[f64]) -> SampleKind {
    if special_codes_x.contains(&x) || special_codes_y.contains(&y) {
        SampleKind::Special
    } else if !x.is_finite() || !y.is_finite() {
        SampleKind::Missing
    } else {
        SampleKind::Clean
    }
}

/// Split the input into clean, missing and special subsets.
///
/// Every index lands in exactly one subset. When `check_input` is set, a
/// clean sample with a non-finite target is rejected.
pub fn split_data(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    special_codes_x: &[f64],
    special_codes_y: &[f64],
    check_input: bool,
) -> Result<Segments, BinningError> {
    if x.len() != y.len() || x.len() != z.len() {
        return Err(BinningError::LengthMismatch {
            x: x.len(),
            y: y.len(),
            z: z.len(),
        });
    }

    let mut segments = Segments::default();

    for (index, ((&xi, &yi), &zi)) in x.iter().zip(y).zip(z).enumerate() {
        match classify(xi, yi, special_codes_x, special_codes_y) {
            SampleKind::Special => segments.special.push(xi, yi, zi),
            SampleKind::Missing => segments.missing.push(xi, yi, zi),
            SampleKind::Clean => {
                if check_input && !zi.is_finite() {
                    return Err(BinningError::NonFiniteTarget { index });
                }
                segments.clean.push(xi, yi, zi);
            }
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_covers_every_sample_once() {
        let x = [1.0, f64::NAN, -999.0, 4.0, 5.0, f64::INFINITY];
        let y = [1.0, 2.0, 3.0, f64::NAN, -1.0, 6.0];
        let z = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];

        let seg = split_data(&x, &y, &z, &[-999.0], &[-1.0], false).unwrap();

        assert_eq!(seg.clean.z, vec![10.0]);
        assert_eq!(seg.missing.z, vec![20.0, 40.0, 60.0]);
        assert_eq!(seg.special.z, vec![30.0, 50.0]);
        assert_eq!(seg.clean.len() + seg.missing.len() + seg.special.len(), z.len());
    }

    #[test]
    fn test_special_takes_precedence_over_missing() {
        assert_eq!(classify(-999.0, f64::NAN, &[-999.0], &[]), SampleKind::Special);
        assert_eq!(classify(f64::NAN, 7.0, &[], &[7.0]), SampleKind::Special);
        assert_eq!(classify(f64::NAN, 7.0, &[], &[]), SampleKind::Missing);
        assert_eq!(classify(0.0, 7.0, &[], &[]), SampleKind::Clean);
    }

    #[test]
    fn test_split_preserves_order() {
        let x = [3.0, 1.0, 2.0];
        let y = [0.0, 0.0, 0.0];
        let z = [0.3, 0.1, 0.2];

        let seg = split_data(&x, &y, &z, &[], &[], false).unwrap();
        assert_eq!(seg.clean.x, vec![3.0, 1.0, 2.0]);
        assert_eq!(seg.clean.z, vec![0.3, 0.1, 0.2]);
        assert!(seg.missing.is_empty());
        assert!(seg.special.is_empty());
    }

    #[test]
    fn test_split_rejects_length_mismatch() {
        let err = split_data(&[1.0, 2.0], &[1.0], &[1.0, 2.0], &[], &[], false).unwrap_err();
        assert_eq!(err, BinningError::LengthMismatch { x: 2, y: 1, z: 2 });
    }

    #[test]
    fn test_check_input_rejects_non_finite_target() {
        let x = [1.0, 2.0];
        let y = [1.0, 2.0];
        let z = [1.0, f64::NAN];

        assert!(split_data(&x, &y, &z, &[], &[], false).is_ok());
        let err = split_data(&x, &y, &z, &[], &[], true).unwrap_err();
        assert_eq!(err, BinningError::NonFiniteTarget { index: 1 });
    }
}
