//! Pose normalization: warp a face patch into eye-aligned canonical coordinates.

use nalgebra::{Matrix3, Point2, Vector3};
use ndarray::{Array3, ArrayView3};

use crate::error::AlignmentFailure;
use crate::tracker::EYE_LANDMARKS;

/// Maps a raw face patch to a canonical patch suitable for an embedding model.
pub trait PoseNormalizer {
    fn normalize(
        &self,
        patch: ArrayView3<'_, u8>,
        landmarks: &[Point2<f32>],
    ) -> Result<Array3<u8>, AlignmentFailure>;
}

/// Geometry of the canonical face chip.
#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Left-eye position as a fraction of the output size
    pub desired_left_eye: (f64, f64),
    pub face_width: usize,
    pub face_height: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            desired_left_eye: (0.3, 0.3),
            face_width: 150,
            face_height: 150,
        }
    }
}

/// Rotates and scales the patch about the eye midpoint so that the eyes are
/// level and a fixed distance apart.
///
/// Eye centres keep sub-pixel precision and sampling is bilinear, so chips
/// differ slightly from aligners that round centres to whole pixels and
/// resample bicubically.
#[derive(Debug, Clone, Default)]
pub struct EyeAligner {
    config: AlignerConfig,
}

impl EyeAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Forward affine transform from patch to canonical coordinates.
    pub fn transform(&self, landmarks: &[Point2<f32>]) -> Result<Matrix3<f64>, AlignmentFailure> {
        if landmarks.len() < EYE_LANDMARKS {
            return Err(AlignmentFailure::InvalidLandmark {
                index: landmarks.len(),
            });
        }
        let mut eyes = [Point2::origin(); EYE_LANDMARKS];
        for (index, p) in landmarks.iter().take(EYE_LANDMARKS).enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(AlignmentFailure::InvalidLandmark { index });
            }
            eyes[index] = Point2::new(p.x as f64, p.y as f64);
        }

        let right_eye = nalgebra::center(&eyes[0], &eyes[1]);
        let left_eye = nalgebra::center(&eyes[2], &eyes[3]);

        let d_y = right_eye.y - left_eye.y;
        let d_x = right_eye.x - left_eye.x;
        let dist = (d_x * d_x + d_y * d_y).sqrt();
        if dist <= f64::EPSILON {
            return Err(AlignmentFailure::DegenerateEyes);
        }
        let angle = (d_y.atan2(d_x).to_degrees() - 180.0).to_radians();

        let (left_x, left_y) = self.config.desired_left_eye;
        let desired_dist = (1.0 - 2.0 * left_x) * self.config.face_width as f64;
        let scale = desired_dist / dist;

        let eyes_centre = nalgebra::center(&left_eye, &right_eye);
        let alpha = scale * angle.cos();
        let beta = scale * angle.sin();

        // Rotation about the eye midpoint, then shift the midpoint to its
        // canonical position.
        let t_x = self.config.face_width as f64 * 0.5;
        let t_y = self.config.face_height as f64 * left_y;
        let shift_x = (1.0 - alpha) * eyes_centre.x - beta * eyes_centre.y + (t_x - eyes_centre.x);
        let shift_y = beta * eyes_centre.x + (1.0 - alpha) * eyes_centre.y + (t_y - eyes_centre.y);

        Ok(Matrix3::new(
            alpha, beta, shift_x, //
            -beta, alpha, shift_y, //
            0.0, 0.0, 1.0,
        ))
    }
}

impl PoseNormalizer for EyeAligner {
    fn normalize(
        &self,
        patch: ArrayView3<'_, u8>,
        landmarks: &[Point2<f32>],
    ) -> Result<Array3<u8>, AlignmentFailure> {
        if patch.is_empty() {
            return Err(AlignmentFailure::EmptyPatch);
        }
        let forward = self.transform(landmarks)?;
        let inverse = forward
            .try_inverse()
            .ok_or(AlignmentFailure::SingularTransform)?;
        Ok(warp_affine(
            patch,
            &inverse,
            self.config.face_width,
            self.config.face_height,
        ))
    }
}

/// Sample every output pixel from its inverse-mapped source location with
/// bilinear interpolation. Locations outside the source stay 0.
fn warp_affine(
    src: ArrayView3<'_, u8>,
    inverse: &Matrix3<f64>,
    width: usize,
    height: usize,
) -> Array3<u8> {
    let (src_h, src_w, channels) = src.dim();
    let max_x = (src_w - 1) as f64;
    let max_y = (src_h - 1) as f64;
    let mut out = Array3::<u8>::zeros((height, width, channels));

    for y in 0..height {
        for x in 0..width {
            let p = inverse * Vector3::new(x as f64, y as f64, 1.0);
            let (sx, sy) = (p.x, p.y);
            if !(0.0..=max_x).contains(&sx) || !(0.0..=max_y).contains(&sy) {
                continue;
            }

            let x0 = sx.floor() as usize;
            let y0 = sy.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let y1 = (y0 + 1).min(src_h - 1);
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;

            for c in 0..channels {
                let top = src[[y0, x0, c]] as f64 * (1.0 - fx) + src[[y0, x1, c]] as f64 * fx;
                let bottom = src[[y1, x0, c]] as f64 * (1.0 - fx) + src[[y1, x1, c]] as f64 * fx;
                let value = top * (1.0 - fy) + bottom * fy;
                out[[y, x, c]] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Subject's right eye sits at the smaller image x.
    fn level_eyes(cx: f32, cy: f32, half_span: f32) -> Vec<Point2<f32>> {
        vec![
            Point2::new(cx - half_span - 2.0, cy),
            Point2::new(cx - half_span + 2.0, cy),
            Point2::new(cx + half_span - 2.0, cy),
            Point2::new(cx + half_span + 2.0, cy),
            Point2::new(cx, cy + 15.0),
        ]
    }

    fn apply(m: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
        let p = m * Vector3::new(x, y, 1.0);
        (p.x, p.y)
    }

    #[test]
    fn test_eyes_land_on_canonical_positions() {
        let aligner = EyeAligner::default();
        let m = aligner.transform(&level_eyes(30.0, 25.0, 10.0)).unwrap();

        // Eye distance 20 is scaled to 0.4 * 150 = 60.
        let (rx, ry) = apply(&m, 20.0, 25.0);
        assert_relative_eq!(rx, 45.0, epsilon = 1e-9);
        assert_relative_eq!(ry, 45.0, epsilon = 1e-9);

        let (lx, ly) = apply(&m, 40.0, 25.0);
        assert_relative_eq!(lx, 105.0, epsilon = 1e-9);
        assert_relative_eq!(ly, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tilted_eyes_are_levelled() {
        let aligner = EyeAligner::default();
        let landmarks = vec![
            Point2::new(20.0, 20.0),
            Point2::new(20.0, 20.0),
            Point2::new(40.0, 40.0),
            Point2::new(40.0, 40.0),
        ];
        let m = aligner.transform(&landmarks).unwrap();
        let (_, ry) = apply(&m, 20.0, 20.0);
        let (_, ly) = apply(&m, 40.0, 40.0);
        assert_relative_eq!(ry, ly, epsilon = 1e-9);
    }

    #[test]
    fn test_uniform_patch_stays_uniform() {
        let aligner = EyeAligner::default();
        let patch = Array3::from_elem((60, 60, 3), 200u8);
        let out = aligner
            .normalize(patch.view(), &level_eyes(30.0, 25.0, 10.0))
            .unwrap();
        assert_eq!(out.dim(), (150, 150, 3));
        assert!(out.iter().all(|&v| v == 200));
    }

    #[test]
    fn test_outside_source_is_black() {
        let aligner = EyeAligner::default();
        let patch = Array3::from_elem((12, 12, 1), 255u8);
        let out = aligner
            .normalize(patch.view(), &level_eyes(6.0, 6.0, 4.0))
            .unwrap();
        assert_eq!(out[[0, 0, 0]], 0);
        assert_eq!(out[[45, 75, 0]], 255);
    }

    #[test]
    fn test_degenerate_eyes() {
        let aligner = EyeAligner::default();
        let patch = Array3::from_elem((10, 10, 3), 1u8);
        let landmarks = vec![Point2::new(5.0, 5.0); 4];
        assert_eq!(
            aligner.normalize(patch.view(), &landmarks),
            Err(AlignmentFailure::DegenerateEyes)
        );
    }

    #[test]
    fn test_empty_patch() {
        let aligner = EyeAligner::default();
        let patch = Array3::<u8>::zeros((0, 10, 3));
        assert_eq!(
            aligner.normalize(patch.view(), &level_eyes(5.0, 5.0, 2.0)),
            Err(AlignmentFailure::EmptyPatch)
        );
    }

    #[test]
    fn test_non_finite_landmark() {
        let aligner = EyeAligner::default();
        let mut landmarks = level_eyes(30.0, 25.0, 10.0);
        landmarks[2] = Point2::new(f32::NAN, 1.0);
        assert_eq!(
            aligner.transform(&landmarks),
            Err(AlignmentFailure::InvalidLandmark { index: 2 })
        );
    }

    #[test]
    fn test_centred_eyes_give_singular_transform() {
        let aligner = EyeAligner::new(AlignerConfig {
            desired_left_eye: (0.5, 0.3),
            ..AlignerConfig::default()
        });
        let patch = Array3::from_elem((60, 60, 3), 1u8);
        assert_eq!(
            aligner.normalize(patch.view(), &level_eyes(30.0, 25.0, 10.0)),
            Err(AlignmentFailure::SingularTransform)
        );
    }
}
