//! Homogeneous affine matrix construction.
//!
//! Matrices act on column vectors of voxel coordinates in array axis order,
//! with the homogeneous component last.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Rotation matrix for a 2D or 3D grid.
///
/// In 2D the first angle rotates the plane of axes (0, 1). In 3D up to three
/// angles are used, rotating about axis 0, then axis 1, then axis 2, composed
/// as `Rx @ Ry @ Rz`.
///
/// # Errors
/// `DimensionMismatch` for any other spatial rank.
pub fn create_rotate(spatial_dims: usize, radians: &[f64]) -> Result<DMatrix<f64>> {
    match spatial_dims {
        2 => {
            let mut affine = DMatrix::identity(3, 3);
            if let Some(&theta) = radians.first() {
                let (s, c) = theta.sin_cos();
                affine[(0, 0)] = c;
                affine[(0, 1)] = -s;
                affine[(1, 0)] = s;
                affine[(1, 1)] = c;
            }
            Ok(affine)
        }
        3 => {
            let mut affine = DMatrix::identity(4, 4);
            if let Some(&theta) = radians.first() {
                let (s, c) = theta.sin_cos();
                affine = DMatrix::from_row_slice(
                    4,
                    4,
                    &[
                        1.0, 0.0, 0.0, 0.0, //
                        0.0, c, -s, 0.0, //
                        0.0, s, c, 0.0, //
                        0.0, 0.0, 0.0, 1.0,
                    ],
                );
            }
            if let Some(&theta) = radians.get(1) {
                let (s, c) = theta.sin_cos();
                affine *= DMatrix::from_row_slice(
                    4,
                    4,
                    &[
                        c, 0.0, s, 0.0, //
                        0.0, 1.0, 0.0, 0.0, //
                        -s, 0.0, c, 0.0, //
                        0.0, 0.0, 0.0, 1.0,
                    ],
                );
            }
            if let Some(&theta) = radians.get(2) {
                let (s, c) = theta.sin_cos();
                affine *= DMatrix::from_row_slice(
                    4,
                    4,
                    &[
                        c, -s, 0.0, 0.0, //
                        s, c, 0.0, 0.0, //
                        0.0, 0.0, 1.0, 0.0, //
                        0.0, 0.0, 0.0, 1.0,
                    ],
                );
            }
            Ok(affine)
        }
        _ => Err(TransformError::dimension_mismatch(format!(
            "rotation is defined for 2 or 3 spatial dimensions, got {}",
            spatial_dims
        ))),
    }
}

/// Shearing matrix for a 2D or 3D grid.
///
/// 2D uses two coefficients `[[1, c0], [c1, 1]]`; 3D uses six,
/// `[[1, c0, c1], [c2, 1, c3], [c4, c5, 1]]`. Missing coefficients are zero.
pub fn create_shear(spatial_dims: usize, coefs: &[f64]) -> Result<DMatrix<f64>> {
    let coef = |i: usize| coefs.get(i).copied().unwrap_or(0.0);
    match spatial_dims {
        2 => Ok(DMatrix::from_row_slice(
            3,
            3,
            &[
                1.0, coef(0), 0.0, //
                coef(1), 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
        )),
        3 => Ok(DMatrix::from_row_slice(
            4,
            4,
            &[
                1.0, coef(0), coef(1), 0.0, //
                coef(2), 1.0, coef(3), 0.0, //
                coef(4), coef(5), 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        )),
        _ => Err(TransformError::dimension_mismatch(format!(
            "shearing is defined for 2 or 3 spatial dimensions, got {}",
            spatial_dims
        ))),
    }
}

/// Scaling matrix. Missing factors are 1, extra factors are ignored.
pub fn create_scale(spatial_dims: usize, factors: &[f64]) -> DMatrix<f64> {
    let mut affine = DMatrix::identity(spatial_dims + 1, spatial_dims + 1);
    for (i, &f) in factors.iter().take(spatial_dims).enumerate() {
        affine[(i, i)] = f;
    }
    affine
}

/// Translation matrix. Missing shifts are 0, extra shifts are ignored.
pub fn create_translate(spatial_dims: usize, shifts: &[f64]) -> DMatrix<f64> {
    let mut affine = DMatrix::identity(spatial_dims + 1, spatial_dims + 1);
    for (i, &t) in shifts.iter().take(spatial_dims).enumerate() {
        affine[(i, spatial_dims)] = t;
    }
    affine
}

/// Conjugate `matrix` so that it acts about `centre` instead of the origin:
/// `T(centre) @ matrix @ T(-centre)`.
pub fn about_point(matrix: &DMatrix<f64>, centre: &[f64]) -> DMatrix<f64> {
    let dims = matrix.nrows() - 1;
    let negated: Vec<f64> = centre.iter().map(|c| -c).collect();
    create_translate(dims, centre) * matrix * create_translate(dims, &negated)
}

/// Elementary affine parameters, composed in rotate, shear, translate, scale
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffineParams {
    /// Rotation angles in radians (1 value in 2D, up to 3 in 3D).
    pub rotate: Vec<f64>,
    /// Shear coefficients (2 in 2D, 6 in 3D).
    pub shear: Vec<f64>,
    /// Translation in voxels.
    pub translate: Vec<f64>,
    /// Scale factors, 1.0 is a no-op.
    pub scale: Vec<f64>,
}

impl AffineParams {
    /// Compose the matrix `R @ S @ T @ Sc`. Empty parameter lists are skipped.
    pub fn to_matrix(&self, spatial_dims: usize) -> Result<DMatrix<f64>> {
        let mut affine = DMatrix::identity(spatial_dims + 1, spatial_dims + 1);
        if !self.rotate.is_empty() {
            affine *= create_rotate(spatial_dims, &self.rotate)?;
        }
        if !self.shear.is_empty() {
            affine *= create_shear(spatial_dims, &self.shear)?;
        }
        if !self.translate.is_empty() {
            affine *= create_translate(spatial_dims, &self.translate);
        }
        if !self.scale.is_empty() {
            affine *= create_scale(spatial_dims, &self.scale);
        }
        Ok(affine)
    }

    /// True when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.rotate.is_empty()
            && self.shear.is_empty()
            && self.translate.is_empty()
            && self.scale.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_2d() {
        let r = create_rotate(2, &[FRAC_PI_2]).unwrap();
        assert!((r[(0, 1)] + 1.0).abs() < 1e-12);
        assert!((r[(1, 0)] - 1.0).abs() < 1e-12);
        assert!(r[(0, 0)].abs() < 1e-12);
    }

    #[test]
    fn test_rotate_3d_is_orthonormal() {
        let r = create_rotate(3, &[0.3, -0.2, 1.1]).unwrap();
        let rs = r.view((0, 0), (3, 3)).into_owned();
        let should_be_identity = rs.transpose() * rs;
        assert!((should_be_identity - DMatrix::<f64>::identity(3, 3)).norm() < 1e-12);
    }

    #[test]
    fn test_rotate_rejects_4d() {
        assert!(create_rotate(4, &[0.1]).is_err());
    }

    #[test]
    fn test_shear_pads_missing_coefficients() {
        let s = create_shear(3, &[0.5]).unwrap();
        assert_eq!(s[(0, 1)], 0.5);
        assert_eq!(s[(0, 2)], 0.0);
        assert_eq!(s[(2, 1)], 0.0);
    }

    #[test]
    fn test_scale_and_translate_padding() {
        let s = create_scale(3, &[2.0]);
        assert_eq!(s[(0, 0)], 2.0);
        assert_eq!(s[(1, 1)], 1.0);
        let t = create_translate(2, &[3.0, 4.0, 5.0]);
        assert_eq!(t[(0, 2)], 3.0);
        assert_eq!(t[(1, 2)], 4.0);
    }

    #[test]
    fn test_compose_order() {
        let params = AffineParams {
            translate: vec![1.0, 0.0],
            scale: vec![2.0, 2.0],
            ..Default::default()
        };
        let m = params.to_matrix(2).unwrap();
        // T @ Sc: scale first, then translate.
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(0, 2)], 1.0);
    }

    #[test]
    fn test_about_point_keeps_centre_fixed() {
        let r = create_rotate(2, &[0.7]).unwrap();
        let m = about_point(&r, &[3.0, 5.0]);
        let centre = nalgebra::DVector::from_vec(vec![3.0, 5.0, 1.0]);
        let mapped = &m * &centre;
        assert!((mapped[0] - 3.0).abs() < 1e-12);
        assert!((mapped[1] - 5.0).abs() < 1e-12);
    }
}
