//! Voxel spacing arithmetic on voxel-to-world affines.
//!
//! An affine of rank `D` is a `(D + 1) x (D + 1)` matrix mapping homogeneous
//! voxel indices to world coordinates. Spacing is the norm of each of the
//! first `D` columns.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use super::orientation::io_orientation;
use crate::error::{Result, TransformError};

/// Copy the leading block of `affine` into an identity of spatial rank `r`.
///
/// The shared `d x d` block is copied, where `d` is the smaller of the two
/// ranks (at least 1). The translation column is copied only when `d > 1`.
pub fn to_affine_nd(r: usize, affine: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    embed_affine(&DMatrix::identity(r + 1, r + 1), affine)
}

/// Copy the leading block of `affine` into a copy of `target`, keeping the
/// rank of `target`.
pub fn embed_affine(target: &DMatrix<f64>, affine: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !affine.is_square() || affine.nrows() < 2 {
        return Err(TransformError::dimension_mismatch(format!(
            "affine must be a square matrix of rank 1 or more, got {}x{}",
            affine.nrows(),
            affine.ncols()
        )));
    }
    if !target.is_square() || target.nrows() < 2 {
        return Err(TransformError::dimension_mismatch(format!(
            "target affine must be square of rank 1 or more, got {}x{}",
            target.nrows(),
            target.ncols()
        )));
    }
    let mut out = target.clone();
    let r_out = out.nrows() - 1;
    let r_in = affine.nrows() - 1;
    let d = r_out.min(r_in).max(1);
    for i in 0..d {
        for j in 0..d {
            out[(i, j)] = affine[(i, j)];
        }
    }
    if d > 1 {
        for i in 0..d {
            out[(i, r_out)] = affine[(i, r_in)];
        }
    }
    Ok(out)
}

/// Voxel spacing implied by an affine: the norm of each spatial column.
pub fn affine_spacing(affine: &DMatrix<f64>) -> Vec<f64> {
    let d = affine.ncols() - 1;
    (0..d).map(|j| affine.column(j).norm()).collect()
}

/// Element-wise `|a - b| <= atol + rtol * |b|`.
pub fn allclose(a: &DMatrix<f64>, b: &DMatrix<f64>, rtol: f64, atol: f64) -> bool {
    a.shape() == b.shape()
        && a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

/// New affine with the requested voxel spacing.
///
/// # Arguments
/// * `affine` - Square affine of spatial rank `d`
/// * `scale` - Target spacing; missing or non-positive entries fall back to the
///   spacing of `affine`
/// * `diagonal` - If true return `diag(scale, 1)`, discarding rotation,
///   shearing and translation. Otherwise keep the orthogonal rotation and
///   axis polarity of `affine` and only change the spacing magnitude.
pub fn zoom_affine(affine: &DMatrix<f64>, scale: &[f64], diagonal: bool) -> Result<DMatrix<f64>> {
    if !affine.is_square() || affine.nrows() < 2 {
        return Err(TransformError::dimension_mismatch(format!(
            "affine must be a square matrix of rank 1 or more, got {}x{}",
            affine.nrows(),
            affine.ncols()
        )));
    }
    let d = affine.nrows() - 1;
    let norm = affine_spacing(affine);
    let scale: Vec<f64> = (0..d)
        .map(|i| match scale.get(i) {
            Some(&s) if s > 0.0 => s,
            _ => norm[i],
        })
        .collect();

    if diagonal {
        return Ok(diagonal_affine(&scale));
    }

    let rzs = affine.view((0, 0), (d, d)).into_owned();
    let Some(cholesky) = (rzs.transpose() * &rzs).cholesky() else {
        warn!("affine is degenerate, falling back to a diagonal affine for the new spacing");
        return Ok(diagonal_affine(&scale));
    };
    // Upper triangular factor: rzs = rotation @ zs.
    let zs = cholesky.l().transpose();
    let Some(zs_inv) = zs.clone().try_inverse() else {
        warn!("affine is degenerate, falling back to a diagonal affine for the new spacing");
        return Ok(diagonal_affine(&scale));
    };
    let rotation = &rzs * zs_inv;
    let signed: Vec<f64> = (0..d)
        .map(|i| zs[(i, i)].signum() * scale[i].abs())
        .collect();
    let block = rotation * DMatrix::from_diagonal(&DVector::from_vec(signed));

    let mut new_affine = DMatrix::identity(d + 1, d + 1);
    new_affine.view_mut((0, 0), (d, d)).copy_from(&block);
    Ok(new_affine)
}

fn diagonal_affine(scale: &[f64]) -> DMatrix<f64> {
    let mut diag = scale.to_vec();
    diag.push(1.0);
    DMatrix::from_diagonal(&DVector::from_vec(diag))
}

/// Output shape and origin offset when resampling `in_affine` space into
/// `out_affine` space.
///
/// The corners `(0, dim - 1)` of the input are mapped to world space by
/// `in_affine` and back to voxel space by `out_affine^-1`. The output extent is
/// the rounded bounding box size plus one. When both affines share an
/// orientation the offset is the world position of the input origin,
/// otherwise it is the minimum world corner.
pub fn compute_shape_offset(
    spatial_shape: &[usize],
    in_affine: &DMatrix<f64>,
    out_affine: &DMatrix<f64>,
) -> Result<(Vec<usize>, Vec<f64>)> {
    let sr = spatial_shape.len();
    if sr == 0 {
        return Err(TransformError::dimension_mismatch(
            "spatial shape must have at least one axis",
        ));
    }
    let in_affine = to_affine_nd(sr, in_affine)?;
    let out_affine = to_affine_nd(sr, out_affine)?;
    let out_inv = out_affine
        .clone()
        .try_inverse()
        .ok_or_else(|| TransformError::numerical("output affine is singular"))?;

    let n_corners = 1usize << sr;
    let mut world = DMatrix::<f64>::zeros(sr + 1, n_corners);
    for corner in 0..n_corners {
        for axis in 0..sr {
            // Bit order matches an "ij" meshgrid: the last axis varies fastest.
            let high = (corner >> (sr - 1 - axis)) & 1 == 1;
            world[(axis, corner)] = if high {
                spatial_shape[axis] as f64 - 1.0
            } else {
                0.0
            };
        }
        world[(sr, corner)] = 1.0;
    }
    let world = &in_affine * world;
    let voxel = &out_inv * &world;

    let mut out_shape = Vec::with_capacity(sr);
    for axis in 0..sr {
        let (lo, hi) = (0..n_corners)
            .map(|c| voxel[(axis, c)] / voxel[(sr, c)])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        out_shape.push(((hi - lo + 1.0).round_ties_even() as usize).max(1));
    }

    let offset = if io_orientation(&in_affine)? == io_orientation(&out_affine)? {
        (0..sr)
            .map(|axis| in_affine[(axis, sr)] / in_affine[(sr, sr)])
            .collect()
    } else {
        (0..sr)
            .map(|axis| {
                (0..n_corners)
                    .map(|c| world[(axis, c)] / world[(sr, c)])
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    };
    Ok((out_shape, offset))
}
