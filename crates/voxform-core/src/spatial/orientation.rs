//! Axis orientation of voxel-to-world affines.
//!
//! An orientation assigns every voxel axis to one world axis together with a
//! polarity. Orientations are derived from affines, parsed from axis codes
//! such as `"RAS"`, and combined into the permutation and flips that carry an
//! array from one orientation to another without interpolation.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::image::IndexMap;

/// Default axis labels: `(L, R)`, `(P, A)`, `(I, S)`.
///
/// The first label of each pair names the beginning of the world axis, the
/// second its end.
pub const DEFAULT_LABELS: [(char, char); 3] = [('L', 'R'), ('P', 'A'), ('I', 'S')];

/// World axis and polarity of one voxel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisOrientation {
    /// World axis the voxel axis maps to.
    pub axis: usize,
    /// True when increasing voxel index moves towards the beginning of the
    /// world axis.
    pub reversed: bool,
}

impl AxisOrientation {
    pub fn new(axis: usize, reversed: bool) -> Self {
        Self { axis, reversed }
    }

    fn sign(&self) -> f64 {
        if self.reversed {
            -1.0
        } else {
            1.0
        }
    }
}

/// Orientation of every voxel axis of an affine.
///
/// The rotation and shearing part of the affine is reduced to its closest
/// orthogonal matrix; each voxel axis is then assigned, in order, to the
/// world axis its column points along most strongly.
///
/// # Errors
/// `Numerical` when a voxel axis has no world direction (degenerate affine).
pub fn io_orientation(affine: &DMatrix<f64>) -> Result<Vec<AxisOrientation>> {
    let q = affine.nrows() - 1;
    let p = affine.ncols() - 1;
    let mut rs = affine.view((0, 0), (q, p)).into_owned();
    for j in 0..p {
        let zoom = rs.column(j).norm();
        if zoom != 0.0 {
            rs.column_mut(j).unscale_mut(zoom);
        }
    }

    let svd = rs.clone().svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(TransformError::numerical("SVD of affine did not converge")),
    };
    let s_max = svd.singular_values.max();
    let tol = s_max * (q.max(p) as f64) * f64::EPSILON;

    let mut r = DMatrix::<f64>::zeros(q, p);
    for (k, &s) in svd.singular_values.iter().enumerate() {
        if s > tol {
            r += u.column(k) * v_t.row(k);
        }
    }

    let mut ornt = Vec::with_capacity(p);
    for in_ax in 0..p {
        let col = r.column(in_ax);
        if col.iter().all(|v| v.abs() <= 1e-8) {
            return Err(TransformError::numerical(format!(
                "voxel axis {} has no world direction",
                in_ax
            )));
        }
        let out_ax = col.iamax();
        let reversed = col[out_ax] < 0.0;
        ornt.push(AxisOrientation::new(out_ax, reversed));
        r.row_mut(out_ax).fill(0.0);
    }
    Ok(ornt)
}

/// Parse axis codes such as `"RAS"` into an orientation.
///
/// # Errors
/// `InvalidConfiguration` for a code not present in `labels`, or a world
/// axis named twice.
pub fn axcodes_to_orientation(axcodes: &str, labels: &[(char, char)]) -> Result<Vec<AxisOrientation>> {
    let mut ornt: Vec<AxisOrientation> = Vec::with_capacity(axcodes.len());
    for code in axcodes.chars() {
        let found = labels.iter().enumerate().find_map(|(axis, &(begin, end))| {
            if code == end {
                Some(AxisOrientation::new(axis, false))
            } else if code == begin {
                Some(AxisOrientation::new(axis, true))
            } else {
                None
            }
        });
        let Some(o) = found else {
            return Err(TransformError::invalid_configuration(format!(
                "axis code '{}' not in labels {:?}",
                code, labels
            )));
        };
        if ornt.iter().any(|prev| prev.axis == o.axis) {
            return Err(TransformError::invalid_configuration(format!(
                "axis codes '{}' name the same world axis twice",
                axcodes
            )));
        }
        ornt.push(o);
    }
    Ok(ornt)
}

/// Render an orientation back to axis codes.
pub fn orientation_to_axcodes(ornt: &[AxisOrientation], labels: &[(char, char)]) -> Result<String> {
    ornt.iter()
        .map(|o| {
            labels
                .get(o.axis)
                .map(|&(begin, end)| if o.reversed { begin } else { end })
                .ok_or_else(|| {
                    TransformError::invalid_configuration(format!(
                        "no label for world axis {}",
                        o.axis
                    ))
                })
        })
        .collect()
}

/// Transform taking an array in `start` orientation to `end` orientation.
///
/// Entry `i` of the result says where input axis `i` goes and whether it is
/// flipped on the way.
pub fn orientation_transform(
    start: &[AxisOrientation],
    end: &[AxisOrientation],
) -> Result<Vec<AxisOrientation>> {
    if start.len() != end.len() {
        return Err(TransformError::dimension_mismatch(format!(
            "orientations have {} and {} axes",
            start.len(),
            end.len()
        )));
    }
    let mut result = vec![AxisOrientation::new(0, false); start.len()];
    let mut assigned = vec![false; start.len()];
    for (end_in, e) in end.iter().enumerate() {
        let Some(start_in) = start.iter().position(|s| s.axis == e.axis) else {
            return Err(TransformError::invalid_configuration(format!(
                "world axis {} of the target orientation is missing from the source",
                e.axis
            )));
        };
        result[start_in] = AxisOrientation::new(end_in, start[start_in].reversed != e.reversed);
        assigned[start_in] = true;
    }
    if assigned.iter().any(|a| !a) {
        return Err(TransformError::invalid_configuration(
            "source orientation has axes the target does not",
        ));
    }
    Ok(result)
}

/// Affine taking voxel coordinates of the transformed array back to voxel
/// coordinates of the original array.
///
/// # Arguments
/// * `ornt` - Transform from [`orientation_transform`]
/// * `shape` - Spatial shape of the original array
pub fn inverse_orientation_affine(ornt: &[AxisOrientation], shape: &[usize]) -> Result<DMatrix<f64>> {
    let p = ornt.len();
    if shape.len() < p {
        return Err(TransformError::dimension_mismatch(format!(
            "orientation has {} axes but shape {:?} has fewer",
            p, shape
        )));
    }
    let mut undo_reorder = DMatrix::<f64>::zeros(p + 1, p + 1);
    for (row, o) in ornt.iter().enumerate() {
        undo_reorder[(row, o.axis)] = 1.0;
    }
    undo_reorder[(p, p)] = 1.0;

    let mut undo_flip = DMatrix::<f64>::identity(p + 1, p + 1);
    for (i, o) in ornt.iter().enumerate() {
        let centre_trans = -(shape[i] as f64 - 1.0) / 2.0;
        undo_flip[(i, i)] = o.sign();
        undo_flip[(i, p)] = o.sign() * centre_trans - centre_trans;
    }
    Ok(undo_flip * undo_reorder)
}

/// Index map applying an orientation transform to a spatial shape.
///
/// Input axis `i` is flipped if requested and moved to output axis
/// `ornt[i].axis`.
pub fn orientation_index_map(ornt: &[AxisOrientation], shape: &[usize]) -> Result<IndexMap> {
    if ornt.len() != shape.len() {
        return Err(TransformError::dimension_mismatch(format!(
            "orientation has {} axes for spatial shape {:?}",
            ornt.len(),
            shape
        )));
    }
    let mut out_shape = vec![0usize; shape.len()];
    for (i, o) in ornt.iter().enumerate() {
        out_shape[o.axis] = shape[i];
    }
    IndexMap::build(shape, &out_shape, |out, src| {
        for (i, o) in ornt.iter().enumerate() {
            let v = out[o.axis];
            src[i] = if o.reversed { shape[i] - 1 - v } else { v };
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_orientation_identity() {
        let ornt = io_orientation(&DMatrix::identity(4, 4)).unwrap();
        assert_eq!(
            ornt,
            vec![
                AxisOrientation::new(0, false),
                AxisOrientation::new(1, false),
                AxisOrientation::new(2, false)
            ]
        );
    }

    #[test]
    fn test_io_orientation_permuted_flipped() {
        let affine = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 0.0, 2.0, 0.0, //
                -1.0, 0.0, 0.0, 0.0, //
                0.0, 3.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        );
        let ornt = io_orientation(&affine).unwrap();
        assert_eq!(
            ornt,
            vec![
                AxisOrientation::new(1, true),
                AxisOrientation::new(2, false),
                AxisOrientation::new(0, false)
            ]
        );
        assert_eq!(orientation_to_axcodes(&ornt, &DEFAULT_LABELS).unwrap(), "PSR");
    }

    #[test]
    fn test_axcodes_round_trip() {
        let ornt = axcodes_to_orientation("LPI", &DEFAULT_LABELS).unwrap();
        assert!(ornt.iter().all(|o| o.reversed));
        assert_eq!(orientation_to_axcodes(&ornt, &DEFAULT_LABELS).unwrap(), "LPI");
        assert!(axcodes_to_orientation("RAX", &DEFAULT_LABELS).is_err());
        assert!(axcodes_to_orientation("RLS", &DEFAULT_LABELS).is_err());
    }

    #[test]
    fn test_orientation_transform_flip_all() {
        let ras = axcodes_to_orientation("RAS", &DEFAULT_LABELS).unwrap();
        let lpi = axcodes_to_orientation("LPI", &DEFAULT_LABELS).unwrap();
        let t = orientation_transform(&ras, &lpi).unwrap();
        assert!(t.iter().enumerate().all(|(i, o)| o.axis == i && o.reversed));
    }

    #[test]
    fn test_inverse_orientation_affine_flip() {
        let t = vec![AxisOrientation::new(0, true)];
        let aff = inverse_orientation_affine(&t, &[5]).unwrap();
        assert_eq!(aff, DMatrix::from_row_slice(2, 2, &[-1.0, 4.0, 0.0, 1.0]));
    }

    #[test]
    fn test_index_map_transpose() {
        let t = vec![AxisOrientation::new(1, false), AxisOrientation::new(0, false)];
        let map = orientation_index_map(&t, &[2, 3]).unwrap();
        assert_eq!(map.target_shape(), &[3, 2]);
        assert_eq!(map.sources(), &[0, 3, 1, 4, 2, 5]);
    }
}
