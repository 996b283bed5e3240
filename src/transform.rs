//! Pure constructors for rotation, translation, scale, projection and shear matrices.
//!
//! Every function here builds a flat row-major buffer and hands it to [`Matrix::new`],
//! returning an owned matrix sized 2, 3 or 4. Size-4 results are produced by building the
//! 3×3 block first and re-expanding it into a 4×4 identity. Arguments are validated before
//! any numeric work, and vector arguments are read through their access gates — so a
//! constructor can fail with [`InvalidatedView`](crate::InvalidatedView) when an axis
//! argument is a dead proxied view.
//!
//! None of the constructors mutate their arguments. Axis normalization (scale and
//! projection) happens on a local copy.
//!
//! Angles are radians by default; building with the `degrees` feature switches the rotation
//! constructor to degree input.

use std::str::FromStr;

use anyhow::bail;

use crate::{Matrix, Vector};

/// Cardinal rotation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            _ => bail!("axis must be X, Y or Z, got {s:?}"),
        }
    }
}

/// Cardinal projection and shear planes.
///
/// `X` and `Y` are the 2D planes (really lines); `XY`, `XZ` and `YZ` apply to 3×3 and 4×4
/// matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    X,
    Y,
    XY,
    XZ,
    YZ,
}

impl FromStr for Plane {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "XY" => Ok(Self::XY),
            "XZ" => Ok(Self::XZ),
            "YZ" => Ok(Self::YZ),
            _ => bail!("plane must be X, Y, XY, XZ or YZ, got {s:?}"),
        }
    }
}

/// Axis argument for [`rotation_matrix`].
#[derive(Clone, Copy)]
pub enum RotationAxis<'a> {
    /// Rotation about a cardinal axis.
    Cardinal(Axis),
    /// Rotation about an arbitrary 3D direction, which must already be unit length.
    Arbitrary(&'a Vector),
}

/// Plane argument for [`ortho_projection_matrix`].
#[derive(Clone, Copy)]
pub enum Projection<'a> {
    /// Projection onto a cardinal plane.
    Onto(Plane),
    /// Projection onto the plane perpendicular to the given direction.
    Perpendicular(&'a Vector),
}

fn check_mat_size(size: usize, what: &str) -> anyhow::Result<()> {
    if !(2..=4).contains(&size) {
        bail!("can only build a 2x2, 3x3 or 4x4 {what} matrix, got size {size}");
    }
    Ok(())
}

/// Expands the leading 3×3 block into a 4×4 identity when `size` is 4, then builds the
/// matrix from the first `size * size` floats.
fn build_square(mut flat: [f32; 16], size: usize) -> anyhow::Result<Matrix> {
    if size == 4 {
        let mut out = [0.0; 16];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 4 + col] = flat[row * 3 + col];
            }
        }
        out[15] = 1.0;
        flat = out;
    }
    Matrix::new(size, size, &flat[..size * size])
}

/// Brings `angle` into the [-1 turn, 1 turn] range.
fn reduce_angle(mut angle: f32) -> f32 {
    #[cfg(feature = "degrees")]
    const FULL_TURN: f32 = 360.0;
    #[cfg(not(feature = "degrees"))]
    const FULL_TURN: f32 = std::f32::consts::TAU;

    while angle < -FULL_TURN {
        angle += FULL_TURN;
    }
    while angle > FULL_TURN {
        angle -= FULL_TURN;
    }
    angle
}

/// Reads an axis vector through its gate and normalizes a local copy, padding missing
/// components with zero. The caller has already checked the dimension against the matrix
/// size.
fn normalized_axis3(vec: &Vector, what: &str) -> anyhow::Result<[f32; 3]> {
    let v = vec.try_read()?;
    let mut axis = [0.0f32; 3];
    let n = v.len().min(3);
    axis[..n].copy_from_slice(&v[..n]);

    let norm = axis.iter().map(|c| c * c).sum::<f32>().sqrt();
    if norm == 0.0 {
        bail!("cannot build a {what} matrix along a zero-length axis");
    }
    for c in &mut axis {
        *c /= norm;
    }
    Ok(axis)
}

/// Creates a matrix representing a rotation by `angle`.
///
/// `size` selects a 2×2, 3×3 or 4×4 result. Sizes 3 and 4 require an axis; size 2 rotates
/// in the plane and forbids one. The angle is reduced into the ±1 turn range before use
/// (degrees under the `degrees` feature, radians otherwise).
///
/// An [`Arbitrary`](RotationAxis::Arbitrary) axis must be a 3D vector and is used as given,
/// without normalization — the caller must supply a unit vector, or the result will scale
/// as well as rotate.
pub fn rotation_matrix(
    angle: f32,
    size: usize,
    axis: Option<RotationAxis<'_>>,
) -> anyhow::Result<Matrix> {
    check_mat_size(size, "rotation")?;
    match (&axis, size) {
        (Some(_), 2) => bail!("cannot create a 2x2 rotation matrix around an axis"),
        (None, 3 | 4) => bail!("rotation matrices of size 3 and 4 require an axis"),
        _ => {}
    }
    let arbitrary = match axis {
        Some(RotationAxis::Arbitrary(vec)) => {
            if vec.size() != 3 {
                bail!("the rotation axis must be a 3D vector, got {}D", vec.size());
            }
            let v = vec.try_read()?;
            Some([v[0], v[1], v[2]])
        }
        _ => None,
    };

    let angle = reduce_angle(angle);
    #[cfg(feature = "degrees")]
    let angle = angle.to_radians();
    let (s, c) = angle.sin_cos();

    let mut mat = [0.0f32; 16];
    if let Some([x, y, z]) = arbitrary {
        // Axis-angle form, same row-vector layout as the cardinal cases below.
        let nc = 1.0 - c;
        mat[0] = nc * x * x + c;
        mat[1] = nc * x * y + s * z;
        mat[2] = nc * x * z - s * y;
        mat[3] = nc * x * y - s * z;
        mat[4] = nc * y * y + c;
        mat[5] = nc * y * z + s * x;
        mat[6] = nc * x * z + s * y;
        mat[7] = nc * y * z - s * x;
        mat[8] = nc * z * z + c;
    } else if size == 2 {
        mat[0] = c;
        mat[1] = s;
        mat[2] = -s;
        mat[3] = c;
    } else {
        match axis {
            Some(RotationAxis::Cardinal(Axis::X)) => {
                mat[0] = 1.0;
                mat[4] = c;
                mat[5] = s;
                mat[7] = -s;
                mat[8] = c;
            }
            Some(RotationAxis::Cardinal(Axis::Y)) => {
                mat[0] = c;
                mat[2] = -s;
                mat[4] = 1.0;
                mat[6] = s;
                mat[8] = c;
            }
            Some(RotationAxis::Cardinal(Axis::Z)) => {
                mat[0] = c;
                mat[1] = s;
                mat[3] = -s;
                mat[4] = c;
                mat[8] = 1.0;
            }
            _ => unreachable!("axis presence checked above"),
        }
    }
    build_square(mat, size)
}

/// Creates a 4×4 matrix representing a translation by the first three components of
/// `vec`, which must be a 3D or 4D vector.
pub fn translation_matrix(vec: &Vector) -> anyhow::Result<Matrix> {
    if vec.size() != 3 && vec.size() != 4 {
        bail!("the translation vector must be 3D or 4D, got {}D", vec.size());
    }
    let v = vec.try_read()?;

    let mut mat = [0.0f32; 16];
    for i in 0..4 {
        mat[i * 4 + i] = 1.0;
    }
    mat[12] = v[0];
    mat[13] = v[1];
    mat[14] = v[2];
    Matrix::new(4, 4, &mat)
}

/// Creates a matrix representing a scaling by `factor`.
///
/// Without an axis the scale is uniform along the diagonal. With an axis, scaling applies
/// along that direction only: a local normalized copy `v` of the axis yields
/// `I + (factor - 1) * (v ⊗ v)` truncated to `size`. The axis may not have more components
/// than the matrix; missing components count as zero.
pub fn scale_matrix(factor: f32, size: usize, axis: Option<&Vector>) -> anyhow::Result<Matrix> {
    check_mat_size(size, "scale")?;
    let axis = match axis {
        Some(vec) => {
            if vec.size() > size {
                bail!(
                    "a {}D scale axis does not fit a {size}x{size} matrix",
                    vec.size()
                );
            }
            Some(normalized_axis3(vec, "scale")?)
        }
        None => None,
    };

    let mut mat = [0.0f32; 16];
    match axis {
        None => {
            if size == 2 {
                mat[0] = factor;
                mat[3] = factor;
            } else {
                mat[0] = factor;
                mat[4] = factor;
                mat[8] = factor;
            }
        }
        Some([x, y, z]) => {
            let g = factor - 1.0;
            if size == 2 {
                mat[0] = 1.0 + g * x * x;
                mat[1] = g * x * y;
                mat[2] = g * x * y;
                mat[3] = 1.0 + g * y * y;
            } else {
                mat[0] = 1.0 + g * x * x;
                mat[1] = g * x * y;
                mat[2] = g * x * z;
                mat[3] = g * x * y;
                mat[4] = 1.0 + g * y * y;
                mat[5] = g * y * z;
                mat[6] = g * x * z;
                mat[7] = g * y * z;
                mat[8] = 1.0 + g * z * z;
            }
        }
    }
    build_square(mat, size)
}

/// Creates a matrix representing an orthographic projection.
///
/// [`Onto`](Projection::Onto) projects onto a cardinal plane: `X`/`Y` for size 2,
/// `XY`/`XZ`/`YZ` for sizes 3 and 4. [`Perpendicular`](Projection::Perpendicular) projects
/// onto the plane perpendicular to the given direction: a local normalized copy `v` yields
/// `I - v ⊗ v` truncated to `size`, under the same axis dimension rule as
/// [`scale_matrix`].
pub fn ortho_projection_matrix(projection: Projection<'_>, size: usize) -> anyhow::Result<Matrix> {
    check_mat_size(size, "projection")?;
    let mut mat = [0.0f32; 16];
    match projection {
        Projection::Onto(plane) => match (plane, size) {
            (Plane::X, 2) => mat[0] = 1.0,
            (Plane::Y, 2) => mat[3] = 1.0,
            (Plane::XY, 3 | 4) => {
                mat[0] = 1.0;
                mat[4] = 1.0;
            }
            (Plane::XZ, 3 | 4) => {
                mat[0] = 1.0;
                mat[8] = 1.0;
            }
            (Plane::YZ, 3 | 4) => {
                mat[4] = 1.0;
                mat[8] = 1.0;
            }
            (plane, _) => bail!("cannot project a {size}x{size} matrix onto the {plane:?} plane"),
        },
        Projection::Perpendicular(vec) => {
            if vec.size() > size {
                bail!(
                    "a {}D projection axis does not fit a {size}x{size} matrix",
                    vec.size()
                );
            }
            let [x, y, z] = normalized_axis3(vec, "projection")?;
            if size == 2 {
                mat[0] = 1.0 - x * x;
                mat[1] = -(x * y);
                mat[2] = -(x * y);
                mat[3] = 1.0 - y * y;
            } else {
                mat[0] = 1.0 - x * x;
                mat[1] = -(x * y);
                mat[2] = -(x * z);
                mat[3] = -(x * y);
                mat[4] = 1.0 - y * y;
                mat[5] = -(y * z);
                mat[6] = -(x * z);
                mat[7] = -(y * z);
                mat[8] = 1.0 - z * z;
            }
        }
    }
    build_square(mat, size)
}

/// Creates a matrix representing a shear by `factor` along `plane`.
///
/// `X`/`Y` shear 2×2 matrices; `XY`/`XZ`/`YZ` shear 3×3 and 4×4 matrices. The result is
/// the identity with the off-diagonal entries of the named plane set to `factor`.
pub fn shear_matrix(plane: Plane, factor: f32, size: usize) -> anyhow::Result<Matrix> {
    check_mat_size(size, "shear")?;
    let mut mat = [0.0f32; 16];
    match (plane, size) {
        (Plane::X, 2) => {
            mat[0] = 1.0;
            mat[2] = factor;
            mat[3] = 1.0;
        }
        (Plane::Y, 2) => {
            mat[0] = 1.0;
            mat[1] = factor;
            mat[3] = 1.0;
        }
        (Plane::XY, 3 | 4) => {
            mat[0] = 1.0;
            mat[4] = 1.0;
            mat[8] = 1.0;
            mat[6] = factor;
            mat[7] = factor;
        }
        (Plane::XZ, 3 | 4) => {
            mat[0] = 1.0;
            mat[4] = 1.0;
            mat[8] = 1.0;
            mat[3] = factor;
            mat[5] = factor;
        }
        (Plane::YZ, 3 | 4) => {
            mat[0] = 1.0;
            mat[4] = 1.0;
            mat[8] = 1.0;
            mat[1] = factor;
            mat[2] = factor;
        }
        (plane, _) => bail!("cannot shear a {size}x{size} matrix along the {plane:?} plane"),
    }
    build_square(mat, size)
}
