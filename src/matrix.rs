//! Live-view matrices with 2 to 4 rows and columns.

use std::fmt;
use std::rc::Rc;

use anyhow::bail;

use crate::{
    approx::vectors_equal,
    registry::{CallbackRegistry, CallbackToken, HostRef},
    vector::Vector,
    view::{SharedBuffer, ViewData, MAX_ELEMS},
};

/// A matrix with 2–4 rows and 2–4 columns, stored flat in row-major order, optionally
/// backed by host-owned data.
///
/// Matrices transform *row* vectors: applying a matrix to a vector computes `v * M`
/// (see [`transform`](Self::transform)). This matches the layout produced by the
/// constructors in [`crate::transform`].
///
/// Construction and access follow the same pattern as [`Vector`]: owned
/// ([`new`](Self::new), [`identity`](Self::identity)), wrapped
/// ([`wrapping`](Self::wrapping)) or proxied ([`proxied`](Self::proxied)), with all value
/// access gated and fallible.
pub struct Matrix {
    data: ViewData,
    rows: usize,
    cols: usize,
}

fn check_shape(rows: usize, cols: usize) -> anyhow::Result<()> {
    if !(2..=4).contains(&rows) || !(2..=4).contains(&cols) {
        bail!("matrix rows and columns must each be 2, 3 or 4, got {rows}x{cols}");
    }
    Ok(())
}

impl Matrix {
    const KIND: &'static str = "Matrix";

    /// Creates a matrix owning a copy of `values` (flat, row-major, `rows * cols` floats).
    pub fn new(rows: usize, cols: usize, values: &[f32]) -> anyhow::Result<Self> {
        check_shape(rows, cols)?;
        if values.len() != rows * cols {
            bail!(
                "a {rows}x{cols} matrix needs {} values, got {}",
                rows * cols,
                values.len()
            );
        }
        Ok(Self {
            data: ViewData::owned(Self::KIND, values),
            rows,
            cols,
        })
    }

    /// Creates an owned `size`×`size` identity matrix.
    pub fn identity(size: usize) -> anyhow::Result<Self> {
        check_shape(size, size)?;
        let mut flat = [0.0; MAX_ELEMS];
        for i in 0..size {
            flat[i * size + i] = 1.0;
        }
        Self::new(size, size, &flat[..size * size])
    }

    /// Creates a matrix viewing `rows * cols` floats of `buf` starting at `start`.
    pub fn wrapping(
        buf: &SharedBuffer,
        start: usize,
        rows: usize,
        cols: usize,
        owner: Option<HostRef>,
    ) -> anyhow::Result<Self> {
        check_shape(rows, cols)?;
        let len = rows * cols;
        if start + len > buf.len() {
            bail!(
                "wrap range {start}..{} exceeds the host buffer of {} floats",
                start + len,
                buf.len()
            );
        }
        Ok(Self {
            data: ViewData::wrapped(Self::KIND, buf.clone(), start, len, owner),
            rows,
            cols,
        })
    }

    /// Creates a matrix whose every access goes through the bundle registered under
    /// `token`, against `host` and `subtype`.
    pub fn proxied(
        registry: &Rc<CallbackRegistry>,
        token: CallbackToken,
        host: HostRef,
        subtype: u8,
        rows: usize,
        cols: usize,
    ) -> anyhow::Result<Self> {
        check_shape(rows, cols)?;
        Ok(Self {
            data: ViewData::proxied(
                Self::KIND,
                registry.clone(),
                token,
                host,
                subtype,
                rows * cols,
            ),
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether this matrix wraps foreign memory instead of owning its storage.
    pub fn is_wrapped(&self) -> bool {
        self.data.is_wrapped()
    }

    /// The host object this matrix is a view of, if any.
    pub fn owner(&self) -> Option<HostRef> {
        self.data.owner()
    }

    /// Reads the current elements (flat, row-major) through the access gate.
    pub fn try_read(&self) -> anyhow::Result<Vec<f32>> {
        let mut out = [0.0; MAX_ELEMS];
        let out = &mut out[..self.rows * self.cols];
        self.data.try_read(out)?;
        Ok(out.to_vec())
    }

    /// Replaces all elements (flat, row-major) through the access gate.
    pub fn try_write(&mut self, values: &[f32]) -> anyhow::Result<()> {
        if values.len() != self.rows * self.cols {
            bail!(
                "expected {} elements for a {}x{} matrix, got {}",
                self.rows * self.cols,
                self.rows,
                self.cols,
                values.len()
            );
        }
        self.data.try_write(values)?;
        Ok(())
    }

    /// Reads the element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> anyhow::Result<f32> {
        self.check_pos(row, col)?;
        Ok(self.data.try_read_index(row * self.cols + col)?)
    }

    /// Writes the element at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> anyhow::Result<()> {
        self.check_pos(row, col)?;
        self.data.try_write_index(row * self.cols + col, value)?;
        Ok(())
    }

    fn check_pos(&self, row: usize, col: usize) -> anyhow::Result<()> {
        if row >= self.rows || col >= self.cols {
            bail!(
                "matrix position ({row}, {col}) out of range for a {}x{} matrix",
                self.rows,
                self.cols
            );
        }
        Ok(())
    }

    /// Transforms `vec` by this matrix using the row-vector convention, returning
    /// `vec * self` as an owned vector.
    ///
    /// `vec` must have as many elements as the matrix has rows; the result has one element
    /// per column.
    pub fn transform(&self, vec: &Vector) -> anyhow::Result<Vector> {
        if vec.size() != self.rows {
            bail!(
                "cannot transform a {}D vector by a {}x{} matrix",
                vec.size(),
                self.rows,
                self.cols
            );
        }
        let m = self.try_read()?;
        let v = vec.try_read()?;
        let mut out = [0.0; 4];
        for (col, dst) in out[..self.cols].iter_mut().enumerate() {
            *dst = (0..self.rows)
                .map(|row| v[row] * m[row * self.cols + col])
                .sum();
        }
        Vector::new(&out[..self.cols])
    }

    /// Approximate equality within `max_steps` representable floats per element.
    ///
    /// Matrices of different shapes are never equal.
    pub fn approx_eq(&self, other: &Matrix, max_steps: i32) -> anyhow::Result<bool> {
        if self.rows != other.rows || self.cols != other.cols {
            return Ok(false);
        }
        Ok(vectors_equal(
            &self.try_read()?,
            &other.try_read()?,
            max_steps,
        ))
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_validated() {
        assert!(Matrix::new(1, 3, &[0.0; 3]).is_err());
        assert!(Matrix::new(3, 5, &[0.0; 15]).is_err());
        assert!(Matrix::new(3, 3, &[0.0; 8]).is_err());
        assert!(Matrix::new(2, 4, &[0.0; 8]).is_ok());
    }

    #[test]
    fn identity() {
        let m = Matrix::identity(3).unwrap();
        assert_eq!(
            m.try_read().unwrap(),
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn element_access_is_row_major() {
        let mut m = Matrix::new(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.get(0, 2).unwrap(), 3.0);
        assert_eq!(m.get(1, 0).unwrap(), 4.0);
        m.set(1, 1, 9.0).unwrap();
        assert_eq!(m.try_read().unwrap(), [1.0, 2.0, 3.0, 4.0, 9.0, 6.0]);
        assert!(m.get(2, 0).is_err());
        assert!(m.set(0, 3, 0.0).is_err());
    }

    #[test]
    fn transform_applies_row_vector_convention() {
        // v * M with M laid out row-major.
        let m = Matrix::new(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let v = Vector::new(&[1.0, 10.0]).unwrap();
        let out = m.transform(&v).unwrap();
        assert_eq!(out.try_read().unwrap(), [31.0, 42.0]);

        let id = Matrix::identity(4).unwrap();
        assert!(id.transform(&v).is_err());
    }

    #[test]
    fn approx_eq_respects_shape() {
        let a = Matrix::identity(2).unwrap();
        let b = Matrix::new(2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let c = Matrix::identity(3).unwrap();
        assert!(a.approx_eq(&b, 1).unwrap());
        assert!(!a.approx_eq(&c, 1).unwrap());
    }
}
