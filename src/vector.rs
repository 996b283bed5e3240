//! Live-view vectors of 2 to 4 elements.

use std::rc::Rc;

use anyhow::bail;

use crate::{
    approx::vectors_equal,
    quat::Quaternion,
    registry::{CallbackRegistry, CallbackToken, HostRef},
    view::{SharedBuffer, ViewData},
};

/// A 2, 3 or 4 element float vector, optionally backed by host-owned data.
///
/// # Construction
///
/// - [`Vector::new`] copies the given components into private storage.
/// - [`Vector::wrapping`] views a region of a host's [`SharedBuffer`]; reads and writes go
///   straight through to the shared storage.
/// - [`Vector::proxied`] binds the vector to a (host, subtype, callback) triple; every
///   access is synthesized by the registered bundle and can fail with
///   [`InvalidatedView`](crate::InvalidatedView) once the host entity is gone.
///
/// # Access
///
/// All value access is fallible and gated: [`try_read`](Self::try_read) /
/// [`try_write`](Self::try_write) for the whole vector, [`get`](Self::get) /
/// [`set`](Self::set) for single elements. The math operations below read their operands
/// through the same gates.
pub struct Vector {
    data: ViewData,
}

fn check_size(size: usize) -> anyhow::Result<()> {
    if !(2..=4).contains(&size) {
        bail!("vector size must be 2, 3 or 4, got {size}");
    }
    Ok(())
}

impl Vector {
    const KIND: &'static str = "Vector";

    /// Creates a vector owning a copy of `values`.
    pub fn new(values: &[f32]) -> anyhow::Result<Self> {
        check_size(values.len())?;
        Ok(Self {
            data: ViewData::owned(Self::KIND, values),
        })
    }

    /// Creates a vector viewing `size` floats of `buf` starting at `start`.
    ///
    /// The buffer is never freed by the vector. `owner`, if given, is kept alive for the
    /// lifetime of the view and returned by [`owner`](Self::owner).
    pub fn wrapping(
        buf: &SharedBuffer,
        start: usize,
        size: usize,
        owner: Option<HostRef>,
    ) -> anyhow::Result<Self> {
        check_size(size)?;
        if start + size > buf.len() {
            bail!(
                "wrap range {start}..{} exceeds the host buffer of {} floats",
                start + size,
                buf.len()
            );
        }
        Ok(Self {
            data: ViewData::wrapped(Self::KIND, buf.clone(), start, size, owner),
        })
    }

    /// Creates a vector whose every access goes through the bundle registered under
    /// `token`, against `host` and `subtype`.
    pub fn proxied(
        registry: &Rc<CallbackRegistry>,
        token: CallbackToken,
        host: HostRef,
        subtype: u8,
        size: usize,
    ) -> anyhow::Result<Self> {
        check_size(size)?;
        Ok(Self {
            data: ViewData::proxied(Self::KIND, registry.clone(), token, host, subtype, size),
        })
    }

    /// Number of elements (2, 3 or 4).
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether this vector wraps foreign memory instead of owning its storage.
    pub fn is_wrapped(&self) -> bool {
        self.data.is_wrapped()
    }

    /// The host object this vector is a view of, if any.
    pub fn owner(&self) -> Option<HostRef> {
        self.data.owner()
    }

    /// Reads the current elements through the access gate.
    pub fn try_read(&self) -> anyhow::Result<Vec<f32>> {
        let mut out = [0.0; 4];
        let out = &mut out[..self.size()];
        self.data.try_read(out)?;
        Ok(out.to_vec())
    }

    /// Replaces all elements through the access gate.
    pub fn try_write(&mut self, values: &[f32]) -> anyhow::Result<()> {
        if values.len() != self.size() {
            bail!(
                "expected {} elements for this vector, got {}",
                self.size(),
                values.len()
            );
        }
        self.data.try_write(values)?;
        Ok(())
    }

    /// Reads a single element.
    pub fn get(&self, index: usize) -> anyhow::Result<f32> {
        self.check_index(index)?;
        Ok(self.data.try_read_index(index)?)
    }

    /// Writes a single element.
    pub fn set(&mut self, index: usize, value: f32) -> anyhow::Result<()> {
        self.check_index(index)?;
        self.data.try_write_index(index, value)?;
        Ok(())
    }

    fn check_index(&self, index: usize) -> anyhow::Result<()> {
        if index >= self.size() {
            bail!(
                "vector index {index} out of range for size {}",
                self.size()
            );
        }
        Ok(())
    }

    /// Length (magnitude) of the vector.
    pub fn length(&self) -> anyhow::Result<f32> {
        let v = self.try_read()?;
        Ok(v.iter().map(|c| c * c).sum::<f32>().sqrt())
    }

    /// Returns an owned unit vector pointing in the same direction.
    pub fn normalized(&self) -> anyhow::Result<Vector> {
        let mut v = self.try_read()?;
        let len = v.iter().map(|c| c * c).sum::<f32>().sqrt();
        if len == 0.0 {
            bail!("cannot normalize a zero-length vector");
        }
        for c in &mut v {
            *c /= len;
        }
        Vector::new(&v)
    }

    /// Dot product with another vector of the same size.
    pub fn dot(&self, other: &Vector) -> anyhow::Result<f32> {
        if self.size() != other.size() {
            bail!(
                "dot product needs equal sizes, got {} and {}",
                self.size(),
                other.size()
            );
        }
        let a = self.try_read()?;
        let b = other.try_read()?;
        Ok(a.iter().zip(&b).map(|(x, y)| x * y).sum())
    }

    /// Cross product; both vectors must be 3D.
    pub fn cross(&self, other: &Vector) -> anyhow::Result<Vector> {
        if self.size() != 3 || other.size() != 3 {
            bail!("the cross product is only defined for 3D vectors");
        }
        let a = self.try_read()?;
        let b = other.try_read()?;
        Vector::new(&[
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ])
    }

    /// Rotates this 3D vector by `quat`.
    ///
    /// Same operation as [`Quaternion::rotate_vector`] with the argument order flipped.
    pub fn rotated_by(&self, quat: &Quaternion) -> anyhow::Result<Vector> {
        quat.rotate_vector(self)
    }

    /// Approximate equality within `max_steps` representable floats per component.
    ///
    /// Vectors of different sizes are never equal. See [`crate::approx`] for the
    /// comparison rule and the `max_steps` precondition.
    pub fn approx_eq(&self, other: &Vector, max_steps: i32) -> anyhow::Result<bool> {
        if self.size() != other.size() {
            return Ok(false);
        }
        Ok(vectors_equal(
            &self.try_read()?,
            &other.try_read()?,
            max_steps,
        ))
    }
}
