//! Live-view rotation quaternions.

use std::rc::Rc;

use anyhow::bail;

use crate::{
    approx::vectors_equal,
    registry::{CallbackRegistry, CallbackToken, HostRef},
    vector::Vector,
    view::{SharedBuffer, ViewData},
};

/// A quaternion stored as `[w, x, y, z]` (real part first), optionally backed by
/// host-owned data.
///
/// Unit-length quaternions represent rotations in 3D space. Operations that assume a
/// rotation ([`rotate_vector`](Self::rotate_vector)) do *not* validate unit length; keeping
/// quaternions normalized is the caller's responsibility.
///
/// Construction and access follow the same pattern as [`Vector`]: owned, wrapped or
/// proxied, with all value access gated and fallible.
pub struct Quaternion {
    data: ViewData,
}

impl Quaternion {
    const KIND: &'static str = "Quaternion";

    /// Creates an owned quaternion from its components.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self {
            data: ViewData::owned(Self::KIND, &[w, x, y, z]),
        }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Creates a quaternion viewing 4 floats of `buf` starting at `start`.
    pub fn wrapping(
        buf: &SharedBuffer,
        start: usize,
        owner: Option<HostRef>,
    ) -> anyhow::Result<Self> {
        if start + 4 > buf.len() {
            bail!(
                "wrap range {start}..{} exceeds the host buffer of {} floats",
                start + 4,
                buf.len()
            );
        }
        Ok(Self {
            data: ViewData::wrapped(Self::KIND, buf.clone(), start, 4, owner),
        })
    }

    /// Creates a quaternion whose every access goes through the bundle registered under
    /// `token`, against `host` and `subtype`.
    pub fn proxied(
        registry: &Rc<CallbackRegistry>,
        token: CallbackToken,
        host: HostRef,
        subtype: u8,
    ) -> Self {
        Self {
            data: ViewData::proxied(Self::KIND, registry.clone(), token, host, subtype, 4),
        }
    }

    /// Whether this quaternion wraps foreign memory instead of owning its storage.
    pub fn is_wrapped(&self) -> bool {
        self.data.is_wrapped()
    }

    /// The host object this quaternion is a view of, if any.
    pub fn owner(&self) -> Option<HostRef> {
        self.data.owner()
    }

    /// Reads the current components as `[w, x, y, z]` through the access gate.
    pub fn try_read(&self) -> anyhow::Result<[f32; 4]> {
        let mut out = [0.0; 4];
        self.data.try_read(&mut out)?;
        Ok(out)
    }

    /// Replaces all components (`[w, x, y, z]`) through the access gate.
    pub fn try_write(&mut self, components: [f32; 4]) -> anyhow::Result<()> {
        self.data.try_write(&components)?;
        Ok(())
    }

    /// Reads a single component (0 = w, 1 = x, 2 = y, 3 = z).
    pub fn get(&self, index: usize) -> anyhow::Result<f32> {
        self.check_index(index)?;
        Ok(self.data.try_read_index(index)?)
    }

    /// Writes a single component (0 = w, 1 = x, 2 = y, 3 = z).
    pub fn set(&mut self, index: usize, value: f32) -> anyhow::Result<()> {
        self.check_index(index)?;
        self.data.try_write_index(index, value)?;
        Ok(())
    }

    fn check_index(&self, index: usize) -> anyhow::Result<()> {
        if index >= 4 {
            bail!("quaternion index {index} out of range");
        }
        Ok(())
    }

    /// Length of the quaternion. 1 for a pure rotation.
    pub fn length(&self) -> anyhow::Result<f32> {
        let q = self.try_read()?;
        Ok(q.iter().map(|c| c * c).sum::<f32>().sqrt())
    }

    /// Returns an owned normalized copy (length 1).
    pub fn normalized(&self) -> anyhow::Result<Quaternion> {
        let mut q = self.try_read()?;
        let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
        if len == 0.0 {
            bail!("cannot normalize a zero-length quaternion");
        }
        for c in &mut q {
            *c /= len;
        }
        Ok(Quaternion::new(q[0], q[1], q[2], q[3]))
    }

    /// Returns an owned conjugate (the inverse rotation, for unit quaternions).
    pub fn conjugated(&self) -> anyhow::Result<Quaternion> {
        let [w, x, y, z] = self.try_read()?;
        Ok(Quaternion::new(w, -x, -y, -z))
    }

    /// Rotates the 3D vector `vec` by this quaternion, returning an owned vector.
    ///
    /// Uses the expanded quaternion-sandwich product directly. The result is only a pure
    /// rotation if `self` has unit length, which is not checked here.
    pub fn rotate_vector(&self, vec: &Vector) -> anyhow::Result<Vector> {
        if vec.size() != 3 {
            bail!("can only rotate a 3D vector by a quaternion");
        }
        let [w, x, y, z] = self.try_read()?;
        let v = vec.try_read()?;
        let (vx, vy, vz) = (v[0], v[1], v[2]);

        let rx = w * w * vx + 2.0 * y * w * vz - 2.0 * z * w * vy + x * x * vx
            + 2.0 * y * x * vy
            + 2.0 * z * x * vz
            - z * z * vx
            - y * y * vx;
        let ry = 2.0 * x * y * vx + y * y * vy + 2.0 * z * y * vz + 2.0 * w * z * vx
            - z * z * vy
            + w * w * vy
            - 2.0 * x * w * vz
            - x * x * vy;
        let rz = 2.0 * x * z * vx + 2.0 * y * z * vy + z * z * vz - 2.0 * w * y * vx
            - y * y * vz
            + 2.0 * w * x * vy
            - x * x * vz
            + w * w * vz;

        Vector::new(&[rx, ry, rz])
    }

    /// Approximate equality within `max_steps` representable floats per component.
    pub fn approx_eq(&self, other: &Quaternion, max_steps: i32) -> anyhow::Result<bool> {
        Ok(vectors_equal(
            &self.try_read()?,
            &other.try_read()?,
            max_steps,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use crate::approx::floats_equal;

    use super::*;

    fn about_z(angle: f32) -> Quaternion {
        let (s, c) = (angle * 0.5).sin_cos();
        Quaternion::new(c, 0.0, 0.0, s)
    }

    #[test]
    fn identity_leaves_vectors_alone() {
        let v = Vector::new(&[1.0, -2.0, 0.5]).unwrap();
        let out = Quaternion::identity().rotate_vector(&v).unwrap();
        assert!(out.approx_eq(&v, 1).unwrap());
    }

    #[test]
    fn quarter_turn_about_z() {
        let q = about_z(FRAC_PI_2);
        let v = Vector::new(&[1.0, 0.0, 0.0]).unwrap();
        let out = q.rotate_vector(&v).unwrap().try_read().unwrap();
        for (a, e) in out.iter().zip(&[0.0, 1.0, 0.0]) {
            assert!((a - e).abs() < 1e-6, "{out:?}");
        }
    }

    #[test]
    fn conjugate_inverts_the_rotation() {
        let q = about_z(0.83);
        let v = Vector::new(&[0.3, -1.2, 2.0]).unwrap();
        let there = q.rotate_vector(&v).unwrap();
        let back = q.conjugated().unwrap().rotate_vector(&there).unwrap();
        assert!(back.approx_eq(&v, 64).unwrap());
    }

    #[test]
    fn rotation_needs_a_3d_vector() {
        let v = Vector::new(&[1.0, 0.0]).unwrap();
        assert!(Quaternion::identity().rotate_vector(&v).is_err());
        assert!(v.rotated_by(&Quaternion::identity()).is_err());
    }

    #[test]
    fn normalized_and_length() {
        let q = Quaternion::new(0.0, 3.0, 0.0, 4.0);
        assert_eq!(q.length().unwrap(), 5.0);
        let n = q.normalized().unwrap();
        assert!(floats_equal(n.length().unwrap(), 1.0, 4));
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized().is_err());
    }

    #[test]
    fn component_order_is_w_first() {
        let q = Quaternion::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(q.get(0).unwrap(), 1.0);
        assert_eq!(q.get(3).unwrap(), 4.0);
        assert!(q.get(4).is_err());
    }
}
