//! Live-view Euler rotations.

use std::rc::Rc;

use anyhow::bail;

use crate::{
    approx::vectors_equal,
    quat::Quaternion,
    registry::{CallbackRegistry, CallbackToken, HostRef},
    view::{SharedBuffer, ViewData},
};

/// Three rotation angles in radians, applied in X, Y, Z order, optionally backed by
/// host-owned data.
///
/// Construction and access follow the same pattern as [`Vector`](crate::Vector): owned,
/// wrapped or proxied, with all value access gated and fallible.
pub struct Euler {
    data: ViewData,
}

impl Euler {
    const KIND: &'static str = "Euler";

    /// Creates an owned rotation from its three angles.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            data: ViewData::owned(Self::KIND, &[x, y, z]),
        }
    }

    /// Creates a rotation viewing 3 floats of `buf` starting at `start`.
    pub fn wrapping(
        buf: &SharedBuffer,
        start: usize,
        owner: Option<HostRef>,
    ) -> anyhow::Result<Self> {
        if start + 3 > buf.len() {
            bail!(
                "wrap range {start}..{} exceeds the host buffer of {} floats",
                start + 3,
                buf.len()
            );
        }
        Ok(Self {
            data: ViewData::wrapped(Self::KIND, buf.clone(), start, 3, owner),
        })
    }

    /// Creates a rotation whose every access goes through the bundle registered under
    /// `token`, against `host` and `subtype`.
    pub fn proxied(
        registry: &Rc<CallbackRegistry>,
        token: CallbackToken,
        host: HostRef,
        subtype: u8,
    ) -> Self {
        Self {
            data: ViewData::proxied(Self::KIND, registry.clone(), token, host, subtype, 3),
        }
    }

    /// Whether this rotation wraps foreign memory instead of owning its storage.
    pub fn is_wrapped(&self) -> bool {
        self.data.is_wrapped()
    }

    /// The host object this rotation is a view of, if any.
    pub fn owner(&self) -> Option<HostRef> {
        self.data.owner()
    }

    /// Reads the current angles as `[x, y, z]` through the access gate.
    pub fn try_read(&self) -> anyhow::Result<[f32; 3]> {
        let mut out = [0.0; 3];
        self.data.try_read(&mut out)?;
        Ok(out)
    }

    /// Replaces all angles (`[x, y, z]`) through the access gate.
    pub fn try_write(&mut self, angles: [f32; 3]) -> anyhow::Result<()> {
        self.data.try_write(&angles)?;
        Ok(())
    }

    /// Reads a single angle (0 = x, 1 = y, 2 = z).
    pub fn get(&self, index: usize) -> anyhow::Result<f32> {
        self.check_index(index)?;
        Ok(self.data.try_read_index(index)?)
    }

    /// Writes a single angle (0 = x, 1 = y, 2 = z).
    pub fn set(&mut self, index: usize, value: f32) -> anyhow::Result<()> {
        self.check_index(index)?;
        self.data.try_write_index(index, value)?;
        Ok(())
    }

    fn check_index(&self, index: usize) -> anyhow::Result<()> {
        if index >= 3 {
            bail!("euler index {index} out of range");
        }
        Ok(())
    }

    /// Converts to the quaternion representing the same rotation.
    pub fn to_quaternion(&self) -> anyhow::Result<Quaternion> {
        let [x, y, z] = self.try_read()?;
        let (si, ci) = (x * 0.5).sin_cos();
        let (sj, cj) = (y * 0.5).sin_cos();
        let (sh, ch) = (z * 0.5).sin_cos();
        let (cc, cs) = (ci * ch, ci * sh);
        let (sc, ss) = (si * ch, si * sh);

        Ok(Quaternion::new(
            cj * cc + sj * ss,
            cj * sc - sj * cs,
            cj * ss + sj * cc,
            cj * cs - sj * sc,
        ))
    }

    /// Approximate equality within `max_steps` representable floats per angle.
    pub fn approx_eq(&self, other: &Euler, max_steps: i32) -> anyhow::Result<bool> {
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

    use crate::{approx::vectors_equal, Vector};

    use super::*;

    #[test]
    fn angle_access() {
        let mut e = Euler::new(0.1, 0.2, 0.3);
        assert_eq!(e.try_read().unwrap(), [0.1, 0.2, 0.3]);
        e.set(1, 0.9).unwrap();
        assert_eq!(e.get(1).unwrap(), 0.9);
        assert!(e.get(3).is_err());
    }

    #[test]
    fn zero_rotation_is_the_identity_quaternion() {
        let q = Euler::new(0.0, 0.0, 0.0).to_quaternion().unwrap();
        assert_eq!(q.try_read().unwrap(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn single_axis_rotation_matches_the_axis_quaternion() {
        let q = Euler::new(FRAC_PI_2, 0.0, 0.0).to_quaternion().unwrap();
        let half = (FRAC_PI_2 * 0.5).sin();
        assert!(vectors_equal(
            &q.try_read().unwrap(),
            &[(FRAC_PI_2 * 0.5).cos(), half, 0.0, 0.0],
            4
        ));
    }

    #[test]
    fn quarter_turn_about_z_rotates_x_to_y() {
        let q = Euler::new(0.0, 0.0, FRAC_PI_2).to_quaternion().unwrap();
        let v = Vector::new(&[1.0, 0.0, 0.0]).unwrap();
        let out = q.rotate_vector(&v).unwrap().try_read().unwrap();
        for (a, e) in out.iter().zip(&[0.0, 1.0, 0.0]) {
            assert!((a - e).abs() < 1e-6, "{out:?}");
        }
    }
}
