//! Math values that can live inside somebody else's data.
//!
//! # Motivation
//!
//! An embedding application (a pose editor, a mesh tool, a scene scripting layer) owns the
//! authoritative copy of most of the numbers its users manipulate: a bone's rotation, a vertex
//! position, an object's location. Handing a caller a detached copy of such a value silently
//! breaks write-back (`bone.location.x = 1.0` would mutate a temporary), while handing out a
//! bare pointer into host storage breaks the moment the host deletes the bone.
//!
//! The math types in this crate ([`Vector`], [`Matrix`], [`Euler`], [`Quaternion`]) can
//! therefore exist in one of three ownership states:
//!
//! - **Owned**: the value has a private buffer, allocated at construction and freed exactly
//!   once when the value is dropped.
//! - **Wrapped**: the value reads from and writes through a [`SharedBuffer`] region owned by a
//!   host object; the buffer is never freed by the view.
//! - **Proxied**: the value has no buffer at all; every access is synthesized by a
//!   [`ViewCallback`] bundle registered in a [`CallbackRegistry`], invoked against a host
//!   reference and a subtype code that tells the bundle *which* field of the host the view
//!   represents.
//!
//! Because a host may invalidate the entity a view points at, every read *and* every write on
//! a proxied value is gated through its callback first. A refused access surfaces as an
//! [`InvalidatedView`] error on the specific operation that triggered it; the view itself
//! stays inspectable, but its numeric contents must no longer be trusted.
//!
//! # Goals & Non-Goals
//!
//! - Vector and matrix dimensions are fixed to 2–4, as used by 3D graphics transforms. This
//!   is not a general-purpose linear algebra library; arbitrary-size objects are out of
//!   scope.
//! - Single-threaded by design: sharing uses [`Rc`](std::rc::Rc), and the callback registry
//!   is expected to be populated once during startup. None of the types are `Send` or `Sync`.
//! - Matrices are flat, row-major, and transform *row* vectors (`v * M`), matching the host
//!   conventions this crate was written against.

pub mod approx;
mod euler;
mod matrix;
mod quat;
mod registry;
pub mod transform;
mod vector;
mod view;

pub use euler::Euler;
pub use matrix::Matrix;
pub use quat::Quaternion;
pub use registry::{CallbackRegistry, CallbackToken, HostRef, ViewCallback};
pub use vector::Vector;
pub use view::{InvalidatedView, SharedBuffer};
