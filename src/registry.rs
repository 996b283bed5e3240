//! Host callback bundles and the bounded registry that holds them.

use std::{any::Any, rc::Rc};

use anyhow::bail;

/// Shared, reference-counted handle on the host object backing a view.
///
/// A view holding a `HostRef` keeps the host *allocation* alive for as long as the view
/// exists; it says nothing about whether the entity the host models still exists. That is
/// what the [`ViewCallback`] success returns report.
pub type HostRef = Rc<dyn Any>;

/// A bundle of accessors through which a proxied view reads and writes host data.
///
/// Implementations are supplied by the embedding application, one per kind of viewable host
/// field family, and registered once in a [`CallbackRegistry`]. Every operation receives the
/// host object and a `subtype` code identifying *which* logical field of the host the view
/// represents (e.g. location vs. rotation).
///
/// Returning `false` from any operation means the host no longer backs this view — the
/// entity was deleted, or the subtype is no longer supported. The math types surface that
/// uniformly as [`InvalidatedView`](crate::InvalidatedView), no matter which of the four
/// operations refused.
pub trait ViewCallback {
    /// Fills `out` with the current value of the viewed field.
    fn get(&self, host: &dyn Any, subtype: u8, out: &mut [f32]) -> bool;

    /// Stores `data` as the new value of the viewed field.
    fn set(&self, host: &dyn Any, subtype: u8, data: &[f32]) -> bool;

    /// Fills `out[index]` with a single element of the viewed field.
    ///
    /// Elements of `out` other than `index` need not be touched.
    fn get_index(&self, host: &dyn Any, subtype: u8, out: &mut [f32], index: usize) -> bool;

    /// Stores `data[index]` as a single element of the viewed field.
    ///
    /// Elements of `data` other than `index` are unspecified and must not be read.
    fn set_index(&self, host: &dyn Any, subtype: u8, data: &[f32], index: usize) -> bool;
}

/// Identifies a registered [`ViewCallback`] bundle within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackToken(usize);

/// Bounded table of [`ViewCallback`] bundles.
///
/// The embedding application constructs one registry, registers its bundles during a
/// single-threaded startup phase, and then shares the registry (behind an `Rc`) with every
/// proxied view it creates. The table is deliberately small and enumerable — a host exposes
/// a handful of view kinds, not an open-ended set — so running out of slots fails loudly
/// instead of growing.
pub struct CallbackRegistry {
    slots: [Option<Rc<dyn ViewCallback>>; Self::CAPACITY],
}

impl CallbackRegistry {
    /// Number of distinct bundles a registry can hold.
    pub const CAPACITY: usize = 8;

    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Registers `bundle` and returns the token identifying it.
    ///
    /// Registration is idempotent: registering a bundle that is already present (the same
    /// allocation, not merely an equal one) returns its existing token. New bundles go into
    /// the first free slot. Fails if the table is full.
    pub fn register(&mut self, bundle: Rc<dyn ViewCallback>) -> anyhow::Result<CallbackToken> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(existing) => {
                    if Rc::ptr_eq(existing, &bundle) {
                        return Ok(CallbackToken(i));
                    }
                }
                None => {
                    log::debug!("registered view callback bundle in slot {i}");
                    *slot = Some(bundle);
                    return Ok(CallbackToken(i));
                }
            }
        }
        bail!(
            "callback registry is full ({} bundles registered)",
            Self::CAPACITY
        );
    }

    /// Looks up the bundle behind `token`.
    ///
    /// Tokens are only handed out by [`register`](Self::register), so a lookup can only miss
    /// when a token from a *different* registry is passed in. That is a programming error
    /// and panics.
    pub(crate) fn resolve(&self, token: CallbackToken) -> &dyn ViewCallback {
        match &self.slots[token.0] {
            Some(bundle) => &**bundle,
            None => panic!("callback token {} does not belong to this registry", token.0),
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl ViewCallback for Nop {
        fn get(&self, _: &dyn Any, _: u8, _: &mut [f32]) -> bool {
            true
        }
        fn set(&self, _: &dyn Any, _: u8, _: &[f32]) -> bool {
            true
        }
        fn get_index(&self, _: &dyn Any, _: u8, _: &mut [f32], _: usize) -> bool {
            true
        }
        fn set_index(&self, _: &dyn Any, _: u8, _: &[f32], _: usize) -> bool {
            true
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = CallbackRegistry::new();
        let bundle: Rc<dyn ViewCallback> = Rc::new(Nop);
        let a = registry.register(bundle.clone()).unwrap();
        let b = registry.register(bundle).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bundles_fill_slots_in_order() {
        let mut registry = CallbackRegistry::new();
        let a = registry.register(Rc::new(Nop)).unwrap();
        let b = registry.register(Rc::new(Nop)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, CallbackToken(0));
        assert_eq!(b, CallbackToken(1));
    }

    #[test]
    fn overflow_fails_clearly() {
        let mut registry = CallbackRegistry::new();
        for _ in 0..CallbackRegistry::CAPACITY {
            registry.register(Rc::new(Nop)).unwrap();
        }
        let err = registry.register(Rc::new(Nop)).unwrap_err();
        assert!(err.to_string().contains("full"));
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn foreign_token_panics() {
        let mut populated = CallbackRegistry::new();
        let token = populated.register(Rc::new(Nop)).unwrap();
        let empty = CallbackRegistry::new();
        empty.resolve(token);
    }
}
