//! Built-in drivers.
//!
//! These exercise the full capability contract without any vendor wire
//! format: `none` points at an already-managed engine URL and `generic`
//! adopts a pre-existing host over SSH. Provider-specific drivers register
//! through the same [`crate::registry::Registry`] interface.

pub mod generic;
pub mod none;

use crate::registry::Registry;

/// Registers the built-in drivers.
///
/// Registration conflicts are logged rather than surfaced: the built-in
/// names are distinct, so a conflict means the caller registered one of
/// them first and keeps their descriptor.
pub fn register_builtin(registry: &Registry) {
    for descriptor in [none::descriptor(), generic::descriptor()] {
        let name = descriptor.name();
        if let Err(err) = registry.register(descriptor) {
            log::warn!("skipping builtin driver {name}: {err}");
        }
    }
}
