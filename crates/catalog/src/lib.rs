//! Fixed catalog of procedural full-screen effects.
//!
//! Each effect is plain data: an id, a display name, the body of a fragment
//! program and the custom float parameters it exposes. The table lives in
//! `effects.toml` and is embedded at build time, so nothing executable is
//! loaded at runtime.

mod definition;
mod registry;
pub mod uniforms;

pub use definition::{CustomParameter, EffectDefinition};
pub use registry::{CatalogError, EffectCatalog};
pub use uniforms::PALETTE_SIZE;
