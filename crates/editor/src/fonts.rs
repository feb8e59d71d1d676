//! Result protocol for the asynchronous font collaborator.
//!
//! A load is started with [`LayerModel::begin_font_load`](crate::LayerModel::begin_font_load),
//! which hands out a [`FontLoadTicket`]. The ticket is not `Clone` and
//! completing a load consumes it, so a finished load can mutate its layer at
//! most once.

/// Handle for one in-flight font resource load.
#[derive(Debug, PartialEq, Eq)]
pub struct FontLoadTicket {
    pub(crate) layer_id: String,
    pub(crate) url: String,
}

impl FontLoadTicket {
    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// What the loader reports back; the core only needs the family name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontLoadOutcome {
    Loaded { family: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontResourceError {
    #[error("font resource {url} failed to load: {reason}")]
    LoadFailed { url: String, reason: String },
    #[error("layer '{0}' was removed before its font finished loading")]
    LayerMissing(String),
    #[error("font resource for layer '{layer}' changed while {url} was loading")]
    Superseded { layer: String, url: String },
}
