//! Editor-side state: the live shader parameters with the selected effect,
//! the overlay layer model, and the project file that persists both.

mod color;
pub mod fonts;
pub mod layers;
mod params;
mod session;

pub use color::{is_css_color, ColorParseError, Rgb};
pub use fonts::{FontLoadOutcome, FontLoadTicket, FontResourceError};
pub use layers::{
    css_declarations, style_attribute, ButtonStyle, Layer, LayerError, LayerKind, LayerModel,
    LayerPatch, Position, TargetWindow,
};
pub use params::{
    ParameterChange, ParameterError, ParameterStore, ScalarField, ShaderParameters,
    DEFAULT_PALETTE,
};
pub use session::{EditorSession, ProjectFile, SessionError, PROJECT_VERSION};
