/// Failures contained inside the render engine.
///
/// None of these abort the process. `CapabilityUnavailable` disables
/// rendering for good, `ContextLost` pauses it until the host reports a
/// restore, and compile/link failures keep whatever program was active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("GPU rendering is unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("failed to compile {stage} shader for effect '{effect}': {log}")]
    ShaderCompile {
        effect: String,
        stage: &'static str,
        log: String,
    },
    #[error("failed to link program for effect '{effect}': {log}")]
    ProgramLink { effect: String, log: String },
    #[error("GPU context was lost")]
    ContextLost,
    #[error("GPU resource error: {0}")]
    Resource(String),
}
