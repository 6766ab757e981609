use thiserror::Error;

/// Reasons grass generation refuses to start.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("no grass template was provided")]
    MissingTemplate,
    #[error("grass template has no sub-meshes")]
    EmptyTemplate,
    #[error("grass template part {index} is unusable: {reason}")]
    UnsupportedTemplatePart { index: usize, reason: &'static str },
    #[error("no ground probe / ground bounds were provided")]
    MissingGround,
    #[error("streaming mode needs exactly one entity marked as the grass viewer, found {0}")]
    MissingViewer(usize),
    #[error("grass configuration was not loaded")]
    MissingConfig,
}
