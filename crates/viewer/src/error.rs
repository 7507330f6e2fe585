/// Errors reported by the viewer core.
///
/// None of these are fatal: the triggering action is abandoned and the
/// previous consistent state is kept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error("Shape cannot be selected: the representation of the selected part is not a BRep")]
    NotBrep,

    #[error("Unable to find part data for [{0}]")]
    MissingPartData(String),

    #[error("unknown part: {0}")]
    UnknownPart(String),

    #[error("model has no parts")]
    NoParts,

    #[error("unable to form body: {0}")]
    BodyFormation(String),
}
