/// Errors the pipeline needs to match on.
///
/// Everything else travels as a plain [`anyhow::Error`] wrapped with the path
/// or actor under operation.
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// The post buffer does not begin with the literal bytes `---\n`.
    #[error("post does not begin with the frontmatter start fence `---`")]
    MissingStartFence,

    /// No `\n---\n` end fence was found after the start fence.
    #[error("post frontmatter has no `---` end fence")]
    MissingEndFence,

    /// The run was cancelled, either externally or because another actor
    /// failed. Never reported as a failure of its own when a real error is
    /// also present.
    #[error("cancelled")]
    Cancelled,
}

/// Whether `e` is, at any level of its context chain, a cancellation.
pub(crate) fn is_cancelled(e: &anyhow::Error) -> bool {
    e.chain()
        .any(|cause| matches!(cause.downcast_ref(), Some(Error::Cancelled)))
}

use thiserror::Error;
