use thiserror::Error;

/// Why a frame could not be rendered.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The renderer was disposed; build a new one before recording again.
    #[error("renderer is disposed")]
    Disposed,
    /// A pass failed while recording or executing. The in-progress graph has
    /// been discarded and the next frame starts from a clean state.
    #[error("frame aborted in pass '{pass}'")]
    Aborted {
        pass: String,
        #[source]
        source: anyhow::Error,
    },
}
