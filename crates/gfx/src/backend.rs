use statistics::RendererStatistics;
use thiserror::Error;

use crate::graph::FrameGraph;
use crate::resource::PhysicalResourceBindings;

/// Everything executing a recorded frame can fail with.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("no recording scope is open")]
    NotRecording,
    #[error("pass '{pass}' reads '{resource}' before any pass produced it")]
    ReadBeforeWrite {
        pass: String,
        resource: String,
    },
    #[error("pass '{pass}' failed")]
    Pass {
        pass: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ExecuteError {
    /// Name of the pass the failure is attributed to, when known.
    pub fn pass_name(&self) -> Option<&str> {
        match self {
            ExecuteError::NotRecording => None,
            ExecuteError::ReadBeforeWrite { pass, .. } | ExecuteError::Pass { pass, .. } => {
                Some(pass)
            }
        }
    }
}

/// Contract the frame core expects from the graphics backend.
///
/// The backend owns resource allocation, aliasing and automatic pass
/// culling; the core only opens a recording scope per frame, hands over the
/// recorded graph, and asks for the scope to be discarded when recording
/// fails. A backend must tolerate `begin_frame` after an abandoned frame —
/// it is an unconditional reset.
pub trait ResourceBackend {
    /// Open a fresh recording scope, dropping any leftover state.
    fn begin_frame(&mut self);

    /// Cull, schedule and execute a recorded graph against the given
    /// physical bindings.
    fn execute(
        &mut self,
        graph: FrameGraph<'_>,
        bindings: &PhysicalResourceBindings,
        stats: &mut RendererStatistics,
    ) -> Result<(), ExecuteError>;

    /// Throw away the in-progress recording scope.
    fn discard(&mut self);
}
