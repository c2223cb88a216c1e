use anyhow::Result;
use gfx::{FrameContext, FrameGraph, SharedContext};
use world::World;

/// One unit of per-frame GPU work.
///
/// Implementations come out of their constructor fully initialized: resident
/// pipeline state is acquired in `new` and a missing shader or fixed
/// resource fails construction there. The owning renderer records each pass
/// at most once per frame, always in the same relative order, and never
/// records a pass it has disposed.
pub trait Pass {
    fn name(&self) -> &str;

    /// Declare every resource this pass reads and writes into the current
    /// frame graph, then install the command callback the backend will run.
    ///
    /// Reads make the pass a consumer of the resource (keeping upstream
    /// producers alive under culling); writes make it a producer, cullable
    /// unless something downstream consumes the output or the pass opts out
    /// with `never_cull`.
    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()>;

    /// Release the resident state created by the constructor.
    fn dispose(&mut self, ctx: &SharedContext);
}
