use std::ops::ControlFlow;

/// A process advanced one unit of work at a time. `B` is its outcome once it is done, `C`
/// what every unfinished step reports.
pub trait Step<Ctx, B, C = ()> {
    type Error;

    fn step(&mut self, context: &mut Ctx) -> Result<ControlFlow<B, C>, Self::Error>;

    /// Steps until done, handing every intermediate report to `on_progress`.
    fn finish_with(
        &mut self,
        context: &mut Ctx,
        mut on_progress: impl FnMut(C),
    ) -> Result<B, Self::Error>
    where
        Self: Sized,
    {
        loop {
            match self.step(context)? {
                ControlFlow::Break(outcome) => return Ok(outcome),
                ControlFlow::Continue(report) => on_progress(report),
            }
        }
    }

    fn finish(&mut self, context: &mut Ctx) -> Result<B, Self::Error>
    where
        Self: Sized,
    {
        self.finish_with(context, |_| ())
    }
}

/// Cooperative cancellation, honoured at the process's next safe point.
pub trait Abort<C> {
    fn abort(&mut self, context: &mut C);
}
