use std::future::Future;

/// Bridges hyper's executor trait onto smol's global executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmolExecutor;

impl<F> hyper::rt::Executor<F> for SmolExecutor
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn execute(&self, fut: F) {
        smol::spawn(fut).detach();
    }
}
