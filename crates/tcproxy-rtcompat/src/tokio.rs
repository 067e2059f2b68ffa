//! Entry points for use with Tokio runtimes.

pub use crate::impls::tokio::{TcpStream, TokioListener, TokioRuntime, TokioRuntimeHandle};

/// Create a new multi-threaded tokio runtime.
///
/// Generally you should call this function only once, and then hand
/// [`TokioRuntime::handle()`] to the code that needs a
/// [`Runtime`](crate::Runtime).
pub fn create_runtime() -> std::io::Result<TokioRuntime> {
    crate::impls::tokio::create_runtime()
}

/// Run a test function using a freshly created tokio runtime.
///
/// The runtime, and any task still running on it, is shut down once
/// `func`'s future has finished.
pub fn test_with_runtime<P, F, O>(func: P) -> O
where
    P: FnOnce(TokioRuntimeHandle) -> F,
    F: futures::Future<Output = O>,
{
    let runtime = create_runtime().expect("Unable to create a tokio runtime");
    runtime.block_on(func(runtime.handle()))
}
