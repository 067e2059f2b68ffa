//! Support for mocking with runtimes.
//!
//! This should only be used for writing tests.
//!
//! Currently, we support listeners whose incoming connections (and
//! failures) are fed in by the test, and a runtime wrapper whose name
//! resolution and connection refusals are under the test's control.

pub mod net;
mod net_runtime;

pub use net::{mock_listener, MockListener, MockListenerHandle};
pub use net_runtime::MockNetRuntime;
