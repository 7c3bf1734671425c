//! The probe HTTP layer: protocol gate, keep-alive and proxy dispatchers,
//! timeout/cancellation racing, and debug instrumentation.

pub mod cancel;
pub mod debug;
pub mod pool;
pub mod proxy;
pub mod request;

pub use cancel::{CancelHandle, CancelSignal};
pub use debug::{DebugRecord, DebugSink, NullDebugSink, TracingDebugSink};
pub use pool::{KeepAlivePool, KeepAlivePoolConfig};
pub use proxy::{resolve_proxy, ProxyAgentCache};
pub use request::{http_request, HttpRequestSpec, HttpResponseData};
