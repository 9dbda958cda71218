//! Phase-timing seam.
//!
//! The factory and module managers bracket lifecycle phases with
//! [`Tracer::enter`] / [`Tracer::exit`] calls. The default [`NullTracer`]
//! discards them; a profiling build can inject a recording implementation
//! without touching the call sites.

/// Receives enter/exit notifications around named phases.
///
/// Spans nest: an `enter("construct:a")` may be followed by further enters
/// before its matching exit. Implementations must not panic; a tracer is
/// observability, never control flow.
pub trait Tracer {
    /// A named span begins.
    fn enter(&self, span: &str);
    /// The most recently entered span with this name ends.
    fn exit(&self, span: &str);
}

/// Tracer that discards all spans.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn enter(&self, _span: &str) {}
    fn exit(&self, _span: &str) {}
}
