//! The middleware pipeline: ordered handlers around a terminal transport.

mod json;

pub use json::JsonHandler;

use crate::envelope::Envelope;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A pipeline stage with pre- and post-request hooks.
///
/// `before` runs on the outgoing request; `after` runs on the populated
/// response, in reverse registration order. Both default to no-ops so
/// one-directional handlers implement only the hook they need.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Mutates the request before it is sent.
    async fn before(&self, env: &mut Envelope) -> Result<()> {
        let _ = env;
        Ok(())
    }

    /// Mutates the response after it has been received.
    async fn after(&self, env: &mut Envelope) -> Result<()> {
        let _ = env;
        Ok(())
    }
}

/// Terminal pipeline stage performing the actual I/O.
///
/// There is exactly one transport per pipeline and it has no inner
/// delegate.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and populates the envelope's response.
    async fn send(&self, env: &mut Envelope) -> Result<()>;
}

/// Immutable, shareable pipeline produced by [`PipelineBuilder::build`].
///
/// Handlers registered first wrap outermost: their `before` runs first and
/// their `after` runs last, nesting LIFO around the transport.
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Runs one envelope through the chain.
    ///
    /// Errors from any hook or from the transport propagate unwrapped to
    /// the caller; later stages do not run once a stage has failed.
    pub async fn invoke(&self, env: &mut Envelope) -> Result<()> {
        for handler in &self.handlers {
            handler.before(env).await?;
        }

        self.transport.send(env).await?;

        for handler in self.handlers.iter().rev() {
            handler.after(env).await?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// Two-phase builder for [`Pipeline`].
///
/// Mutable until [`build`](Self::build) succeeds, frozen afterwards: any
/// later `with` or `build` call fails with a frozen-state error while the
/// already-built pipeline remains usable.
#[derive(Default)]
pub struct PipelineBuilder {
    handlers: Vec<Arc<dyn Handler>>,
    built: bool,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("handlers", &self.handlers.len())
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Handlers registered earlier wrap outermost.
    pub fn with(&mut self, handler: Arc<dyn Handler>) -> Result<&mut Self> {
        if self.built {
            return Err(Error::frozen("pipeline already built; cannot add handlers"));
        }
        self.handlers.push(handler);
        Ok(self)
    }

    /// Wraps the registered handlers around the terminal transport,
    /// freezing the builder.
    pub fn build(&mut self, transport: Arc<dyn Transport>) -> Result<Pipeline> {
        if self.built {
            return Err(Error::frozen("pipeline already built; cannot build again"));
        }
        self.built = true;
        Ok(Pipeline {
            handlers: self.handlers.clone(),
            transport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Body, Request};
    use crate::errors::ErrorKind;
    use reqwest::Method;
    use std::sync::Mutex;

    fn envelope() -> Envelope {
        let base = url::Url::parse("https://api.github.com").unwrap();
        Envelope::new(Request::new(Method::GET, base, "/zen", Body::Empty).unwrap())
    }

    /// Records hook invocations into a shared trace.
    struct Tracing {
        name: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Handler for Tracing {
        async fn before(&self, _env: &mut Envelope) -> Result<()> {
            self.trace.lock().unwrap().push(format!("{}.before", self.name));
            Ok(())
        }

        async fn after(&self, _env: &mut Envelope) -> Result<()> {
            self.trace.lock().unwrap().push(format!("{}.after", self.name));
            Ok(())
        }
    }

    struct TracingTransport {
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for TracingTransport {
        async fn send(&self, env: &mut Envelope) -> Result<()> {
            self.trace.lock().unwrap().push("transport".to_string());
            env.response.status = 200;
            Ok(())
        }
    }

    struct FailingBefore;

    #[async_trait]
    impl Handler for FailingBefore {
        async fn before(&self, _env: &mut Envelope) -> Result<()> {
            Err(Error::invalid_operation("boom"))
        }
    }

    #[tokio::test]
    async fn test_lifo_nesting_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut builder = PipelineBuilder::new();
        builder
            .with(Arc::new(Tracing { name: "h1", trace: trace.clone() }))
            .unwrap()
            .with(Arc::new(Tracing { name: "h2", trace: trace.clone() }))
            .unwrap();
        let pipeline = builder
            .build(Arc::new(TracingTransport { trace: trace.clone() }))
            .unwrap();

        let mut env = envelope();
        pipeline.invoke(&mut env).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["h1.before", "h2.before", "transport", "h2.after", "h1.after"]
        );
    }

    #[tokio::test]
    async fn test_builder_frozen_after_build() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut builder = PipelineBuilder::new();
        let pipeline = builder
            .build(Arc::new(TracingTransport { trace: trace.clone() }))
            .unwrap();

        let late_with = builder.with(Arc::new(Tracing { name: "late", trace: trace.clone() }));
        assert_eq!(
            *late_with.unwrap_err().kind(),
            ErrorKind::PipelineFrozen
        );

        let late_build = builder.build(Arc::new(TracingTransport { trace: trace.clone() }));
        assert_eq!(
            *late_build.unwrap_err().kind(),
            ErrorKind::PipelineFrozen
        );

        // The previously built pipeline stays usable.
        let mut env = envelope();
        pipeline.invoke(&mut env).await.unwrap();
        assert_eq!(env.response.status, 200);
    }

    #[tokio::test]
    async fn test_before_failure_skips_transport() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut builder = PipelineBuilder::new();
        builder.with(Arc::new(FailingBefore)).unwrap();
        let pipeline = builder
            .build(Arc::new(TracingTransport { trace: trace.clone() }))
            .unwrap();

        let mut env = envelope();
        let err = pipeline.invoke(&mut env).await.unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidOperation);
        assert!(trace.lock().unwrap().is_empty());
    }
}
