//! Builder for configuring an [`Engine`] and launching the background worker.

use std::sync::Arc;
use std::time::Duration;

use crate::element::WalkLimits;
use crate::engine::Engine;
use crate::error::{PasteGuardError, Result};
use crate::handle::EngineHandle;
use crate::sanitizer::UrlPolicy;
use crate::schema::WidgetSchemaRegistry;
use crate::settings::SettingsValidator;
use crate::worker;

/// Builder for an [`Engine`] or a running [`EngineHandle`].
///
/// Provides a fluent API for the walk limits, the URL policy, the widget
/// schema registry, and the worker's channel buffer, concurrency and
/// per-job deadline.
///
/// # Example
///
/// ```rust,no_run
/// use paste_guard::{EngineBuilder, UrlPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> paste_guard::Result<()> {
/// let handle = EngineBuilder::new()
///     .max_depth(32)
///     .max_nodes(5000)
///     .url_policy(UrlPolicy::new().allow_image_data(true))
///     .concurrency(8)
///     .deadline(Duration::from_millis(500))
///     .spawn()?;
///
/// let tree = handle.sanitize(serde_json::json!({ "elType": "section" })).await?;
/// handle.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EngineBuilder {
    registry: WidgetSchemaRegistry,
    url_policy: UrlPolicy,
    limits: WalkLimits,
    channel_buffer: usize,
    concurrency: usize,
    deadline: Duration,
}

impl EngineBuilder {
    /// Create a builder with sensible defaults.
    ///
    /// Defaults: built-in widget registry, `http`/`https`/`mailto`/`tel`
    /// URLs, depth 64, 10 000 nodes, channel buffer 1000, 4 concurrent jobs,
    /// 2 s deadline.
    pub fn new() -> Self {
        Self {
            registry: WidgetSchemaRegistry::builtin(),
            url_policy: UrlPolicy::default(),
            limits: WalkLimits::default(),
            channel_buffer: 1000,
            concurrency: 4,
            deadline: Duration::from_secs(2),
        }
    }

    /// Deepest accepted element nesting level.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = depth;
        self
    }

    /// Node budget for one top-level call.
    pub fn max_nodes(mut self, nodes: usize) -> Self {
        self.limits.max_nodes = nodes;
        self
    }

    /// URL policy shared by the URL, CSS and HTML sanitizers.
    pub fn url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Replace the widget schema registry.
    pub fn registry(mut self, registry: WidgetSchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Capacity of the internal mpsc channel between callers and the worker.
    pub fn channel_buffer(mut self, size: usize) -> Self {
        self.channel_buffer = size;
        self
    }

    /// Number of jobs the worker runs at the same time.
    pub fn concurrency(mut self, jobs: usize) -> Self {
        self.concurrency = jobs;
        self
    }

    /// Wall-clock budget per job. A job past its deadline answers `None`.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Consume the builder and return a synchronous [`Engine`].
    pub fn build(self) -> Engine {
        Engine::new(
            SettingsValidator::new(self.registry, self.url_policy),
            self.limits,
        )
    }

    /// Consume the builder, spawn the background worker, and return the
    /// [`EngineHandle`] used to submit payloads and stop the worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(self) -> Result<EngineHandle> {
        if self.channel_buffer == 0 {
            return Err(PasteGuardError::Config("channel_buffer must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(PasteGuardError::Config("concurrency must be at least 1".into()));
        }
        if self.deadline.is_zero() {
            return Err(PasteGuardError::Config("deadline must be non-zero".into()));
        }

        let (channel_buffer, concurrency, deadline) =
            (self.channel_buffer, self.concurrency, self.deadline);
        let engine = Arc::new(self.build());

        let (tx, rx) = tokio::sync::mpsc::channel(channel_buffer);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tracing::debug!(
            "Starting sanitization worker: {concurrency} concurrent jobs, {deadline:?} deadline"
        );
        let worker_handle = tokio::spawn(worker::run(
            rx,
            shutdown_rx,
            engine,
            concurrency,
            deadline,
        ));

        Ok(EngineHandle::new(tx, shutdown_tx, worker_handle))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSchema};
    use serde_json::json;

    #[test]
    fn build_applies_limits_and_policy() {
        let engine = EngineBuilder::new()
            .max_depth(1)
            .max_nodes(10)
            .url_policy(UrlPolicy::new().allow_scheme("ftp"))
            .build();
        assert_eq!(
            engine.walker().limits(),
            WalkLimits {
                max_depth: 1,
                max_nodes: 10
            }
        );
        assert_eq!(engine.sanitize_url("ftp://files.example.com"), "ftp://files.example.com");
    }

    #[test]
    fn build_uses_custom_registry() {
        let registry = WidgetSchemaRegistry::new()
            .register("banner", FieldSchema::new().field("body", FieldKind::Html));
        let engine = EngineBuilder::new().registry(registry).build();
        let settings = json!({ "body": "<em>x</em>", "title": "<em>x</em>" });
        let out = engine.validate_settings(settings.as_object().unwrap(), Some("banner"));
        assert_eq!(out["body"], json!("<em>x</em>"));
        assert_eq!(out["title"], json!("x"));
    }

    #[tokio::test]
    async fn spawn_rejects_degenerate_worker_options() {
        for builder in [
            EngineBuilder::new().channel_buffer(0),
            EngineBuilder::new().concurrency(0),
            EngineBuilder::new().deadline(Duration::ZERO),
        ] {
            assert!(matches!(builder.spawn(), Err(PasteGuardError::Config(_))));
        }
    }
}
