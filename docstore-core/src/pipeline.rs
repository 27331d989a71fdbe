//! Ordered, short-circuiting transform pipelines.
//!
//! A [`Pipeline`] threads a value through its [`Stage`]s strictly in registration order.
//! The first stage to fail aborts the run: later stages never execute and the caller gets
//! back a [`Rejection`] holding the error and the *original* value.
//!
//! Entity stores keep one pipeline per hook (`before_create_validate`, `before_create`,
//! `before_update_validate`, `before_update`, `before_delete`); stages are added while the
//! store is being configured and cannot change afterwards.
//!
//! # Example
//!
//! ```ignore
//! use docstore::pipeline::{Pipeline, stage_fn};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .add(stage_fn("trim", |name: String| async move { Ok(name.trim().to_string()) }))
//!     .add(stage_fn("upper", |name: String| async move { Ok(name.to_uppercase()) }));
//!
//! assert_eq!(pipeline.run("  ada ".into()).await?, "ADA");
//! ```

use async_trait::async_trait;
use std::{fmt, future::Future, sync::Arc};

use crate::error::{DocumentStoreResult, Rejection};

/// A named asynchronous transform.
#[async_trait]
pub trait Stage<T: Send + 'static>: Send + Sync {
    /// Returns a short name used in logs.
    fn name(&self) -> &str;

    /// Transforms the value, or fails to abort the pipeline.
    async fn apply(&self, value: T) -> DocumentStoreResult<T>;
}

/// A [`Stage`] backed by an async closure. Build one with [`stage_fn`].
pub struct FnStage<F> {
    name: String,
    f: F,
}

/// Wraps an async closure as a named stage.
pub fn stage_fn<T, F, Fut>(name: impl Into<String>, f: F) -> FnStage<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = DocumentStoreResult<T>> + Send,
{
    FnStage { name: name.into(), f }
}

#[async_trait]
impl<T, F, Fut> Stage<T> for FnStage<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = DocumentStoreResult<T>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, value: T) -> DocumentStoreResult<T> {
        (self.f)(value).await
    }
}

/// An ordered sequence of stages.
pub struct Pipeline<T> {
    name: String,
    stages: Vec<Arc<dyn Stage<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Pipeline<T> {
    pub fn new() -> Self {
        Self::named("pipeline")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), stages: Vec::new() }
    }

    /// Appends a stage. Stages run in the order they were added.
    pub fn add(&mut self, stage: impl Stage<T> + 'static) -> &mut Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order, threading the value through.
    ///
    /// # Errors
    ///
    /// Returns the first stage error together with the untransformed input.
    pub async fn run(&self, initial: T) -> Result<T, Rejection<T>> {
        let mut value = initial.clone();

        for stage in &self.stages {
            value = match stage.apply(value).await {
                Ok(next) => next,
                Err(error) => {
                    tracing::debug!(
                        pipeline = %self.name,
                        stage = stage.name(),
                        %error,
                        "pipeline aborted",
                    );
                    return Err(Rejection::new(error, initial));
                }
            };
        }

        Ok(value)
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A pipeline can itself be a stage of a larger pipeline.
#[async_trait]
impl<T: Clone + Send + Sync + 'static> Stage<T> for Pipeline<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, value: T) -> DocumentStoreResult<T> {
        self.run(value)
            .await
            .map_err(Rejection::into_error)
    }
}

impl<T: Send + 'static> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}
