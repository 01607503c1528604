//! The generator gateway: one validated [`DayPlan`] per call.
//!
//! ```text
//! request -> references (optional) -> prompt -> backend (retry) -> normalize -> schema
//! ```
//!
//! Only transient backend failures (429, 503) are retried. Malformed output
//! and schema failures are returned immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::model::{DayPlan, PlanRequest};
use crate::planner::DayGenerator;

use super::backend::GenerativeBackend;
use super::normalize::normalize;
use super::offline::OfflineBackend;
use super::prompt::{MealPlanPrompt, PromptRenderer, SYSTEM_PROMPT};
use super::references::{DEFAULT_REFERENCE_COUNT, RecipeSource, ReferenceRecipe, retrieval_query};
use super::schema::validate_day;

/// Exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based): `base_delay * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

pub struct GeneratorGateway {
    backend: Arc<dyn GenerativeBackend>,
    renderer: Arc<dyn PromptRenderer>,
    references: Option<Arc<dyn RecipeSource>>,
    retry: RetryPolicy,
}

impl GeneratorGateway {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            renderer: Arc::new(MealPlanPrompt),
            references: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Gateway over the canned offline backend.
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineBackend))
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PromptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_references(mut self, source: Arc<dyn RecipeSource>) -> Self {
        self.references = Some(source);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    async fn fetch_references(&self, request: &PlanRequest) -> Vec<ReferenceRecipe> {
        let Some(source) = &self.references else {
            return Vec::new();
        };
        let query = retrieval_query(request);
        match source.retrieve(&query, DEFAULT_REFERENCE_COUNT).await {
            Ok(found) => {
                debug!(count = found.len(), "retrieved reference recipes");
                found
            }
            Err(e) => {
                warn!(error = %e, "reference lookup failed, continuing without references");
                Vec::new()
            }
        }
    }

    /// Call the backend, retrying transient failures per the policy.
    async fn complete_with_retry(&self, user_prompt: &str) -> Result<String, PlanError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.backend.complete(SYSTEM_PROMPT, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        backend = self.backend.name(),
                        status = err.status,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient generator failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(PlanError::UpstreamGeneration {
                        status: err.status,
                        message: err.to_string(),
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl DayGenerator for GeneratorGateway {
    async fn generate_day(&self, request: &PlanRequest) -> Result<DayPlan, PlanError> {
        let references = self.fetch_references(request).await;
        let user_prompt = self.renderer.render(request, &references);

        let raw = self.complete_with_retry(&user_prompt).await?;
        let object = normalize(&raw).inspect_err(|e| {
            warn!(
                backend = self.backend.name(),
                preview = %e.preview,
                "generator output contained no JSON object"
            );
        })?;
        let day = validate_day(object).inspect_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "generated day failed validation");
        })?;

        info!(
            backend = self.backend.name(),
            model = self.backend.model(),
            meals = day.meals.len(),
            "generated day"
        );
        Ok(day)
    }
}
