//! Trial execution
//!
//! Runs a fixed number of trials against a [`MeasurementProvider`], one after
//! the other, and applies the configured [`FailurePolicy`] when a trial fails.

use crate::{
    error::{AppError, Result},
    logging::TrialLogger,
    models::{Config, SkippedTrial, Trial, TrialRun},
    provider::MeasurementProvider,
    types::FailurePolicy,
};
use thiserror::Error;

/// Execution settings for one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Number of trials to run
    pub trial_count: u32,
    /// What to do when a trial fails
    pub policy: FailurePolicy,
}

impl ExecutionConfig {
    pub fn new(trial_count: u32, policy: FailurePolicy) -> Self {
        Self { trial_count, policy }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trial_count == 0 {
            return Err(AppError::validation("trial count must be at least 1"));
        }
        Ok(())
    }
}

impl From<&Config> for ExecutionConfig {
    fn from(config: &Config) -> Self {
        Self {
            trial_count: config.trial_count,
            policy: config.failure_policy,
        }
    }
}

/// Result of a collection that ran to the end
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOutcome {
    /// Trials that produced a sample, in trial order
    pub run: TrialRun,
    /// Trials that failed under best-effort collection
    pub skipped: Vec<SkippedTrial>,
    /// Trials requested
    pub requested: u32,
}

impl CollectionOutcome {
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// Every requested trial produced a sample
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.run.len() == self.requested as usize
    }

    pub fn into_run(self) -> TrialRun {
        self.run
    }
}

/// Fail-fast collection stopped at a failing trial
#[derive(Debug, Error)]
#[error("trial {trial_number} failed after {} completed trials: {error}", .partial_run.len())]
pub struct CollectionAborted {
    /// Samples collected before the failure
    pub partial_run: TrialRun,
    /// 1-based number of the failing trial
    pub trial_number: u32,
    #[source]
    pub error: AppError,
}

/// Why `collect` did not produce an outcome
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The request itself was invalid; no trial ran
    #[error(transparent)]
    Rejected(#[from] AppError),

    /// A trial failed under fail-fast collection
    #[error(transparent)]
    Aborted(#[from] CollectionAborted),
}

impl CollectionError {
    /// Samples collected before the failure (empty when rejected)
    pub fn partial_run(&self) -> Option<&TrialRun> {
        match self {
            CollectionError::Rejected(_) => None,
            CollectionError::Aborted(aborted) => Some(&aborted.partial_run),
        }
    }

    /// The underlying application error
    pub fn app_error(&self) -> &AppError {
        match self {
            CollectionError::Rejected(error) => error,
            CollectionError::Aborted(aborted) => &aborted.error,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.app_error().exit_code()
    }
}

impl From<CollectionError> for AppError {
    fn from(error: CollectionError) -> Self {
        match error {
            CollectionError::Rejected(error) => error,
            CollectionError::Aborted(aborted) => aborted.error,
        }
    }
}

/// Per-trial notification for progress display
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    Completed(Trial),
    Skipped(SkippedTrial),
}

type ProgressHook = Box<dyn FnMut(&TrialEvent) + Send>;

/// Sequential trial executor
pub struct TrialExecutor {
    config: ExecutionConfig,
    logger: Option<TrialLogger>,
    on_trial: Option<ProgressHook>,
}

impl TrialExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            logger: None,
            on_trial: None,
        }
    }

    pub fn with_logger(mut self, logger: TrialLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Call `hook` after every completed or skipped trial
    pub fn on_trial<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&TrialEvent) + Send + 'static,
    {
        self.on_trial = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run every trial in order
    ///
    /// Trial `i + 1` starts only after trial `i` returned. Samples are checked
    /// with [`MetricSample::validate`](crate::models::MetricSample::validate);
    /// an invalid sample is a failed trial.
    pub async fn collect<P>(&mut self, provider: &mut P) -> std::result::Result<CollectionOutcome, CollectionError>
    where
        P: MeasurementProvider + ?Sized,
    {
        self.config.validate()?;
        let ExecutionConfig { trial_count, policy } = self.config;

        if let Some(logger) = self.logger.as_mut() {
            logger.run_started(&provider.name(), trial_count, policy).await;
        }

        let mut run = TrialRun::new();
        let mut skipped = Vec::new();

        for test_number in 1..=trial_count {
            if let Some(logger) = &self.logger {
                logger.trial_started(test_number, trial_count).await;
            }

            let measured = provider.measure().await.and_then(|sample| {
                sample
                    .validate()
                    .map(|_| sample)
                    .map_err(|e| AppError::measurement(format!("provider returned an invalid sample: {}", e)))
            });

            match measured {
                Ok(sample) => {
                    let trial = Trial::new(test_number, sample);
                    if let Some(logger) = &self.logger {
                        logger.trial_completed(test_number, &sample).await;
                    }
                    run.push(trial);
                    self.notify(TrialEvent::Completed(trial));
                }
                Err(error) => match policy {
                    FailurePolicy::FailFast => {
                        if let Some(logger) = &self.logger {
                            logger.run_aborted(test_number, run.len(), &error).await;
                        }
                        return Err(CollectionAborted {
                            partial_run: run,
                            trial_number: test_number,
                            error,
                        }
                        .into());
                    }
                    FailurePolicy::BestEffort => {
                        let skip = SkippedTrial {
                            test_number,
                            reason: error.to_string(),
                        };
                        if let Some(logger) = &self.logger {
                            logger.trial_skipped(&skip, &error).await;
                        }
                        self.notify(TrialEvent::Skipped(skip.clone()));
                        skipped.push(skip);
                    }
                },
            }
        }

        if let Some(logger) = &self.logger {
            logger.run_finished(run.len(), skipped.len()).await;
        }

        Ok(CollectionOutcome {
            run,
            skipped,
            requested: trial_count,
        })
    }

    fn notify(&mut self, event: TrialEvent) {
        if let Some(hook) = self.on_trial.as_mut() {
            hook(&event);
        }
    }
}

/// Collect `trial_count` samples from `provider` under `policy`
pub async fn collect<P>(
    provider: &mut P,
    trial_count: u32,
    policy: FailurePolicy,
) -> std::result::Result<CollectionOutcome, CollectionError>
where
    P: MeasurementProvider + ?Sized,
{
    TrialExecutor::new(ExecutionConfig::new(trial_count, policy))
        .collect(provider)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSample;
    use crate::types::Metric;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Provider replaying a fixed script of results
    struct ScriptedProvider {
        script: VecDeque<Result<MetricSample>>,
        calls: u32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<MetricSample>>) -> Self {
            Self {
                script: script.into(),
                calls: 0,
            }
        }

        /// `count` successful trials, with the trials in `failing` (1-based) failing
        fn with_failures(count: u32, failing: &[u32]) -> Self {
            Self::new(
                (1..=count)
                    .map(|i| {
                        if failing.contains(&i) {
                            Err(AppError::measurement(format!("trial {} lost the connection", i)))
                        } else {
                            Ok(sample(i))
                        }
                    })
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl MeasurementProvider for ScriptedProvider {
        async fn measure(&mut self) -> Result<MetricSample> {
            self.calls += 1;
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(AppError::internal("script exhausted")))
        }

        fn name(&self) -> String {
            "scripted".to_string()
        }
    }

    fn sample(i: u32) -> MetricSample {
        MetricSample::new(40.0 + f64::from(i), 10.0, 12.0 + f64::from(i) / 2.0)
    }

    #[tokio::test]
    async fn test_collect_returns_every_sample_in_order() {
        let mut provider = ScriptedProvider::with_failures(5, &[]);
        let outcome = collect(&mut provider, 5, FailurePolicy::FailFast).await.unwrap();

        assert_eq!(provider.calls, 5);
        assert!(outcome.is_complete());
        assert_eq!(outcome.run.len(), 5);
        let numbers: Vec<u32> = outcome.run.iter().map(|t| t.test_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome.run.values(Metric::Download).unwrap(), vec![41.0, 42.0, 43.0, 44.0, 45.0]);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let mut provider = ScriptedProvider::with_failures(5, &[3]);
        let error = collect(&mut provider, 5, FailurePolicy::FailFast).await.unwrap_err();

        assert_eq!(provider.calls, 3);
        match error {
            CollectionError::Aborted(aborted) => {
                assert_eq!(aborted.trial_number, 3);
                assert_eq!(aborted.partial_run.len(), 2);
                assert!(matches!(aborted.error, AppError::Measurement(_)));
                assert!(aborted.to_string().starts_with("trial 3 failed after 2 completed trials"));
            }
            other => panic!("expected an aborted collection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_effort_skips_and_reports() {
        let mut provider = ScriptedProvider::with_failures(5, &[3]);
        let outcome = collect(&mut provider, 5, FailurePolicy::BestEffort).await.unwrap();

        assert_eq!(provider.calls, 5);
        assert_eq!(outcome.run.len(), 4);
        assert_eq!(outcome.skip_count(), 1);
        assert_eq!(outcome.skipped[0].test_number, 3);
        assert!(outcome.skipped[0].reason.contains("lost the connection"));
        assert!(!outcome.is_complete());

        let numbers: Vec<u32> = outcome.run.iter().map(|t| t.test_number).collect();
        assert_eq!(numbers, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_best_effort_with_every_trial_failing() {
        let mut provider = ScriptedProvider::with_failures(3, &[1, 2, 3]);
        let outcome = collect(&mut provider, 3, FailurePolicy::BestEffort).await.unwrap();

        assert!(outcome.run.is_empty());
        assert_eq!(outcome.skip_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_trials_is_rejected() {
        let mut provider = ScriptedProvider::with_failures(1, &[]);
        let error = collect(&mut provider, 0, FailurePolicy::FailFast).await.unwrap_err();

        assert_eq!(provider.calls, 0);
        assert!(matches!(error, CollectionError::Rejected(AppError::Validation(_))));
        assert!(error.partial_run().is_none());
        assert_eq!(error.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_invalid_sample_counts_as_failure() {
        let mut provider = ScriptedProvider::new(vec![
            Ok(sample(1)),
            Ok(MetricSample::new(f64::NAN, 1.0, 1.0)),
            Ok(sample(3)),
        ]);
        let error = collect(&mut provider, 3, FailurePolicy::FailFast).await.unwrap_err();

        assert_eq!(error.partial_run().map(TrialRun::len), Some(1));
        assert!(matches!(error.app_error(), AppError::Measurement(msg) if msg.contains("invalid sample")));
        assert_eq!(AppError::from(error).exit_code(), 2);
    }

    #[tokio::test]
    async fn test_progress_hook_sees_every_trial() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut executor = TrialExecutor::new(ExecutionConfig::new(3, FailurePolicy::BestEffort))
            .on_trial(move |event| sink.lock().unwrap().push(event.clone()));
        let mut provider = ScriptedProvider::with_failures(3, &[2]);
        executor.collect(&mut provider).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TrialEvent::Completed(Trial { test_number: 1, .. })));
        assert!(matches!(&events[1], TrialEvent::Skipped(skip) if skip.test_number == 2));
        assert!(matches!(events[2], TrialEvent::Completed(Trial { test_number: 3, .. })));
    }

    #[tokio::test]
    async fn test_collect_with_logger_and_boxed_provider() {
        let mut provider: Box<dyn MeasurementProvider> = Box::new(ScriptedProvider::with_failures(2, &[]));
        let mut executor = TrialExecutor::new(ExecutionConfig::new(2, FailurePolicy::FailFast))
            .with_logger(TrialLogger::new(&Config::default()));

        let outcome = executor.collect(&mut provider).await.unwrap();
        assert_eq!(outcome.into_run().len(), 2);
    }

    #[test]
    fn test_execution_config_from_config() {
        let config = Config {
            trial_count: 7,
            failure_policy: FailurePolicy::BestEffort,
            ..Default::default()
        };
        assert_eq!(ExecutionConfig::from(&config), ExecutionConfig::new(7, FailurePolicy::BestEffort));
    }

    proptest! {
        /// Fail-fast keeps exactly the trials before the first failure;
        /// best-effort keeps every non-failing trial
        #[test]
        fn policies_keep_expected_trials(
            count in 1u32..30,
            failing in proptest::collection::vec(1u32..30, 0..5),
        ) {
            let failing: Vec<u32> = failing.into_iter().filter(|&f| f <= count).collect();
            let first_failure = failing.iter().copied().min();

            let mut provider = ScriptedProvider::with_failures(count, &failing);
            let result = tokio_test::block_on(collect(&mut provider, count, FailurePolicy::FailFast));
            match first_failure {
                Some(first) => {
                    let error = result.unwrap_err();
                    prop_assert_eq!(error.partial_run().map(TrialRun::len), Some(first as usize - 1));
                }
                None => prop_assert_eq!(result.unwrap().run.len(), count as usize),
            }

            let mut provider = ScriptedProvider::with_failures(count, &failing);
            let outcome = tokio_test::block_on(collect(&mut provider, count, FailurePolicy::BestEffort)).unwrap();
            let mut distinct = failing.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(outcome.skip_count(), distinct.len());
            prop_assert_eq!(outcome.run.len() + outcome.skip_count(), count as usize);
        }
    }
}
