use crate::config::{DowngradeLogLevel, FailurePolicy};
use crate::errors::{AppError, AppResult};
use crate::gateway::{MetricGateways, NormalizedTodayValue};
use crate::models::{DailySummary, MetricKind};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug)]
pub struct MetricFailure {
    pub kind: MetricKind,
    pub error: AppError,
}

/// A summary plus the metrics that were zeroed to produce it.
#[derive(Debug)]
pub struct Aggregation {
    pub summary: DailySummary,
    pub failures: Vec<MetricFailure>,
}

impl Aggregation {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_kinds(&self) -> Vec<MetricKind> {
        self.failures.iter().map(|failure| failure.kind).collect()
    }
}

#[derive(Clone)]
pub struct DashboardAggregator {
    gateways: MetricGateways,
    policy: FailurePolicy,
    log_level: DowngradeLogLevel,
}

impl DashboardAggregator {
    pub fn new(gateways: MetricGateways, policy: FailurePolicy, log_level: DowngradeLogLevel) -> Self {
        Self {
            gateways,
            policy,
            log_level,
        }
    }

    pub fn gateways(&self) -> &MetricGateways {
        &self.gateways
    }

    /// Fetches all six `today` values concurrently and waits for every one
    /// to settle. Never fails; failed metrics are zeroed and reported.
    pub async fn collect(&self) -> Aggregation {
        let refresh_id = Uuid::new_v4();
        let span = tracing::info_span!("dashboard_refresh", refresh_id = %refresh_id);

        async {
            let gateways = &self.gateways;
            let (water, sleep, meditation, activity, sunlight, tasks) = tokio::join!(
                gateways.water.fetch_today(),
                gateways.sleep.fetch_today(),
                gateways.meditation.fetch_today(),
                gateways.activity.fetch_today(),
                gateways.sunlight.fetch_today(),
                gateways.tasks.fetch_today(),
            );

            let mut failures = Vec::new();
            let mut settle = |kind: MetricKind, result: AppResult<NormalizedTodayValue>| match result {
                Ok(value) => value,
                Err(error) => {
                    self.log_level.log("dashboard", &error);
                    tracing::info!(metric = %kind, "metric zeroed for this refresh");
                    failures.push(MetricFailure { kind, error });
                    NormalizedTodayValue::zero(kind)
                }
            };

            let water = settle(MetricKind::Water, water).amount();
            let sleep = settle(MetricKind::Sleep, sleep).amount();
            let meditation = settle(MetricKind::Meditation, meditation).amount();
            let activity = settle(MetricKind::Activity, activity).amount();
            let sunlight = settle(MetricKind::Sunlight, sunlight).amount();
            let tasks = match settle(MetricKind::Tasks, tasks) {
                NormalizedTodayValue::Tasks(tasks) => tasks,
                NormalizedTodayValue::Amount(_) => Vec::new(),
            };

            let summary = DailySummary {
                water,
                sleep,
                meditation,
                activity,
                sunlight,
                tasks_count: tasks.len(),
                tasks,
            };
            tracing::debug!(failed = failures.len(), "dashboard refresh settled");

            Aggregation { summary, failures }
        }
        .instrument(span)
        .await
    }

    /// Tolerant policy always yields a summary; strict policy returns the
    /// first metric error instead of a partial summary.
    pub async fn refresh(&self) -> AppResult<DailySummary> {
        let aggregation = self.collect().await;
        match self.policy {
            FailurePolicy::Tolerant => Ok(aggregation.summary),
            FailurePolicy::Strict => match aggregation.failures.into_iter().next() {
                Some(failure) => Err(failure.error),
                None => Ok(aggregation.summary),
            },
        }
    }
}
