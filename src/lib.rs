pub mod bootstrap;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod mutations;
pub mod notify;
pub mod profile;
pub mod session;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod testing;

pub use crate::bootstrap::{ProfileResolver, ProfileSubmission};
pub use crate::config::{ClientConfig, DowngradeLogLevel, FailurePolicy};
pub use crate::dashboard::{Aggregation, DashboardAggregator};
pub use crate::errors::{AppError, AppResult};
pub use crate::gateway::{MetricGateway, MetricGateways, NewMetricEntry, NormalizedTodayValue, RawMetricResponse, TaskDraft};
pub use crate::models::{BootstrapState, DailySummary, EntryId, MetricKind, Task, ThemePreference, WeekSummary};
pub use crate::mutations::MutationCoordinator;
pub use crate::notify::{ChannelNotifier, Notification, NotificationLevel, Notifier};
pub use crate::profile::ProfileForm;

use crate::db::{Database, KeyValueStore};
use crate::identity::{LocalIdentityStore, ThemeStore};
use crate::profile::ProfileGateway;
use crate::session::{AuthSession, KeyringSession};
use crate::transport::{ApiTransport, HttpTransport};
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Collaborators the engine runs against. `HealthApp::open` wires the
/// production ones; embedders and tests can supply their own.
pub struct AppParts {
    pub store: Arc<dyn KeyValueStore>,
    pub transport: Arc<dyn ApiTransport>,
    pub auth: Arc<dyn AuthSession>,
    pub notifier: Arc<dyn Notifier>,
}

/// Single owner of the bootstrap state and of the dashboard snapshot for the
/// current screen visit. Every transition goes through `&mut self`, so one
/// mutation completes before the next begins.
pub struct HealthApp {
    state: BootstrapState,
    dashboard: Option<DailySummary>,
    identity: LocalIdentityStore,
    themes: ThemeStore,
    resolver: ProfileResolver,
    submission: ProfileSubmission,
    aggregator: DashboardAggregator,
    mutations: MutationCoordinator,
    auth: Arc<dyn AuthSession>,
}

impl HealthApp {
    pub async fn open(config: ClientConfig, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(Database::new(&config.database_path())?);
        let auth = Arc::new(KeyringSession::new()?);

        let token = match auth.current_identity().await {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read auth token, continuing unauthenticated");
                None
            }
        };
        let transport = Arc::new(HttpTransport::new(&config, token.as_deref())?);

        Ok(Self::with_parts(
            &config,
            AppParts {
                store,
                transport,
                auth,
                notifier,
            },
        ))
    }

    pub fn with_parts(config: &ClientConfig, parts: AppParts) -> Self {
        let identity = LocalIdentityStore::new(parts.store.clone());
        let profiles = ProfileGateway::new(parts.transport.clone());
        let aggregator = DashboardAggregator::new(
            MetricGateways::new(parts.transport),
            config.failure_policy,
            config.downgrade_log_level,
        );

        Self {
            state: BootstrapState::Loading,
            dashboard: None,
            themes: ThemeStore::new(parts.store),
            resolver: ProfileResolver::new(
                identity.clone(),
                profiles.clone(),
                aggregator.clone(),
                config.failure_policy,
                config.downgrade_log_level,
            ),
            submission: ProfileSubmission::new(
                identity.clone(),
                profiles,
                aggregator.clone(),
                parts.notifier.clone(),
            ),
            mutations: MutationCoordinator::new(aggregator.clone(), parts.notifier),
            aggregator,
            identity,
            auth: parts.auth,
        }
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// The snapshot for the current dashboard visit, if one is loaded.
    pub fn summary(&self) -> Option<&DailySummary> {
        self.dashboard.as_ref()
    }

    pub async fn bootstrap(&mut self) -> AppResult<&BootstrapState> {
        self.state = BootstrapState::Loading;
        self.dashboard = None;
        let resolved = self.resolver.resolve().await?;
        if let BootstrapState::Ready(summary) = &resolved {
            self.dashboard = Some(summary.clone());
        }
        self.state = resolved;
        Ok(&self.state)
    }

    /// Returns `Ready` on success. A rejection returns the transient
    /// `SubmitError` while the app itself stays in `NeedsProfile`.
    pub async fn submit_profile(&mut self, form: &ProfileForm) -> AppResult<BootstrapState> {
        if !matches!(self.state, BootstrapState::NeedsProfile | BootstrapState::SubmitError(_)) {
            return Err(AppError::Validation("profile submission requires onboarding".to_string()));
        }

        let outcome = self.submission.complete(form).await?;
        match &outcome {
            BootstrapState::Ready(summary) => self.publish(summary.clone()),
            _ => self.state = BootstrapState::NeedsProfile,
        }
        Ok(outcome)
    }

    /// Rebuilds the snapshot when the dashboard regains focus. Does nothing
    /// until a profile is established.
    pub async fn on_dashboard_focus(&mut self) -> AppResult<Option<&DailySummary>> {
        if !self.state.is_ready() {
            return Ok(None);
        }
        let summary = self.aggregator.refresh().await?;
        self.publish(summary);
        Ok(self.dashboard.as_ref())
    }

    pub fn leave_dashboard(&mut self) {
        self.dashboard = None;
    }

    pub async fn add_task(&mut self, draft: &TaskDraft) -> AppResult<&DailySummary> {
        self.require_ready()?;
        let summary = self.mutations.create_task(draft).await?;
        self.publish(summary);
        self.loaded()
    }

    pub async fn toggle_task(&mut self, id: &EntryId) -> AppResult<&DailySummary> {
        let task = self
            .loaded()?
            .tasks
            .iter()
            .find(|task| &task.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("task {} is not on today's list", id)))?;
        let summary = self.mutations.toggle_task(&task).await?;
        self.publish(summary);
        self.loaded()
    }

    pub async fn delete_task(&mut self, id: &EntryId) -> AppResult<&DailySummary> {
        let current = self.loaded()?.clone();
        let summary = self.mutations.delete_task(&current, id).await?;
        self.publish(summary);
        self.loaded()
    }

    pub async fn add_entry(&mut self, entry: &NewMetricEntry) -> AppResult<&DailySummary> {
        self.require_ready()?;
        let summary = self.mutations.add_entry(entry).await?;
        self.publish(summary);
        self.loaded()
    }

    pub async fn remove_entry(&mut self, kind: MetricKind, id: &EntryId) -> AppResult<&DailySummary> {
        self.require_ready()?;
        let summary = self.mutations.remove_entry(kind, id).await?;
        self.publish(summary);
        self.loaded()
    }

    pub async fn week(&self, kind: MetricKind) -> AppResult<WeekSummary> {
        self.aggregator.gateways().get(kind).fetch_week().await
    }

    pub fn theme(&self) -> ThemePreference {
        self.themes.load()
    }

    pub fn toggle_theme(&self) -> ThemePreference {
        self.themes.toggle()
    }

    pub fn check_sign_up(&self, email: &str, password: &str) -> AppResult<String> {
        validation::check_sign_up(email, password)
    }

    /// Signs out and drops the in-memory state. The cached identity is kept
    /// unless `forget_identity` is set.
    pub async fn sign_out(&mut self, forget_identity: bool) -> AppResult<()> {
        self.auth.sign_out().await?;
        if forget_identity {
            self.identity.clear()?;
        }
        self.state = BootstrapState::Loading;
        self.dashboard = None;
        Ok(())
    }

    fn publish(&mut self, summary: DailySummary) {
        debug_assert!(summary.is_consistent());
        self.state = BootstrapState::Ready(summary.clone());
        self.dashboard = Some(summary);
    }

    fn require_ready(&self) -> AppResult<()> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(AppError::Validation("no established profile".to_string()))
        }
    }

    fn loaded(&self) -> AppResult<&DailySummary> {
        self.dashboard
            .as_ref()
            .ok_or_else(|| AppError::Validation("dashboard is not loaded".to_string()))
    }
}

pub fn init_tracing(log_dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
