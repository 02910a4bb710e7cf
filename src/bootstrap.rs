use crate::config::{DowngradeLogLevel, FailurePolicy};
use crate::dashboard::DashboardAggregator;
use crate::errors::{AppError, AppResult};
use crate::identity::LocalIdentityStore;
use crate::models::{BootstrapState, EntryId};
use crate::notify::{Notification, Notifier};
use crate::profile::{ProfileForm, ProfileGateway, ProfilePayload};
use std::sync::Arc;

/// Decides at cold start whether a usable identity exists.
#[derive(Clone)]
pub struct ProfileResolver {
    identity: LocalIdentityStore,
    profiles: ProfileGateway,
    aggregator: DashboardAggregator,
    policy: FailurePolicy,
    log_level: DowngradeLogLevel,
}

impl ProfileResolver {
    pub fn new(
        identity: LocalIdentityStore,
        profiles: ProfileGateway,
        aggregator: DashboardAggregator,
        policy: FailurePolicy,
        log_level: DowngradeLogLevel,
    ) -> Self {
        Self {
            identity,
            profiles,
            aggregator,
            policy,
            log_level,
        }
    }

    /// A cached identity is trusted as-is and never re-validated remotely.
    /// Without one, the remote profile is fetched exactly once; any failure
    /// lands in onboarding under the tolerant policy.
    pub async fn resolve(&self) -> AppResult<BootstrapState> {
        if let Some(user_id) = self.identity.get() {
            tracing::debug!(user_id = %user_id, "using cached identity");
            return self.ready().await;
        }

        let profile = match self.profiles.fetch().await {
            Ok(profile) => profile,
            Err(error) => {
                if self.policy == FailurePolicy::Strict && !error.is_not_found() {
                    return Err(error);
                }
                self.log_level.log("profile_resolver", &error);
                return Ok(BootstrapState::NeedsProfile);
            }
        };

        let Some(user_id) = profile.id else {
            tracing::info!("remote profile has no identity, starting onboarding");
            return Ok(BootstrapState::NeedsProfile);
        };

        persist_identity(&self.identity, &user_id);
        self.ready().await
    }

    async fn ready(&self) -> AppResult<BootstrapState> {
        Ok(BootstrapState::Ready(self.aggregator.refresh().await?))
    }
}

/// Sends the onboarding form and establishes the identity it returns.
#[derive(Clone)]
pub struct ProfileSubmission {
    identity: LocalIdentityStore,
    profiles: ProfileGateway,
    aggregator: DashboardAggregator,
    notifier: Arc<dyn Notifier>,
}

impl ProfileSubmission {
    pub fn new(
        identity: LocalIdentityStore,
        profiles: ProfileGateway,
        aggregator: DashboardAggregator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            identity,
            profiles,
            aggregator,
            notifier,
        }
    }

    /// Every remote failure is reported as `AppError::Submit`.
    pub async fn submit(&self, form: &ProfileForm) -> AppResult<String> {
        let payload = ProfilePayload::from_form(form);
        let non_numeric = payload.non_numeric_fields();
        if !non_numeric.is_empty() {
            tracing::debug!(fields = ?non_numeric, "submitting profile with non-numeric fields");
        }

        let profile = self.profiles.update(&payload).await.map_err(|error| match error {
            AppError::Submit(reason) => AppError::Submit(reason),
            other => AppError::Submit(other.to_string()),
        })?;
        let user_id = profile
            .id
            .ok_or_else(|| AppError::Submit("profile update returned no id".to_string()))?;

        persist_identity(&self.identity, &user_id);
        Ok(user_id.to_string())
    }

    /// Runs a submission from `NeedsProfile`. A rejected submission comes back
    /// as the transient `SubmitError`; a successful one as `Ready` with a
    /// fresh summary.
    pub async fn complete(&self, form: &ProfileForm) -> AppResult<BootstrapState> {
        match self.submit(form).await {
            Ok(user_id) => {
                tracing::info!(user_id = %user_id, "profile established");
                self.notifier
                    .notify(Notification::success("Profile saved").with_detail("Your dashboard is ready"));
                Ok(BootstrapState::Ready(self.aggregator.refresh().await?))
            }
            Err(error) => {
                tracing::warn!(error = %error, "profile submission failed");
                self.notifier
                    .notify(Notification::error("Could not save profile", error.to_string()));
                Ok(BootstrapState::SubmitError(error.to_string()))
            }
        }
    }
}

/// The remote call already succeeded, so a local write failure only costs a
/// re-resolve on the next launch.
fn persist_identity(identity: &LocalIdentityStore, user_id: &EntryId) {
    if let Err(error) = identity.set(&user_id.to_string()) {
        tracing::warn!(user_id = %user_id, error = %error, "failed to persist identity");
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfileResolver, ProfileSubmission};
    use crate::config::{DowngradeLogLevel, FailurePolicy};
    use crate::dashboard::DashboardAggregator;
    use crate::db::{KeyValueStore, MemoryStore};
    use crate::errors::{AppError, AppResult};
    use crate::gateway::MetricGateways;
    use crate::identity::LocalIdentityStore;
    use crate::models::BootstrapState;
    use crate::notify::{ChannelNotifier, NotificationLevel};
    use crate::profile::{ProfileForm, ProfileGateway};
    use crate::testing::{Failure, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn resolver(
        transport: &Arc<ScriptedTransport>,
        identity: &LocalIdentityStore,
        policy: FailurePolicy,
    ) -> ProfileResolver {
        let aggregator = DashboardAggregator::new(
            MetricGateways::new(transport.clone()),
            policy,
            DowngradeLogLevel::Debug,
        );
        ProfileResolver::new(
            identity.clone(),
            ProfileGateway::new(transport.clone()),
            aggregator,
            policy,
            DowngradeLogLevel::Debug,
        )
    }

    fn submission(
        transport: &Arc<ScriptedTransport>,
        identity: &LocalIdentityStore,
    ) -> (ProfileSubmission, tokio::sync::mpsc::UnboundedReceiver<crate::notify::Notification>) {
        let (notifier, receiver) = ChannelNotifier::new();
        let aggregator = DashboardAggregator::new(
            MetricGateways::new(transport.clone()),
            FailurePolicy::Tolerant,
            DowngradeLogLevel::Debug,
        );
        let submission = ProfileSubmission::new(
            identity.clone(),
            ProfileGateway::new(transport.clone()),
            aggregator,
            Arc::new(notifier),
        );
        (submission, receiver)
    }

    /// Reads come back empty and every write fails.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::Persistence("disk full".to_string()))
        }

        fn remove(&self, _key: &str) -> AppResult<()> {
            Err(AppError::Persistence("disk full".to_string()))
        }
    }

    fn form() -> ProfileForm {
        ProfileForm {
            weight: "70".to_string(),
            height: "175".to_string(),
            age: "30".to_string(),
            sleep_quality: "80".to_string(),
            sleep_hours: "7".to_string(),
        }
    }

    #[tokio::test]
    async fn cached_identity_skips_profile_fetch_every_time() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.healthy_day();
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));
        identity.set("42").expect("seed identity");
        let resolver = resolver(&transport, &identity, FailurePolicy::Tolerant);

        let first = resolver.resolve().await.expect("first");
        let second = resolver.resolve().await.expect("second");

        assert!(first.is_ready());
        assert_eq!(first, second);
        assert_eq!(transport.count("GET", "profile"), 0);
    }

    #[tokio::test]
    async fn remote_identity_is_persisted_then_ready() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .healthy_day()
            .reply("GET", "profile", json!({"id": "77", "weight": 70, "height": 175, "age": 30}));
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));

        let state = resolver(&transport, &identity, FailurePolicy::Tolerant)
            .resolve()
            .await
            .expect("resolve");

        assert!(state.is_ready());
        assert_eq!(identity.get().as_deref(), Some("77"));
        assert_eq!(state.summary().map(|summary| summary.water), Some(750.0));
    }

    #[tokio::test]
    async fn fetch_failures_fall_back_to_onboarding() {
        for failure in [Failure::Network, Failure::NotFound, Failure::Server(503)] {
            let transport = Arc::new(ScriptedTransport::new());
            transport.healthy_day().fail("GET", "profile", failure);
            let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));

            let state = resolver(&transport, &identity, FailurePolicy::Tolerant)
                .resolve()
                .await
                .expect("tolerant resolve");

            assert_eq!(state, BootstrapState::NeedsProfile);
            assert!(identity.get().is_none());
            assert_eq!(transport.count("GET", "profile"), 1);
            assert_eq!(transport.count("GET", "water/today"), 0);
        }
    }

    #[tokio::test]
    async fn profile_without_id_needs_onboarding() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply("GET", "profile", json!({"weight": 70}));
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));

        let state = resolver(&transport, &identity, FailurePolicy::Tolerant)
            .resolve()
            .await
            .expect("resolve");
        assert_eq!(state, BootstrapState::NeedsProfile);
    }

    #[tokio::test]
    async fn strict_policy_escalates_transport_errors_but_not_missing_profiles() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("GET", "profile", Failure::Network);
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));
        let err = resolver(&transport, &identity, FailurePolicy::Strict)
            .resolve()
            .await
            .expect_err("strict");
        assert!(err.to_string().starts_with("NETWORK_FAILURE"));

        transport.fail("GET", "profile", Failure::NotFound);
        let state = resolver(&transport, &identity, FailurePolicy::Strict)
            .resolve()
            .await
            .expect("new user");
        assert_eq!(state, BootstrapState::NeedsProfile);
    }

    #[tokio::test]
    async fn successful_submission_persists_and_refreshes_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .healthy_day()
            .reply("PUT", "profile", json!({"id": 91, "weight": 70}));
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));
        let (submission, mut notifications) = submission(&transport, &identity);

        let state = submission.complete(&form()).await.expect("complete");

        assert!(state.is_ready());
        assert_eq!(identity.get().as_deref(), Some("91"));
        assert_eq!(transport.count("GET", "tasks/today"), 1);
        assert_eq!(
            transport.calls()[0].body,
            Some(json!({"weight": 70.0, "height": 175.0, "age": 30.0, "sleepQuality": 80.0, "sleepHours": 7.0}))
        );
        assert_eq!(notifications.try_recv().expect("toast").level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn rejected_submission_stays_unestablished_and_notifies() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.healthy_day().fail("PUT", "profile", Failure::Server(400));
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));
        let (submission, mut notifications) = submission(&transport, &identity);

        let state = submission.complete(&form()).await.expect("complete");

        assert!(matches!(state, BootstrapState::SubmitError(ref reason) if reason.contains("SERVER_ERROR 400")));
        assert!(identity.get().is_none());
        assert_eq!(transport.count("PUT", "profile"), 1);
        assert_eq!(transport.count("GET", "water/today"), 0);
        assert_eq!(notifications.try_recv().expect("toast").level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn non_numeric_fields_are_sent_as_null() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.healthy_day().reply("PUT", "profile", json!({"id": 5}));
        let identity = LocalIdentityStore::new(Arc::new(MemoryStore::new()));
        let (submission, _notifications) = submission(&transport, &identity);

        let user_id = submission
            .submit(&ProfileForm {
                weight: "heavy".to_string(),
                ..form()
            })
            .await
            .expect("submit");

        assert_eq!(user_id, "5");
        let body = transport.calls()[0].body.clone().expect("body");
        assert!(body["weight"].is_null());
    }

    #[tokio::test]
    async fn unsaved_remote_identity_still_reaches_the_dashboard() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.healthy_day().reply("GET", "profile", json!({"id": 77}));
        let identity = LocalIdentityStore::new(Arc::new(ReadOnlyStore));

        let state = resolver(&transport, &identity, FailurePolicy::Tolerant)
            .resolve()
            .await
            .expect("resolve");

        assert!(state.is_ready());
        assert_eq!(transport.count("GET", "profile"), 1);
        assert_eq!(transport.count("GET", "tasks/today"), 1);
        assert!(identity.get().is_none());
    }

    #[tokio::test]
    async fn unsaved_submitted_identity_still_reaches_the_dashboard() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.healthy_day().reply("PUT", "profile", json!({"id": 91}));
        let identity = LocalIdentityStore::new(Arc::new(ReadOnlyStore));
        let (submission, mut notifications) = submission(&transport, &identity);

        let state = submission.complete(&form()).await.expect("complete");

        assert!(state.is_ready());
        assert_eq!(transport.count("PUT", "profile"), 1);
        assert_eq!(transport.count("GET", "water/today"), 1);
        assert!(identity.get().is_none());
        assert_eq!(notifications.try_recv().expect("toast").level, NotificationLevel::Success);
    }
}
