use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use pkg_constants::lease::{
    DEFAULT_REBUILD_TTL_SECS, REBUILD_WAIT_MAX_SECS, REBUILD_WAIT_POLL_MS,
};
use pkg_provider::{EnvironmentProvider, ProviderContext};
use pkg_state::lease_store::LeaseStore;
use pkg_state::lock::RebuildLock;
use pkg_types::artifact::Artifact;
use pkg_types::error::{LeaseError, Result};
use pkg_types::lease::{LeaseRecord, StoredLease};

use crate::store_err;

/// What a successful reconciliation hands back to the caller, which
/// swaps its pointer (redirect target, embedded frame source) without
/// the public lease id changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub public_url: String,
    pub environment_ref: String,
}

/// Replaces dead environments from the stored artifact and repoints
/// the lease. A dead environment is never reconnected, only replaced.
pub struct RebuildReconciler {
    leases: LeaseStore,
    lock: RebuildLock,
    provider: Arc<dyn EnvironmentProvider>,
}

impl RebuildReconciler {
    pub fn new(
        leases: LeaseStore,
        lock: RebuildLock,
        provider: Arc<dyn EnvironmentProvider>,
    ) -> Self {
        Self {
            leases,
            lock,
            provider,
        }
    }

    /// Rebuild the environment behind `lease_id`.
    ///
    /// Exactly one reconciliation runs per lease at a time: the claim
    /// holder builds, everyone else waits for and returns the winner's
    /// result. Until the single full-record overwrite at the end, the
    /// stored record is untouched, so a failed attempt leaves the lease
    /// exactly as it was.
    pub async fn rebuild(&self, lease_id: &str) -> Result<RebuildOutcome> {
        let stored = self
            .leases
            .get(lease_id)
            .await
            .map_err(store_err)?
            .ok_or(LeaseError::NotFound)?;

        let record = match stored {
            StoredLease::Legacy(_) => {
                return Err(LeaseError::RecordInconsistency(
                    "lease predates artifact storage and cannot be rebuilt".to_string(),
                ));
            }
            StoredLease::Record(record) => record,
        };
        let Some(artifact) = record.artifact.clone() else {
            return Err(LeaseError::RecordInconsistency(
                "lease has no stored artifact; cannot auto-recover".to_string(),
            ));
        };

        let holder_id = Uuid::new_v4().to_string();
        if !self
            .lock
            .try_acquire(lease_id, &holder_id)
            .await
            .map_err(store_err)?
        {
            info!(
                "Rebuild of {} already in flight, waiting for its result",
                lease_id
            );
            return self.wait_for_winner(lease_id, &record).await;
        }

        let result = self.replace_environment(lease_id, &record, &artifact).await;
        if let Err(e) = self.lock.release(lease_id, &holder_id).await {
            warn!("Failed to release rebuild claim for {}: {}", lease_id, e);
        }
        result
    }

    /// Create, provision, and repoint. Environment creation strictly
    /// precedes the record overwrite: readers never observe a record
    /// pointing at an environment that does not exist yet.
    async fn replace_environment(
        &self,
        lease_id: &str,
        record: &LeaseRecord,
        artifact: &Artifact,
    ) -> Result<RebuildOutcome> {
        let ctx = ProviderContext::new(record.team_id.clone(), record.credential.clone());

        let new_ref = self.provider.create_environment(&ctx).await?;

        if artifact.has_additional_dependencies()
            && let Some(install_command) = &artifact.install_command
        {
            self.provider
                .run_command(&new_ref, install_command, &ctx)
                .await?;
            info!(
                "Installed dependencies [{}] in environment {}",
                artifact.dependencies.join(", "),
                new_ref
            );
        }

        for file in &artifact.files {
            self.provider
                .write_file(&new_ref, &file.path, &file.content, &ctx)
                .await
                .map_err(|e| LeaseError::FileWrite {
                    path: file.path.clone(),
                    reason: e.to_string(),
                })?;
        }

        self.provider
            .set_timeout(
                &new_ref,
                Duration::from_secs(DEFAULT_REBUILD_TTL_SECS),
                &ctx,
            )
            .await?;
        let new_url = self.provider.host_url(&new_ref, artifact.port);

        // One full-record overwrite: new environment fields together,
        // timestamps refreshed, expiry re-armed at the fixed rebuild
        // grant regardless of the original publish duration.
        let now = Utc::now();
        let updated = LeaseRecord {
            environment_ref: new_ref.clone(),
            public_url: new_url.clone(),
            created_at: now,
            updated_at: now,
            expires_at: now + chrono::Duration::seconds(DEFAULT_REBUILD_TTL_SECS as i64),
            ..record.clone()
        };
        self.leases.put(&updated).await.map_err(store_err)?;

        info!(
            "Rebuilt lease {}: environment {} replaced by {}",
            lease_id, record.environment_ref, new_ref
        );
        Ok(RebuildOutcome {
            public_url: new_url,
            environment_ref: new_ref,
        })
    }

    /// Poll until the in-flight rebuild's claim clears, then report what
    /// the winner wrote. `observed` is the record snapshot from before
    /// we found the claim held.
    async fn wait_for_winner(
        &self,
        lease_id: &str,
        observed: &LeaseRecord,
    ) -> Result<RebuildOutcome> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(REBUILD_WAIT_MAX_SECS);
        loop {
            tokio::time::sleep(Duration::from_millis(REBUILD_WAIT_POLL_MS)).await;

            if !self.lock.held(lease_id).await.map_err(store_err)? {
                let stored = self.leases.get(lease_id).await.map_err(store_err)?;
                return match stored {
                    Some(StoredLease::Record(record))
                        if record.updated_at > observed.updated_at =>
                    {
                        Ok(RebuildOutcome {
                            public_url: record.public_url,
                            environment_ref: record.environment_ref,
                        })
                    }
                    // The claim cleared but the record never advanced:
                    // the winner failed. Surface a retryable failure
                    // instead of silently racing a second build.
                    _ => Err(LeaseError::Provider(
                        "concurrent rebuild did not complete; retry".to_string(),
                    )),
                };
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LeaseError::TransientNetwork(format!(
                    "timed out after {}s waiting for in-flight rebuild of {}",
                    REBUILD_WAIT_MAX_SECS, lease_id
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeProvider;
    use pkg_state::client::StateStore;
    use pkg_types::artifact::ArtifactFile;

    struct Fixture {
        store: StateStore,
        leases: LeaseStore,
        lock: RebuildLock,
        provider: Arc<FakeProvider>,
        reconciler: RebuildReconciler,
    }

    async fn make_fixture(dir: &tempfile::TempDir) -> Fixture {
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();
        let leases = LeaseStore::new(store.clone());
        let lock = RebuildLock::new(store.clone());
        let provider = Arc::new(FakeProvider::new());
        let reconciler =
            RebuildReconciler::new(leases.clone(), lock.clone(), provider.clone());
        Fixture {
            store,
            leases,
            lock,
            provider,
            reconciler,
        }
    }

    fn make_record(lease_id: &str) -> LeaseRecord {
        let now = Utc::now();
        LeaseRecord {
            lease_id: lease_id.to_string(),
            environment_ref: "env-0".to_string(),
            public_url: "https://80-env-0.sandbox.example".to_string(),
            artifact: Some(Artifact {
                files: vec![ArtifactFile {
                    path: "index.html".to_string(),
                    content: "<h1>hi</h1>".to_string(),
                }],
                install_command: None,
                dependencies: vec![],
                port: 80,
            }),
            owner_id: "user-1".to_string(),
            team_id: None,
            credential: None,
            created_at: now,
            updated_at: now,
            expires_at: now + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_rebuild_repoints_lease_with_fresh_grant() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.leases.put(&make_record("abc123")).await.unwrap();

        let outcome = fx.reconciler.rebuild("abc123").await.unwrap();
        assert_eq!(outcome.environment_ref, "env-1");
        assert_ne!(outcome.public_url, "https://80-env-0.sandbox.example");

        let record = fx.leases.get("abc123").await.unwrap().unwrap();
        let record = record.record().unwrap().clone();
        // Ref and URL swapped together.
        assert_eq!(record.environment_ref, "env-1");
        assert_eq!(record.public_url, outcome.public_url);
        // Expiry is exactly rebuild time + the fixed rebuild grant.
        assert_eq!(
            (record.expires_at - record.updated_at).num_seconds(),
            DEFAULT_REBUILD_TTL_SECS as i64
        );
        // The artifact came along unchanged.
        assert_eq!(record.artifact, make_record("abc123").artifact);
        // Files were written into the new environment.
        let files = fx.provider.files.lock().unwrap();
        assert_eq!(
            files.as_slice(),
            &[(
                "env-1".to_string(),
                "index.html".to_string(),
                "<h1>hi</h1>".to_string()
            )]
        );
        // And the claim was released.
        assert!(!fx.lock.held("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_rebuild_installs_dependencies_before_files() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;

        let mut record = make_record("abc123");
        let artifact = record.artifact.as_mut().unwrap();
        artifact.install_command = Some("npm install left-pad".to_string());
        artifact.dependencies = vec!["left-pad".to_string()];
        fx.leases.put(&record).await.unwrap();

        fx.reconciler.rebuild("abc123").await.unwrap();

        let calls = fx.provider.calls.lock().unwrap();
        let install_pos = calls.iter().position(|c| c == "run_command").unwrap();
        let write_pos = calls.iter().position(|c| c == "write_file").unwrap();
        assert!(install_pos < write_pos);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.leases.put(&make_record("abc123")).await.unwrap();
        let before = fx
            .store
            .get("/registry/leases/abc123")
            .await
            .unwrap()
            .unwrap();

        fx.provider.fail_create();
        let err = fx.reconciler.rebuild("abc123").await.unwrap_err();
        assert!(matches!(err, LeaseError::Provider(_)));

        let after = fx
            .store
            .get("/registry/leases/abc123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before, after);
        assert!(!fx.lock.held("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_write_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.leases.put(&make_record("abc123")).await.unwrap();
        fx.provider.fail_write("index.html");

        let err = fx.reconciler.rebuild("abc123").await.unwrap_err();
        match err {
            LeaseError::FileWrite { path, .. } => assert_eq!(path, "index.html"),
            other => panic!("expected FileWrite, got {:?}", other),
        }

        let record = fx.leases.get("abc123").await.unwrap().unwrap();
        assert_eq!(record.record().unwrap().environment_ref, "env-0");
    }

    #[tokio::test]
    async fn test_missing_lease_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        assert!(matches!(
            fx.reconciler.rebuild("nope").await.unwrap_err(),
            LeaseError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_legacy_record_cannot_auto_recover() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.store
            .put(
                "/registry/leases/old",
                b"\"https://80-old.sandbox.example\"",
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.reconciler.rebuild("old").await.unwrap_err(),
            LeaseError::RecordInconsistency(_)
        ));
        assert_eq!(fx.provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_artifactless_record_cannot_auto_recover() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        let mut record = make_record("bare");
        record.artifact = None;
        fx.leases.put(&record).await.unwrap();

        assert!(matches!(
            fx.reconciler.rebuild("bare").await.unwrap_err(),
            LeaseError::RecordInconsistency(_)
        ));
    }

    #[tokio::test]
    async fn test_late_arrival_observes_winner_without_second_build() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.leases.put(&make_record("abc123")).await.unwrap();

        // Another caller already claimed the rebuild.
        assert!(fx.lock.try_acquire("abc123", "winner").await.unwrap());

        let reconciler = RebuildReconciler::new(
            fx.leases.clone(),
            fx.lock.clone(),
            fx.provider.clone(),
        );
        let waiter = tokio::spawn(async move { reconciler.rebuild("abc123").await });

        // The winner finishes its overwrite and releases the claim.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let now = Utc::now();
        let won = LeaseRecord {
            environment_ref: "env-9".to_string(),
            public_url: "https://80-env-9.sandbox.example".to_string(),
            created_at: now,
            updated_at: now,
            expires_at: now + chrono::Duration::seconds(DEFAULT_REBUILD_TTL_SECS as i64),
            ..make_record("abc123")
        };
        fx.leases.put(&won).await.unwrap();
        fx.lock.release("abc123", "winner").await.unwrap();

        let outcome = waiter.await.unwrap().unwrap();
        assert_eq!(outcome.environment_ref, "env-9");
        assert_eq!(outcome.public_url, "https://80-env-9.sandbox.example");
        // The waiter never built a second environment.
        assert_eq!(fx.provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_late_arrival_reports_failed_winner() {
        let dir = tempfile::tempdir().unwrap();
        let fx = make_fixture(&dir).await;
        fx.leases.put(&make_record("abc123")).await.unwrap();

        assert!(fx.lock.try_acquire("abc123", "winner").await.unwrap());
        let reconciler = RebuildReconciler::new(
            fx.leases.clone(),
            fx.lock.clone(),
            fx.provider.clone(),
        );
        let waiter = tokio::spawn(async move { reconciler.rebuild("abc123").await });

        // The winner dies without writing anything.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        fx.lock.release("abc123", "winner").await.unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, LeaseError::Provider(_)));
        assert_eq!(fx.provider.create_calls(), 0);
    }
}
