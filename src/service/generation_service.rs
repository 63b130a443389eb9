//! Generation orchestrator: reserve a credit, call the remote model,
//! settle the reservation and track the job.

use std::sync::Arc;

use chrono::Utc;

use super::export::{self, ArchiveOutput, ImageDownload};
use super::{CreditLedger, CreditReservation, ImageGenerator};
use crate::domain::{
    AspectRatio, DownloadQuality, EventBus, GenerationJob, JobBoard, JobId, JobOutcome, Session,
    SessionToken, Store, StorefrontEvent,
};
use crate::error::StorefrontError;

/// Credits charged per generation.
pub const GENERATION_COST: u64 = 1;

/// A job accepted and paid for, waiting for the remote call.
#[derive(Debug)]
pub struct PreparedJob {
    token: SessionToken,
    job: GenerationJob,
    reservation: CreditReservation,
}

impl PreparedJob {
    /// The job in its `generating` state.
    #[must_use]
    pub fn job(&self) -> &GenerationJob {
        &self.job
    }
}

/// Runs generations for customer sessions.
#[derive(Debug, Clone)]
pub struct GenerationService {
    store: Arc<Store>,
    ledger: CreditLedger,
    jobs: Arc<JobBoard>,
    generator: Arc<dyn ImageGenerator>,
    event_bus: EventBus,
}

impl GenerationService {
    /// Creates a new `GenerationService`.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        ledger: CreditLedger,
        jobs: Arc<JobBoard>,
        generator: Arc<dyn ImageGenerator>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            ledger,
            jobs,
            generator,
            event_bus,
        }
    }

    /// Validates the request, reserves one credit and records the job at
    /// the head of the session's board. No remote call is made.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] for a blank prompt,
    /// [`StorefrontError::Forbidden`] for administrator sessions and
    /// [`StorefrontError::InsufficientCredits`] when the balance is zero and
    /// [`StorefrontError::Unauthorized`] if the session closed meanwhile.
    pub async fn prepare(
        &self,
        session: &Session,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<PreparedJob, StorefrontError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StorefrontError::InvalidRequest("prompt must not be empty".to_string()));
        }
        let account_id = session.account_id().ok_or_else(|| {
            StorefrontError::Forbidden("only customer accounts can generate images".to_string())
        })?;

        let reservation = self.ledger.reserve(account_id, GENERATION_COST).await?;
        let job = GenerationJob::new(account_id, prompt.to_string(), aspect_ratio);
        self.jobs.push_front(&session.token, job.clone()).await;

        // Logout removes the session before discarding its board, so a push
        // racing a logout is caught here or by that discard.
        if self.store.session(&session.token).await.is_none() {
            self.jobs.discard(&session.token).await;
            if let Err(e) = self.ledger.release(reservation).await {
                tracing::error!(%account_id, error = %e, "could not refund generation for closed session");
            }
            return Err(StorefrontError::Unauthorized);
        }

        let _ = self.event_bus.publish(StorefrontEvent::JobStarted {
            account_id,
            job_id: job.id,
            prompt: job.prompt.clone(),
            aspect_ratio,
            timestamp: Utc::now(),
        });
        tracing::info!(job_id = %job.id, %account_id, %aspect_ratio, "generation started");
        Ok(PreparedJob {
            token: session.token.clone(),
            job,
            reservation,
        })
    }

    /// Performs the remote call for a prepared job and settles it.
    ///
    /// On success the job completes and the credit is committed; on failure
    /// the job fails with the error text and the credit is refunded.
    /// Returns the terminal job.
    pub async fn finish(&self, prepared: PreparedJob) -> GenerationJob {
        let PreparedJob {
            token,
            mut job,
            reservation,
        } = prepared;
        let job_id = job.id;
        let account_id = job.account_id;

        match self.generator.generate(&job.prompt, job.aspect_ratio).await {
            Ok(artifact) => {
                self.ledger.commit(reservation).await;
                job.complete(artifact.clone());
                self.settle(&token, job_id, JobOutcome::Completed(artifact)).await;
                let _ = self.event_bus.publish(StorefrontEvent::JobCompleted {
                    account_id,
                    job_id,
                    timestamp: Utc::now(),
                });
                tracing::info!(%job_id, %account_id, "generation completed");
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(refund) = self.ledger.release(reservation).await {
                    tracing::error!(%job_id, %account_id, error = %refund, "could not refund failed generation");
                }
                job.fail(message.clone());
                self.settle(&token, job_id, JobOutcome::Failed(message.clone())).await;
                let _ = self.event_bus.publish(StorefrontEvent::JobFailed {
                    account_id,
                    job_id,
                    error: message,
                    timestamp: Utc::now(),
                });
                tracing::warn!(%job_id, %account_id, error = %e, "generation failed");
            }
        }
        job
    }

    async fn settle(&self, token: &SessionToken, job_id: JobId, outcome: JobOutcome) {
        if self.jobs.finish(token, job_id, outcome).await.is_none() {
            tracing::debug!(%job_id, "session closed before the job finished");
        }
    }

    /// Runs a generation to completion and returns the terminal job.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::prepare`]; remote failures are reported
    /// through the returned job's status instead.
    pub async fn generate(
        &self,
        session: &Session,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<GenerationJob, StorefrontError> {
        let prepared = self.prepare(session, prompt, aspect_ratio).await?;
        Ok(self.finish(prepared).await)
    }

    /// Accepts a generation and finishes it in a background task.
    ///
    /// Returns the job in its `generating` state.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::prepare`].
    pub async fn submit(
        &self,
        session: &Session,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<GenerationJob, StorefrontError> {
        let prepared = self.prepare(session, prompt, aspect_ratio).await?;
        let job = prepared.job().clone();
        let service = self.clone();
        tokio::spawn(async move {
            service.finish(prepared).await;
        });
        Ok(job)
    }

    /// Returns the session's jobs, most recent first.
    pub async fn list(&self, session: &Session) -> Vec<GenerationJob> {
        self.jobs.list(&session.token).await
    }

    /// Returns one of the session's jobs.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::JobNotFound`] if the session has no such job.
    pub async fn get(&self, session: &Session, job_id: JobId) -> Result<GenerationJob, StorefrontError> {
        self.jobs
            .get(&session.token, job_id)
            .await
            .ok_or(StorefrontError::JobNotFound(*job_id.as_uuid()))
    }

    /// Decodes one completed job for download. Not gated on subscription.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::JobNotFound`] for unknown or unfinished
    /// jobs.
    pub async fn download(
        &self,
        session: &Session,
        job_id: JobId,
        quality: DownloadQuality,
    ) -> Result<ImageDownload, StorefrontError> {
        let job = self.get(session, job_id).await?;
        export::single_download(&job, quality)
    }

    /// Bundles the session's completed images into a zip archive.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::SubscriptionRequired`] unless the account
    /// has an approved purchase, [`StorefrontError::NothingToExport`] if no
    /// image is completed, and [`StorefrontError::Forbidden`] for
    /// administrator sessions.
    pub async fn export(
        &self,
        session: &Session,
        quality: DownloadQuality,
    ) -> Result<ArchiveOutput, StorefrontError> {
        let account_id = session
            .account_id()
            .ok_or_else(|| StorefrontError::Forbidden("administrator has no gallery".to_string()))?;
        let account = self.store.account(account_id).await?;
        if !account.is_subscribed {
            return Err(StorefrontError::SubscriptionRequired);
        }
        let jobs = self.jobs.list(&session.token).await;
        let output = tokio::task::spawn_blocking(move || export::build_archive(&jobs, quality))
            .await
            .map_err(|e| StorefrontError::Internal(format!("export task failed: {e}")))??;
        tracing::info!(
            %account_id,
            included = output.included,
            skipped = output.skipped,
            quality = quality.as_str(),
            "export archive built"
        );
        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::domain::{Account, ImageArtifact, JobStatus, SecretHash};
    use crate::persistence::{MemoryBackend, Slot};
    use crate::service::GenerationError;

    /// Replays scripted results and counts remote calls.
    #[derive(Debug, Default)]
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<ImageArtifact, GenerationError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn with(results: Vec<Result<ImageArtifact, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _aspect_ratio: AspectRatio,
        ) -> Result<ImageArtifact, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(GenerationError::Blocked))
        }
    }

    fn image() -> Result<ImageArtifact, GenerationError> {
        Ok(ImageArtifact::from_base64("image/jpeg", "/9j/4AAQ"))
    }

    fn blocked() -> Result<ImageArtifact, GenerationError> {
        Err(GenerationError::Api {
            status: 400,
            message: "blocked by safety policy".to_string(),
        })
    }

    struct Fixture {
        store: Arc<Store>,
        service: GenerationService,
        generator: Arc<ScriptedGenerator>,
        session: Session,
    }

    async fn fixture(credits: u64, subscribed: bool, script: Vec<Result<ImageArtifact, GenerationError>>) -> Fixture {
        let Ok(store) = Store::open(Arc::new(MemoryBackend::new())).await else {
            panic!("store should open");
        };
        let store = Arc::new(store);
        let mut account = Account::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            SecretHash::from_hash(String::new()),
            credits,
        );
        account.is_subscribed = subscribed;
        let session = Session::for_account(account.id);
        let inserted = store
            .mutate(&[Slot::Accounts], |s| {
                s.accounts.push(account);
                Ok(())
            })
            .await;
        assert!(inserted.is_ok());
        assert!(store.insert_session(session.clone()).await.is_ok());

        let bus = EventBus::new(64);
        let generator = ScriptedGenerator::with(script);
        let dyn_generator: Arc<dyn ImageGenerator> = Arc::clone(&generator) as Arc<dyn ImageGenerator>;
        let service = GenerationService::new(
            Arc::clone(&store),
            CreditLedger::new(Arc::clone(&store), bus.clone()),
            Arc::new(JobBoard::new()),
            dyn_generator,
            bus,
        );
        Fixture {
            store,
            service,
            generator,
            session,
        }
    }

    async fn balance(fx: &Fixture) -> u64 {
        let Some(account_id) = fx.session.account_id() else {
            panic!("customer session");
        };
        let Ok(account) = fx.store.account(account_id).await else {
            panic!("account exists");
        };
        account.credits
    }

    #[tokio::test]
    async fn success_debits_exactly_one_credit() {
        let fx = fixture(5, false, vec![image()]).await;
        let Ok(job) = fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await else {
            panic!("generation should be accepted");
        };
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.artifact.is_some());
        assert_eq!(balance(&fx).await, 4);
        assert!(fx.service.ledger.outstanding().await.is_empty());
    }

    #[tokio::test]
    async fn remote_failure_refunds_the_credit() {
        let fx = fixture(1, false, vec![blocked()]).await;
        let Ok(job) = fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await else {
            panic!("generation should be accepted");
        };
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.artifact.is_none());
        let Some(error) = job.error.as_deref() else {
            panic!("failed job carries its error");
        };
        assert!(error.contains("blocked by safety policy"));
        assert_eq!(balance(&fx).await, 1);

        let Ok(stored) = fx.service.get(&fx.session, job.id).await else {
            panic!("job is on the board");
        };
        assert_eq!(stored.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn empty_balance_is_rejected_before_remote_call() {
        let fx = fixture(0, false, vec![image()]).await;
        let result = fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await;
        assert!(matches!(
            result,
            Err(StorefrontError::InsufficientCredits { balance: 0, .. })
        ));
        assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(balance(&fx).await, 0);
        assert!(fx.service.list(&fx.session).await.is_empty());
    }

    #[tokio::test]
    async fn closed_session_gets_no_board_and_keeps_its_credit() {
        let fx = fixture(3, false, vec![image()]).await;
        assert!(fx.store.remove_session(&fx.session.token).await.is_ok());

        let result = fx.service.prepare(&fx.session, "a red fox", AspectRatio::Square).await;
        assert!(matches!(result, Err(StorefrontError::Unauthorized)));
        assert!(fx.service.list(&fx.session).await.is_empty());
        assert!(fx.service.ledger.outstanding().await.is_empty());
        assert_eq!(balance(&fx).await, 3);
        assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_prompt_and_admin_are_rejected() {
        let fx = fixture(5, false, vec![]).await;
        assert!(matches!(
            fx.service.generate(&fx.session, "   ", AspectRatio::Square).await,
            Err(StorefrontError::InvalidRequest(_))
        ));
        assert!(matches!(
            fx.service.generate(&Session::for_admin(), "a red fox", AspectRatio::Square).await,
            Err(StorefrontError::Forbidden(_))
        ));
        assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(balance(&fx).await, 5);
    }

    #[tokio::test]
    async fn jobs_are_listed_newest_first() {
        let fx = fixture(5, false, vec![image(), blocked()]).await;
        tokio_test::assert_ok!(fx.service.generate(&fx.session, "first", AspectRatio::Square).await);
        tokio_test::assert_ok!(fx.service.generate(&fx.session, "second", AspectRatio::Portrait).await);
        let statuses: Vec<(String, JobStatus)> = fx
            .service
            .list(&fx.session)
            .await
            .into_iter()
            .map(|j| (j.prompt, j.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("second".to_string(), JobStatus::Failed),
                ("first".to_string(), JobStatus::Completed)
            ]
        );
        assert_eq!(balance(&fx).await, 4);
    }

    #[tokio::test]
    async fn submit_finishes_in_background() {
        let fx = fixture(2, false, vec![image()]).await;
        let Ok(job) = fx.service.submit(&fx.session, "a red fox", AspectRatio::Widescreen).await else {
            panic!("submit should be accepted");
        };
        assert_eq!(job.status, JobStatus::Generating);

        let mut finished = None;
        for _ in 0..50 {
            if let Ok(current) = fx.service.get(&fx.session, job.id).await
                && current.is_terminal()
            {
                finished = Some(current);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let Some(finished) = finished else {
            panic!("job should finish");
        };
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(balance(&fx).await, 1);
    }

    #[tokio::test]
    async fn export_requires_subscription() {
        let fx = fixture(5, false, vec![image()]).await;
        tokio_test::assert_ok!(fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await);
        assert!(matches!(
            fx.service.export(&fx.session, DownloadQuality::Normal).await,
            Err(StorefrontError::SubscriptionRequired)
        ));
    }

    #[tokio::test]
    async fn export_bundles_completed_jobs() {
        let fx = fixture(5, true, vec![image(), blocked(), image()]).await;
        for prompt in ["one", "two", "three"] {
            tokio_test::assert_ok!(fx.service.generate(&fx.session, prompt, AspectRatio::Square).await);
        }
        let Ok(output) = fx.service.export(&fx.session, DownloadQuality::TwoK).await else {
            panic!("export should succeed");
        };
        assert_eq!(output.included, 2);
        assert_eq!(output.file_name, "Stock_Ai_Pic_Images_2k.zip");
    }

    #[tokio::test]
    async fn export_with_no_images_is_rejected() {
        let fx = fixture(5, true, vec![blocked()]).await;
        tokio_test::assert_ok!(fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await);
        assert!(matches!(
            fx.service.export(&fx.session, DownloadQuality::Normal).await,
            Err(StorefrontError::NothingToExport)
        ));
    }

    #[tokio::test]
    async fn download_is_not_gated() {
        let fx = fixture(5, false, vec![image()]).await;
        let Ok(job) = fx.service.generate(&fx.session, "a red fox", AspectRatio::Square).await else {
            panic!("generation should be accepted");
        };
        let Ok(download) = fx.service.download(&fx.session, job.id, DownloadQuality::Hd).await else {
            panic!("download should succeed");
        };
        assert_eq!(download.file_name, "a_red_fox_HD.jpg");
        assert!(matches!(
            fx.service.download(&fx.session, JobId::new(), DownloadQuality::Hd).await,
            Err(StorefrontError::JobNotFound(_))
        ));
    }
}
