//! In-memory, per-session generation history.
//!
//! Jobs are never persisted: a session's board is discarded on logout and
//! every board is lost on restart.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

use super::{GenerationJob, ImageArtifact, JobId, SessionToken};

/// Terminal transition applied by [`JobBoard::finish`].
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The remote call returned an image.
    Completed(ImageArtifact),
    /// The remote call failed with this message.
    Failed(String),
}

/// Job lists keyed by session token, most recent first.
#[derive(Debug, Default)]
pub struct JobBoard {
    boards: RwLock<HashMap<SessionToken, VecDeque<GenerationJob>>>,
}

impl JobBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `job` at the head of the session's list.
    pub async fn push_front(&self, token: &SessionToken, job: GenerationJob) {
        self.boards
            .write()
            .await
            .entry(token.clone())
            .or_default()
            .push_front(job);
    }

    /// Applies a terminal transition to a job still in `generating`.
    ///
    /// Returns the updated job, or `None` if the job is gone (session logged
    /// out) or was already terminal.
    pub async fn finish(
        &self,
        token: &SessionToken,
        job_id: JobId,
        outcome: JobOutcome,
    ) -> Option<GenerationJob> {
        let mut boards = self.boards.write().await;
        let job = boards
            .get_mut(token)?
            .iter_mut()
            .find(|job| job.id == job_id)?;
        let changed = match outcome {
            JobOutcome::Completed(artifact) => job.complete(artifact),
            JobOutcome::Failed(error) => job.fail(error),
        };
        changed.then(|| job.clone())
    }

    /// Returns the session's jobs, most recent first.
    pub async fn list(&self, token: &SessionToken) -> Vec<GenerationJob> {
        self.boards
            .read()
            .await
            .get(token)
            .map(|jobs| jobs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns one of the session's jobs.
    pub async fn get(&self, token: &SessionToken, job_id: JobId) -> Option<GenerationJob> {
        self.boards
            .read()
            .await
            .get(token)?
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
    }

    /// Drops the session's board, returning how many jobs it held.
    pub async fn discard(&self, token: &SessionToken) -> usize {
        self.boards
            .write()
            .await
            .remove(token)
            .map_or(0, |jobs| jobs.len())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AspectRatio, JobStatus};

    fn job(prompt: &str) -> GenerationJob {
        GenerationJob::new(AccountId::new(), prompt.to_string(), AspectRatio::Square)
    }

    #[tokio::test]
    async fn newest_job_is_listed_first() {
        let board = JobBoard::new();
        let token = SessionToken::generate();
        board.push_front(&token, job("first")).await;
        board.push_front(&token, job("second")).await;

        let prompts: Vec<String> = board.list(&token).await.into_iter().map(|j| j.prompt).collect();
        assert_eq!(prompts, vec!["second".to_string(), "first".to_string()]);
    }

    #[tokio::test]
    async fn finish_applies_once() {
        let board = JobBoard::new();
        let token = SessionToken::generate();
        let pending = job("a red fox");
        let id = pending.id;
        board.push_front(&token, pending).await;

        let Some(failed) = board
            .finish(&token, id, JobOutcome::Failed("blocked".to_string()))
            .await
        else {
            panic!("first transition should apply");
        };
        assert_eq!(failed.status, JobStatus::Failed);
        let again = board
            .finish(
                &token,
                id,
                JobOutcome::Completed(ImageArtifact::from_base64("image/jpeg", "AAAA")),
            )
            .await;
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn boards_are_isolated_and_discardable() {
        let board = JobBoard::new();
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        let owned = job("mine");
        let id = owned.id;
        board.push_front(&a, owned).await;

        assert!(board.get(&b, id).await.is_none());
        assert!(board.get(&a, id).await.is_some());
        assert_eq!(board.discard(&a).await, 1);
        assert!(board.list(&a).await.is_empty());
        assert!(board.finish(&a, id, JobOutcome::Failed("late".to_string())).await.is_none());
    }
}
