use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::state::{AcquisitionSession, SessionResults, SessionStatus};
use crate::resolver::MediaKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("session was superseded by a newer request")]
    Superseded,
}

/// Proof that a flow owns the current session. Stale once a newer
/// [`SessionController::begin`] has run.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    generation: u64,
    token: CancellationToken,
}

impl SessionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancelled when a newer request supersedes this one
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct Inner {
    session: AcquisitionSession,
    generation: u64,
    token: CancellationToken,
}

/// Owns the single current acquisition session
#[derive(Debug)]
pub struct SessionController {
    inner: RwLock<Inner>,
    updates: watch::Sender<AcquisitionSession>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        let session = AcquisitionSession::idle();
        let (updates, _) = watch::channel(session.clone());
        Self {
            inner: RwLock::new(Inner {
                session,
                generation: 0,
                token: CancellationToken::new(),
            }),
            updates,
        }
    }

    /// Reset wholesale and enter `Probing`. Any earlier flow is cancelled
    /// and its ticket goes stale.
    pub async fn begin(&self, content_id: Option<String>, kind: MediaKind) -> SessionTicket {
        let mut inner = self.inner.write().await;
        inner.token.cancel();

        inner.generation += 1;
        inner.token = CancellationToken::new();
        inner.session = AcquisitionSession::new(content_id, kind);
        inner.session.status = SessionStatus::Probing;

        debug!(generation = inner.generation, session = %inner.session.id, "Session started");
        self.updates.send_replace(inner.session.clone());

        SessionTicket {
            generation: inner.generation,
            token: inner.token.clone(),
        }
    }

    pub async fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.inner.read().await.generation == ticket.generation
    }

    pub async fn mark_scanning(&self, ticket: &SessionTicket) -> Result<(), SessionError> {
        self.update(ticket, |session| transition(session, SessionStatus::Scanning))
            .await
    }

    pub async fn mark_tunneling(&self, ticket: &SessionTicket) -> Result<(), SessionError> {
        self.update(ticket, |session| transition(session, SessionStatus::Tunneling))
            .await
    }

    /// Clamped to 100; lower values than the current one are ignored
    pub async fn report_progress(
        &self,
        ticket: &SessionTicket,
        progress: u8,
    ) -> Result<(), SessionError> {
        self.update(ticket, |session| {
            if session.status.is_terminal() {
                return Err(SessionError::InvalidTransition {
                    from: session.status,
                    to: session.status,
                });
            }
            session.progress = session.progress.max(progress.min(100));
            Ok(())
        })
        .await
    }

    pub async fn complete(
        &self,
        ticket: &SessionTicket,
        results: SessionResults,
    ) -> Result<(), SessionError> {
        self.update(ticket, |session| {
            transition(session, SessionStatus::Ready)?;
            session.progress = 100;
            session.results = results;
            Ok(())
        })
        .await
    }

    pub async fn fail(
        &self,
        ticket: &SessionTicket,
        fallback_url: Option<String>,
        error: impl Into<String>,
    ) -> Result<(), SessionError> {
        let error = error.into();
        self.update(ticket, |session| {
            transition(session, SessionStatus::Fallback)?;
            session.fallback_url = fallback_url;
            session.error = Some(error);
            Ok(())
        })
        .await
    }

    pub async fn snapshot(&self) -> AcquisitionSession {
        self.inner.read().await.session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AcquisitionSession> {
        self.updates.subscribe()
    }

    async fn update<F>(&self, ticket: &SessionTicket, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut AcquisitionSession) -> Result<(), SessionError>,
    {
        let mut inner = self.inner.write().await;
        if inner.generation != ticket.generation {
            return Err(SessionError::Superseded);
        }

        apply(&mut inner.session)?;
        inner.session.updated_at = chrono::Utc::now();
        self.updates.send_replace(inner.session.clone());
        Ok(())
    }
}

fn transition(session: &mut AcquisitionSession, next: SessionStatus) -> Result<(), SessionError> {
    if !session.status.can_transition_to(next) {
        return Err(SessionError::InvalidTransition {
            from: session.status,
            to: next,
        });
    }
    debug!(session = %session.id, from = %session.status, to = %next, "Session transition");
    session.status = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn happy_path_reaches_ready() {
        let controller = SessionController::new();
        let ticket = controller.begin(Some("abc".into()), MediaKind::Audio).await;

        assert_eq!(controller.snapshot().await.status, SessionStatus::Probing);
        controller.mark_tunneling(&ticket).await.unwrap();
        controller.report_progress(&ticket, 40).await.unwrap();
        controller
            .complete(&ticket, SessionResults::default())
            .await
            .unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Ready);
        assert_eq!(snapshot.progress, 100);
    }

    #[tokio::test]
    async fn progress_never_decreases_and_is_clamped() {
        let controller = SessionController::new();
        let ticket = controller.begin(None, MediaKind::Video).await;
        controller.mark_tunneling(&ticket).await.unwrap();

        controller.report_progress(&ticket, 60).await.unwrap();
        controller.report_progress(&ticket, 30).await.unwrap();
        assert_eq!(controller.snapshot().await.progress, 60);

        controller.report_progress(&ticket, 250).await.unwrap();
        assert_eq!(controller.snapshot().await.progress, 100);
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let controller = SessionController::new();
        let ticket = controller.begin(None, MediaKind::Audio).await;
        controller.mark_tunneling(&ticket).await.unwrap();

        let err = controller.mark_scanning(&ticket).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: SessionStatus::Tunneling,
                to: SessionStatus::Scanning
            }
        );
    }

    #[tokio::test]
    async fn new_request_supersedes_and_cancels() {
        let controller = SessionController::new();
        let first = controller.begin(Some("one".into()), MediaKind::Audio).await;
        controller.mark_tunneling(&first).await.unwrap();

        let second = controller.begin(Some("two".into()), MediaKind::Video).await;

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!controller.is_current(&first).await);
        assert_eq!(
            controller.report_progress(&first, 90).await,
            Err(SessionError::Superseded)
        );

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.content_id.as_deref(), Some("two"));
        assert_eq!(snapshot.status, SessionStatus::Probing);
        assert_eq!(snapshot.progress, 0);
    }

    #[tokio::test]
    async fn fail_records_fallback_and_publishes() {
        let controller = SessionController::new();
        let mut updates = controller.subscribe();
        let ticket = controller.begin(Some("abc".into()), MediaKind::Audio).await;

        controller
            .fail(&ticket, Some("https://fallback.example/abc".into()), "P1:down")
            .await
            .unwrap();

        updates.changed().await.unwrap();
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.status, SessionStatus::Fallback);
        assert_eq!(latest.fallback_url.as_deref(), Some("https://fallback.example/abc"));
        assert_eq!(latest.error.as_deref(), Some("P1:down"));
    }
}
