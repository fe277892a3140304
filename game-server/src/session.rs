use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use game_core::{ConfigError, GameState};
use game_types::Difficulty;

pub const SESSION_COOKIE: &str = "ng_session";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sid: String, // Session ID
    iat: u64,    // Issued at
    exp: u64,    // Expiry
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("session {0} expired while handling the request")]
    Expired(Uuid),
}

/// Per-visitor state. The game lives here and nowhere else.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub csrf_token: String,
    pub game: Option<GameState>,
    last_activity: Instant,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            csrf_token: Uuid::new_v4().simple().to_string(),
            game: None,
            last_activity: Instant::now(),
        }
    }

    pub fn csrf_matches(&self, provided: Option<&str>) -> bool {
        provided.is_some_and(|token| token == self.csrf_token)
    }

    /// The current game, starting a `normal` one if the visitor has none
    pub fn ensure_game(&mut self) -> Result<&mut GameState, ConfigError> {
        let game = match self.game.take() {
            Some(game) => game,
            None => GameState::start_difficulty(Difficulty::Normal, None)?,
        };
        Ok(self.game.insert(game))
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() >= timeout
    }
}

/// A resolved session plus the freshly signed cookie token for the response
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub token: String,
    max_age: Duration,
}

impl SessionHandle {
    pub fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            self.token,
            self.max_age.as_secs()
        )
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Session>>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(secret_key: &str, timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            timeout,
        }
    }

    /// Resolves the live session named by a cookie token. Never opens one.
    pub async fn resume(
        &self,
        token: Option<String>,
    ) -> Result<Option<SessionHandle>, SessionError> {
        let Some(id) = token.as_deref().and_then(|token| self.verify_token(token)) else {
            return Ok(None);
        };

        {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&id) {
                Some(session) => session.last_activity = Instant::now(),
                None => return Ok(None),
            }
        }

        self.handle(id).map(Some)
    }

    /// Like [`SessionManager::resume`], but opens a new session when the
    /// token is missing, forged, expired or refers to a swept session.
    pub async fn resume_or_create(
        &self,
        token: Option<String>,
    ) -> Result<SessionHandle, SessionError> {
        if let Some(handle) = self.resume(token).await? {
            return Ok(handle);
        }

        let session = Session::new(Uuid::new_v4());
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        debug!("Opened session {}", id);

        self.handle(id)
    }

    fn handle(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        Ok(SessionHandle {
            id,
            token: self.issue_token(id)?,
            max_age: self.timeout,
        })
    }

    /// Runs `f` against the session while holding the write lock
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::Expired(id))?;
        Ok(f(session))
    }

    pub async fn cleanup_expired_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.timeout));

        let removed = before - sessions.len();
        if removed > 0 {
            info!("Expired {} idle sessions", removed);
        }
        removed
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn issue_token(&self, id: Uuid) -> Result<String, SessionError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = SessionClaims {
            sid: id.to_string(),
            iat: now,
            exp: now + self.timeout.as_secs(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    fn verify_token(&self, token: &str) -> Option<Uuid> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Uuid::parse_str(&data.claims.sid).ok(),
            Err(e) => {
                debug!("Ignoring invalid session token: {:?}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new("test-secret", Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn test_new_session_without_cookie() {
        let sessions = manager();
        let handle = sessions.resume_or_create(None).await.unwrap();

        assert_eq!(sessions.active_sessions().await, 1);
        assert!(handle.cookie().starts_with("ng_session="));
        assert!(handle.cookie().contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_resume_with_valid_token() {
        let sessions = manager();
        let first = sessions.resume_or_create(None).await.unwrap();
        let second = sessions
            .resume_or_create(Some(first.token.clone()))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(sessions.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_forged_token_opens_new_session() {
        let sessions = manager();
        let first = sessions.resume_or_create(None).await.unwrap();

        let other = SessionManager::new("other-secret", Duration::from_secs(1800));
        let forged = other.issue_token(first.id).unwrap();

        let resumed = sessions.resume_or_create(Some(forged)).await.unwrap();
        assert_ne!(resumed.id, first.id);

        let garbage = sessions
            .resume_or_create(Some("not-a-jwt".to_string()))
            .await
            .unwrap();
        assert_ne!(garbage.id, first.id);
        assert_eq!(sessions.active_sessions().await, 3);
    }

    #[tokio::test]
    async fn test_resume_never_opens_sessions() {
        let sessions = manager();

        assert!(sessions.resume(None).await.unwrap().is_none());
        assert!(
            sessions
                .resume(Some("not-a-jwt".to_string()))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(sessions.active_sessions().await, 0);

        let opened = sessions.resume_or_create(None).await.unwrap();
        let resumed = sessions.resume(Some(opened.token)).await.unwrap().unwrap();
        assert_eq!(resumed.id, opened.id);
        assert_eq!(sessions.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_resume_after_sweep_is_none() {
        let sessions = SessionManager::new("test-secret", Duration::ZERO);
        let opened = sessions.resume_or_create(None).await.unwrap();
        sessions.cleanup_expired_sessions().await;

        // A validly signed token for a swept session resumes nothing
        let other = SessionManager::new("test-secret", Duration::from_secs(1800));
        let token = other.issue_token(opened.id).unwrap();
        assert!(sessions.resume(Some(token)).await.unwrap().is_none());
        assert_eq!(sessions.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_csrf_and_game_are_per_session() {
        let sessions = manager();
        let handle = sessions.resume_or_create(None).await.unwrap();

        let csrf = sessions
            .with_session(handle.id, |session| {
                session.ensure_game().unwrap();
                session.csrf_token.clone()
            })
            .await
            .unwrap();

        sessions
            .with_session(handle.id, |session| {
                assert!(session.csrf_matches(Some(&csrf)));
                assert!(!session.csrf_matches(Some("wrong")));
                assert!(!session.csrf_matches(None));
                assert_eq!(session.game.as_ref().unwrap().difficulty(), Difficulty::Normal);
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let sessions = SessionManager::new("test-secret", Duration::ZERO);
        let handle = sessions.resume_or_create(None).await.unwrap();

        assert_eq!(sessions.cleanup_expired_sessions().await, 1);
        assert_eq!(sessions.active_sessions().await, 0);
        assert!(matches!(
            sessions.with_session(handle.id, |_| ()).await,
            Err(SessionError::Expired(_))
        ));
    }
}
