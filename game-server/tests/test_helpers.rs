use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use game_persistence::connection::connect_to_memory_database;
use game_persistence::{JsonScoreStore, ScoreRepository, ScoreStore};
use game_server::create_routes;
use game_server::session::{CSRF_HEADER, SESSION_COOKIE, SessionManager};
use migration::{Migrator, MigratorTrait};
use serde_json::Value;
use tempfile::TempDir;
use warp::http::StatusCode;
use warp::{Filter, Reply};

pub async fn sqlite_store() -> Arc<dyn ScoreStore> {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(ScoreRepository::new(db))
}

pub fn json_store(dir: &TempDir) -> Arc<dyn ScoreStore> {
    Arc::new(JsonScoreStore::new(dir.path().join("leaderboard.json")))
}

pub fn create_test_app(
    store: Arc<dyn ScoreStore>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let sessions = Arc::new(SessionManager::new(
        "test-secret",
        Duration::from_secs(30 * 60),
    ));
    create_routes(sessions, store, 10)
}

/// Browser stand-in: remembers the session cookie and CSRF token between
/// requests
pub struct TestClient<F> {
    app: F,
    cookie: Option<String>,
    pub csrf_token: Option<String>,
}

impl<F> TestClient<F>
where
    F: Filter + Clone + 'static,
    F::Extract: Reply + Send,
{
    /// A client that has already fetched its session and CSRF token
    pub async fn connect(app: F) -> Self {
        let mut client = Self::anonymous(app);
        let (status, body) = client.get("/session").await;
        assert_eq!(status, StatusCode::OK);
        client.csrf_token = body["csrf_token"].as_str().map(str::to_string);
        client
    }

    /// A client without a session
    pub fn anonymous(app: F) -> Self {
        Self {
            app,
            cookie: None,
            csrf_token: None,
        }
    }

    pub async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        let request = warp::test::request().method("GET").path(path);
        self.send(request).await
    }

    pub async fn post(&mut self, path: &str, body: Value) -> (StatusCode, Value) {
        let mut request = warp::test::request()
            .method("POST")
            .path(path)
            .json(&body);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token.as_str());
        }
        self.send(request).await
    }

    /// POST with an arbitrary content type and raw body
    pub async fn post_raw(
        &mut self,
        path: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut request = warp::test::request()
            .method("POST")
            .path(path)
            .header("content-type", content_type)
            .body(body.to_string());
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token.as_str());
        }
        self.send(request).await
    }

    /// Whether the server has handed this client a session cookie
    pub fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    async fn send(&mut self, mut request: warp::test::RequestBuilder) -> (StatusCode, Value) {
        if let Some(cookie) = &self.cookie {
            request = request.header("cookie", format!("{}={}", SESSION_COOKIE, cookie));
        }

        let response = request.reply(&self.app).await;

        if let Some(set_cookie) = response.headers().get("set-cookie") {
            let value = set_cookie.to_str().unwrap();
            let token = value
                .split(';')
                .next()
                .and_then(|pair| pair.strip_prefix(&format!("{}=", SESSION_COOKIE)))
                .unwrap();
            self.cookie = Some(token.to_string());
        }

        let body = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).unwrap()
        };
        (response.status(), body)
    }

    /// Starts a game and bisects until it is won, returning the attempts used
    pub async fn win_game(&mut self, difficulty: &str) -> u64 {
        let (status, game) = self
            .post("/game", serde_json::json!({ "difficulty": difficulty }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut low = game["feasible_low"].as_i64().unwrap();
        let mut high = game["feasible_high"].as_i64().unwrap();
        loop {
            let midpoint = low + (high - low) / 2;
            let (status, body) = self
                .post("/game/guess", serde_json::json!({ "guess": midpoint }))
                .await;
            assert_eq!(status, StatusCode::OK, "unexpected body {}", body);

            match body["outcome"].as_str().unwrap() {
                "correct" => return body["game"]["attempts"].as_u64().unwrap(),
                _ => {
                    low = body["game"]["feasible_low"].as_i64().unwrap();
                    high = body["game"]["feasible_high"].as_i64().unwrap();
                }
            }
        }
    }
}
