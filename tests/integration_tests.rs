// End-to-end tests: drive the app loop through its channels with a canned
// backend, observing the UiUpdate stream the TUI would render.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use matchday::api::{ApiError, LoginGrant, RemoteService};
use matchday::app::{self, AppState};
use matchday::auth::{AuthSession, SessionStore};
use matchday::chat::conversation::Role;
use matchday::chat::ConversationKind;
use matchday::config::{
    AuthConfig, Config, EndpointsConfig, HttpConfig, RevealConfig, StorageConfig,
};
use matchday::db::Database;
use matchday::predictions::record::PredictionRecord;
use matchday::predictions::FetchStatus;
use matchday::protocol::{ConversationView, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct CannedBackend {
    records: Vec<PredictionRecord>,
    answer: String,
}

#[async_trait]
impl RemoteService for CannedBackend {
    async fn fetch_predictions(&self) -> Result<Vec<PredictionRecord>, ApiError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(self.records.clone())
    }

    async fn ask(
        &self,
        _kind: ConversationKind,
        _question: &str,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        match token {
            Some(_) => Ok(self.answer.clone()),
            None => Err(ApiError::Status(401)),
        }
    }

    async fn login(&self, _email: &str, password: &str) -> Result<LoginGrant, ApiError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if password == "secret1" {
            Ok(LoginGrant {
                token: "tok-login".into(),
                expiry: Utc::now() + ChronoDuration::hours(1),
            })
        } else {
            Err(ApiError::Rejected(String::new()))
        }
    }
}

fn prediction(home: &str, away: &str, league: &str, accuracy: f64) -> PredictionRecord {
    serde_json::from_value(serde_json::json!({
        "home_team": home,
        "away_team": away,
        "league": league,
        "prediction_accuracy": accuracy,
    }))
    .expect("valid prediction")
}

fn test_config() -> Config {
    Config {
        endpoints: EndpointsConfig {
            predictions: "http://localhost/predictions".into(),
            chat: "http://localhost/chat".into(),
            weekly_chat: "http://localhost/weekly".into(),
            auth: "http://localhost/auth".into(),
        },
        http: HttpConfig { timeout_secs: 5 },
        reveal: RevealConfig { char_delay_ms: 20 },
        storage: StorageConfig {
            path: ":memory:".into(),
            daily_window_secs: 300,
            weekly_window_secs: 604_800,
        },
        auth: AuthConfig {
            min_password_len: 6,
        },
    }
}

struct Harness {
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    /// Start the app loop over `db`, restoring whatever it holds.
    fn start(db: Arc<Database>, answer: &str) -> Self {
        let backend = Arc::new(CannedBackend {
            records: vec![
                prediction("Arsenal", "Chelsea", "Premier League", 85.0),
                prediction("Inter", "Milan", "Serie A", 55.0),
            ],
            answer: answer.into(),
        });
        let (events_tx, events_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (ui_tx, ui_rx) = mpsc::channel(1024);

        let mut state = AppState::new(test_config(), db, backend, events_tx);
        state.hydrate(Utc::now()).expect("hydrate");

        let handle = tokio::spawn(app::run(cmd_rx, events_rx, ui_tx, state));
        Harness {
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    async fn send(&self, cmd: UserCommand) {
        self.cmd_tx.send(cmd).await.expect("app loop running");
    }

    /// Receive updates until one satisfies `pred`.
    async fn wait_for<F>(&mut self, mut pred: F) -> UiUpdate
    where
        F: FnMut(&UiUpdate) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let update = self.ui_rx.recv().await.expect("ui channel open");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("expected update never arrived")
    }

    async fn wait_for_conversation<F>(
        &mut self,
        kind: ConversationKind,
        mut pred: F,
    ) -> ConversationView
    where
        F: FnMut(&ConversationView) -> bool,
    {
        match self
            .wait_for(|u| matches!(u, UiUpdate::Conversation(v) if v.kind == kind && pred(&**v)))
            .await
        {
            UiUpdate::Conversation(view) => *view,
            other => panic!("unexpected update {other:?}"),
        }
    }

    async fn quit(self) {
        self.send(UserCommand::Quit).await;
        self.handle.await.expect("join").expect("app loop result");
    }
}

fn memory_db() -> Arc<Database> {
    Arc::new(Database::open(":memory:").expect("in-memory db"))
}

fn signed_in_db(expiry: chrono::DateTime<Utc>) -> Arc<Database> {
    let db = memory_db();
    SessionStore::new(Arc::clone(&db))
        .persist(&AuthSession {
            token: "tok-stored".into(),
            expiry,
            email: "fan@club.com".into(),
        })
        .expect("persist session");
    db
}

fn answered(view: &ConversationView, answer: &str) -> bool {
    view.turns
        .last()
        .is_some_and(|t| t.role == Role::Assistant && t.content == answer && !t.pending)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn question_is_answered_and_revealed() {
    let mut harness = Harness::start(signed_in_db(Utc::now() + ChronoDuration::hours(1)), "2-1");

    harness
        .send(UserCommand::Ask {
            kind: ConversationKind::Daily,
            question: "What is the score?".into(),
        })
        .await;

    let waiting = harness
        .wait_for_conversation(ConversationKind::Daily, |v| v.waiting)
        .await;
    assert_eq!(waiting.turns.len(), 2);
    assert_eq!(waiting.turns[0].content, "What is the score?");
    assert!(waiting.turns[1].pending);

    let done = harness
        .wait_for_conversation(ConversationKind::Daily, |v| answered(v, "2-1"))
        .await;
    assert_eq!(done.turns.len(), 2);
    assert!(!done.waiting);

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn dashboard_stats_cover_all_predictions() {
    let mut harness = Harness::start(signed_in_db(Utc::now() + ChronoDuration::hours(1)), "ok");

    let update = harness
        .wait_for(|u| matches!(u, UiUpdate::Predictions(b) if b.status == FetchStatus::Loaded))
        .await;
    let UiUpdate::Predictions(board) = update else {
        panic!("expected predictions");
    };
    assert_eq!(board.stats.total_matches, 2);
    assert_eq!(board.stats.average_accuracy, 70);
    assert_eq!(board.stats.high_accuracy_matches, 1);
    assert_eq!(board.stats.unique_leagues, 2);

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn expired_session_is_logged_out_on_load() {
    let db = signed_in_db(Utc::now() - ChronoDuration::minutes(1));
    let mut harness = Harness::start(Arc::clone(&db), "ok");

    harness
        .wait_for(|u| matches!(u, UiUpdate::Session(None)))
        .await;
    assert_eq!(
        SessionStore::new(Arc::clone(&db))
            .hydrate(Utc::now())
            .expect("hydrate"),
        matchday::auth::StoredSession::Absent
    );

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn login_then_ask_uses_new_session() {
    let mut harness = Harness::start(memory_db(), "3-0");
    harness
        .wait_for(|u| matches!(u, UiUpdate::Session(None)))
        .await;

    harness
        .send(UserCommand::Login {
            email: "fan@club.com".into(),
            password: "wrong-pass".into(),
        })
        .await;
    let failed = harness
        .wait_for(|u| matches!(u, UiUpdate::LoginFailed(_)))
        .await;
    assert_eq!(failed, UiUpdate::LoginFailed("Invalid credentials".into()));

    harness
        .send(UserCommand::Login {
            email: "fan@club.com".into(),
            password: "secret1".into(),
        })
        .await;
    harness
        .wait_for(|u| matches!(u, UiUpdate::Session(Some(info)) if info.email == "fan@club.com"))
        .await;

    harness
        .send(UserCommand::Ask {
            kind: ConversationKind::PreDay,
            question: "Who wins on Saturday?".into(),
        })
        .await;
    harness
        .wait_for_conversation(ConversationKind::PreDay, |v| answered(v, "3-0"))
        .await;

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn second_question_settles_the_running_reveal() {
    let answer = "Arsenal should edge it 2-1";
    let mut harness = Harness::start(signed_in_db(Utc::now() + ChronoDuration::hours(1)), answer);

    harness
        .send(UserCommand::Ask {
            kind: ConversationKind::Daily,
            question: "Arsenal or Chelsea?".into(),
        })
        .await;

    // Wait until the reveal has started but not finished.
    harness
        .wait_for_conversation(ConversationKind::Daily, |v| {
            v.turns
                .last()
                .is_some_and(|t| t.pending && !t.content.is_empty())
        })
        .await;

    harness
        .send(UserCommand::Ask {
            kind: ConversationKind::Daily,
            question: "And the scorer?".into(),
        })
        .await;

    let done = harness
        .wait_for_conversation(ConversationKind::Daily, |v| v.turns.len() == 4 && answered(v, answer))
        .await;
    assert_eq!(done.turns[1].content, answer);
    assert!(!done.turns[1].pending);
    assert_eq!(done.turns[2].content, "And the scorer?");

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn logout_clears_conversations() {
    let mut harness = Harness::start(signed_in_db(Utc::now() + ChronoDuration::hours(1)), "1-1");

    harness
        .send(UserCommand::Ask {
            kind: ConversationKind::Daily,
            question: "Draw?".into(),
        })
        .await;
    harness
        .wait_for_conversation(ConversationKind::Daily, |v| answered(v, "1-1"))
        .await;

    harness.send(UserCommand::Logout).await;
    harness
        .wait_for(|u| matches!(u, UiUpdate::Session(None)))
        .await;
    let cleared = harness
        .wait_for_conversation(ConversationKind::Daily, |v| v.turns.is_empty())
        .await;
    assert!(!cleared.restored);

    harness.quit().await;
}
