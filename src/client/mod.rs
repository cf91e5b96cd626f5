//! Client-side session and reading cache.
//!
//! [`BpClient`] is the context object: it owns the session, the reading and
//! note cache, the streak tracker and the notification bus, and talks to the
//! backend through a [`RemoteApi`]. Clones share the same state.
//!
//! In-memory state sits behind `std::sync::Mutex`es that are never held
//! across an `.await`. A request still in flight when `logout` runs may
//! therefore land its result in the freshly cleared cache.

pub mod cache;
pub mod error;
pub mod notes;
pub mod notify;
pub mod remote;
pub mod session;
pub mod storage;
pub mod streak;

pub use cache::{Reading, ReadingCache, ReadingDraft, ReadingUpdate};
pub use error::{ApiError, AuthErrorKind, ClientError, Result};
pub use notes::{Note, NoteBook, NoteCategory, NoteDraft, NoteUpdate, Recurrence, Reminder};
pub use notify::{NotificationBus, Subscription};
pub use remote::{HttpRemote, RemoteApi};
pub use session::{RegisterForm, Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use streak::{StreakData, StreakTracker};

use crate::config::ClientConfig;
use crate::models::{AuthPayload, CreateReadingRequest, LoginRequest, Profile, TokenClaims, User};
use chrono::{Local, NaiveDate, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Owner id used for readings saved while nobody is signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

struct Inner {
    remote: Arc<dyn RemoteApi>,
    store: SessionStore,
    session: Mutex<Session>,
    cache: Mutex<ReadingCache>,
    bus: NotificationBus,
}

#[derive(Clone)]
pub struct BpClient {
    inner: Arc<Inner>,
}

impl BpClient {
    pub fn new(remote: Arc<dyn RemoteApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                store: SessionStore::new(storage),
                session: Mutex::new(Session::default()),
                cache: Mutex::new(ReadingCache::new()),
                bus: NotificationBus::new(),
            }),
        }
    }

    /// Client backed by [`HttpRemote`].
    pub fn http(config: &ClientConfig, storage: Arc<dyn SessionStorage>) -> Self {
        Self::new(Arc::new(HttpRemote::new(config)), storage)
    }

    fn session_guard(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache_guard(&self) -> MutexGuard<'_, ReadingCache> {
        self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.bus.notify();
    }

    /// Registers a callback run after every state change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    // ---- session ----

    pub fn session(&self) -> Session {
        self.session_guard().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_guard().is_authenticated
    }

    pub async fn login(&self, email: &str, password: &str, remember_email: bool) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::Validation("Email and password are required".into()));
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let payload = self
            .inner
            .remote
            .login(&request)
            .await
            .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidCredentials))?;

        self.inner
            .store
            .remember_email(remember_email.then_some(email))
            .await?;
        let session = self.establish(payload).await?;
        info!(email, "signed in");
        Ok(session)
    }

    pub async fn register(&self, form: RegisterForm) -> Result<Session> {
        form.validate()?;

        let payload = self
            .inner
            .remote
            .register(&form.to_request())
            .await
            .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidCredentials))?;

        let session = self.establish(payload).await?;
        info!(email = %form.email.trim(), "registered");
        Ok(session)
    }

    /// Persists the new credentials, swaps in the session and loads that
    /// user's readings.
    async fn establish(&self, payload: AuthPayload) -> Result<Session> {
        self.inner.store.save(&payload.user, &payload.token).await?;

        let session = Session::authenticated(payload.user, payload.token);
        *self.session_guard() = session.clone();
        self.cache_guard().clear();
        self.notify();

        self.reload_quietly().await;
        Ok(session)
    }

    async fn reload_quietly(&self) {
        if let Err(err) = self.reload_readings().await {
            warn!("could not load readings: {err}");
        }
    }

    /// Tells the backend (failures are only logged), then always wipes the
    /// persisted keys, the session and the cache.
    pub async fn logout(&self) -> Result<()> {
        let token = self.session_guard().token.clone();
        if let Some(token) = token {
            if let Err(err) = self.inner.remote.logout(&token).await {
                warn!("logout request failed: {err}");
            }
        }

        let cleared = self.inner.store.clear().await;
        *self.session_guard() = Session::default();
        self.cache_guard().clear();
        self.notify();
        info!("signed out");
        cleared
    }

    /// Rebuilds the session from storage without checking the token with the
    /// backend.
    pub async fn restore(&self) -> Result<Session> {
        let session = self.inner.store.load().await?;
        *self.session_guard() = session.clone();
        self.notify();

        if session.is_authenticated {
            info!(user = session.user_id().unwrap_or_default(), "session restored");
            self.reload_quietly().await;
        }
        Ok(session)
    }

    /// Merges `updates` into the current profile and saves it remotely.
    pub async fn update_profile(&self, updates: Profile) -> Result<User> {
        let (token, mut profile) = {
            let session = self.session_guard();
            match (&session.token, &session.user) {
                (Some(token), Some(user)) if session.is_authenticated => (token.clone(), user.profile.clone()),
                _ => return Err(unauthenticated()),
            }
        };
        profile.merge(updates);

        let user = self
            .inner
            .remote
            .update_profile(&token, &profile)
            .await
            .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidToken))?;
        self.inner.store.save_user(&user).await?;

        {
            let mut session = self.session_guard();
            if session.token.as_deref() == Some(token.as_str()) {
                session.user = Some(user.clone());
            }
        }
        self.notify();
        Ok(user)
    }

    pub async fn verify_session(&self) -> Result<TokenClaims> {
        let token = self.session_guard().token.clone().ok_or_else(unauthenticated)?;
        self.inner
            .remote
            .verify(&token)
            .await
            .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidToken))
    }

    pub async fn remembered_email(&self) -> Result<Option<String>> {
        self.inner.store.remembered_email().await
    }

    // ---- readings ----

    /// Replaces the cached readings with the signed-in user's history.
    pub async fn reload_readings(&self) -> Result<usize> {
        let (token, user_id) = {
            let session = self.session_guard();
            let user_id = session.user_id().map(str::to_owned).ok_or_else(unauthenticated)?;
            (session.token.clone(), user_id)
        };

        let records = self
            .inner
            .remote
            .list_readings(token.as_deref(), &user_id)
            .await
            .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidToken))?;
        let count = records.len();
        self.cache_guard()
            .replace_readings(records.into_iter().map(Reading::from).collect());
        self.notify();
        Ok(count)
    }

    /// Saves a reading under the signed-in user, or `anonymous` when nobody
    /// is signed in. If the backend cannot be reached the draft is kept
    /// locally under a `local-` id instead. No validation happens here.
    pub async fn add_reading(&self, draft: ReadingDraft) -> Reading {
        let (token, user_id) = {
            let session = self.session_guard();
            let user_id = session.user_id().unwrap_or(ANONYMOUS_USER).to_string();
            (session.token.clone(), user_id)
        };

        let request = CreateReadingRequest {
            user_id,
            reading: draft.to_wire(),
        };
        let reading = match self.inner.remote.create_reading(token.as_deref(), &request).await {
            Ok(record) => Reading::from(record),
            Err(err) => {
                warn!("saving reading failed, keeping local copy: {err}");
                Reading::local(draft)
            }
        };

        self.cache_guard().insert(reading.clone());
        self.notify();
        reading
    }

    /// Edits a cached reading. Confirmed readings are updated on the backend
    /// first and a failure there leaves the cache untouched; local-only
    /// readings are edited in place.
    pub async fn update_reading(&self, id: &str, update: ReadingUpdate) -> Result<Reading> {
        let current = self
            .cache_guard()
            .get(id)
            .cloned()
            .ok_or_else(|| reading_not_found(id))?;

        let updated = match &current.server_id {
            Some(server_id) => {
                let token = self.session_guard().token.clone();
                let record = self
                    .inner
                    .remote
                    .update_reading(token.as_deref(), server_id, &update.to_wire())
                    .await
                    .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidToken))?;
                Reading::from(record)
            }
            None => {
                let mut reading = current.clone();
                update.apply(&mut reading);
                reading
            }
        };

        if !self.cache_guard().replace(id, updated.clone()) {
            warn!(reading = id, "reading left the cache during update");
        }
        self.notify();
        Ok(updated)
    }

    /// Removes a reading, from the backend too when it was confirmed there.
    pub async fn delete_reading(&self, id: &str) -> Result<Reading> {
        let server_id = self
            .cache_guard()
            .get(id)
            .map(|reading| reading.server_id.clone())
            .ok_or_else(|| reading_not_found(id))?;

        if let Some(server_id) = server_id {
            let token = self.session_guard().token.clone();
            self.inner
                .remote
                .delete_reading(token.as_deref(), &server_id)
                .await
                .map_err(|err| ClientError::from_api(err, AuthErrorKind::InvalidToken))?;
        }

        let removed = self.cache_guard().remove(id).ok_or_else(|| reading_not_found(id))?;
        self.notify();
        Ok(removed)
    }

    pub fn list_readings(&self) -> Vec<Reading> {
        self.cache_guard().readings().to_vec()
    }

    pub fn latest_reading(&self) -> Option<Reading> {
        self.cache_guard().latest().cloned()
    }

    pub fn recent_readings(&self, n: usize) -> Vec<Reading> {
        self.cache_guard().recent(n).to_vec()
    }

    pub fn streak(&self) -> StreakData {
        self.streak_as_of(Local::now().date_naive())
    }

    pub fn streak_as_of(&self, today: NaiveDate) -> StreakData {
        self.cache_guard().streak_as_of(today)
    }

    /// Empties readings and notes and resets the streak. The session is kept.
    pub fn clear(&self) {
        self.cache_guard().clear();
        self.notify();
    }

    // ---- notes (local only) ----

    pub fn add_note(&self, draft: NoteDraft) -> Note {
        let note = self.cache_guard().notes_mut().add(draft, Utc::now());
        self.notify();
        note
    }

    pub fn update_note(&self, id: &str, update: NoteUpdate) -> Result<Note> {
        let note = self.cache_guard().notes_mut().update(id, update, Utc::now())?;
        self.notify();
        Ok(note)
    }

    pub fn delete_note(&self, id: &str) -> Result<Note> {
        let note = self.cache_guard().notes_mut().delete(id)?;
        self.notify();
        Ok(note)
    }

    pub fn toggle_note_favorite(&self, id: &str) -> Result<bool> {
        let favorite = self.cache_guard().notes_mut().toggle_favorite(id, Utc::now())?;
        self.notify();
        Ok(favorite)
    }

    pub fn search_notes(&self, query: &str) -> Vec<Note> {
        self.cache_guard().notes().search(query)
    }

    pub fn notes_by_category(&self, category: NoteCategory) -> Vec<Note> {
        self.cache_guard().notes().by_category(category)
    }

    pub fn favorite_notes(&self) -> Vec<Note> {
        self.cache_guard().notes().favorites()
    }

    pub fn notes_with_reminders(&self) -> Vec<Note> {
        self.cache_guard().notes().with_reminders()
    }

    pub fn all_notes(&self) -> Vec<Note> {
        self.cache_guard().notes().all().to_vec()
    }

    pub fn clear_notes(&self) {
        self.cache_guard().notes_mut().clear();
        self.notify();
    }
}

fn unauthenticated() -> ClientError {
    ClientError::auth(AuthErrorKind::Unauthenticated, "Not signed in")
}

fn reading_not_found(id: &str) -> ClientError {
    ClientError::NotFound(format!("Reading {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::tests::local_noon;
    use crate::client::storage::{USER_DATA, USER_TOKEN};
    use crate::models::{NewReading, ReadingRecord, RegisterRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-process stand-in for the backend.
    #[derive(Default)]
    struct FakeRemote {
        offline: AtomicBool,
        verify_calls: AtomicUsize,
        readings: Mutex<Vec<ReadingRecord>>,
    }

    impl FakeRemote {
        fn user(email: &str) -> User {
            User {
                id: "u1".into(),
                user_id: "user_1".into(),
                email: email.into(),
                name: "Ana".into(),
                profile: Profile::default(),
                created_at: Utc::now(),
                last_login: None,
            }
        }

        fn check_online(&self) -> std::result::Result<(), ApiError> {
            if self.offline.load(Ordering::SeqCst) {
                Err(ApiError::network("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteApi for FakeRemote {
        async fn register(&self, request: &RegisterRequest) -> std::result::Result<AuthPayload, ApiError> {
            self.check_online()?;
            if request.email == "taken@example.com" {
                return Err(ApiError::new(Some(409), "User with this email already exists"));
            }
            Ok(AuthPayload {
                user: Self::user(&request.email),
                token: "tok-new".into(),
            })
        }

        async fn login(&self, request: &LoginRequest) -> std::result::Result<AuthPayload, ApiError> {
            self.check_online()?;
            if request.password != "secret" {
                return Err(ApiError::new(Some(401), "Invalid email or password"));
            }
            Ok(AuthPayload {
                user: Self::user(&request.email),
                token: "tok-1".into(),
            })
        }

        async fn logout(&self, _token: &str) -> std::result::Result<(), ApiError> {
            self.check_online()
        }

        async fn verify(&self, _token: &str) -> std::result::Result<TokenClaims, ApiError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.check_online()?;
            Ok(TokenClaims {
                user_id: "user_1".into(),
                email: "ana@example.com".into(),
            })
        }

        async fn update_profile(&self, _token: &str, profile: &Profile) -> std::result::Result<User, ApiError> {
            self.check_online()?;
            let mut user = Self::user("ana@example.com");
            user.profile = profile.clone();
            Ok(user)
        }

        async fn list_readings(
            &self,
            _token: Option<&str>,
            _user_id: &str,
        ) -> std::result::Result<Vec<ReadingRecord>, ApiError> {
            self.check_online()?;
            Ok(self.readings.lock().unwrap().clone())
        }

        async fn create_reading(
            &self,
            _token: Option<&str>,
            request: &CreateReadingRequest,
        ) -> std::result::Result<ReadingRecord, ApiError> {
            self.check_online()?;
            let mut readings = self.readings.lock().unwrap();
            let now = Utc::now();
            let record = ReadingRecord {
                id: format!("srv-{}", readings.len() + 1),
                user_id: request.user_id.clone(),
                systolic: request.reading.systolic.unwrap_or_default(),
                diastolic: request.reading.diastolic.unwrap_or_default(),
                pulse: request.reading.pulse,
                notes: request.reading.notes.clone().unwrap_or_default(),
                tags: request.reading.tags.clone().unwrap_or_default(),
                timestamp: request.reading.timestamp.unwrap_or(now),
                created_at: now,
                updated_at: now,
            };
            readings.push(record.clone());
            Ok(record)
        }

        async fn update_reading(
            &self,
            _token: Option<&str>,
            reading_id: &str,
            updates: &NewReading,
        ) -> std::result::Result<ReadingRecord, ApiError> {
            self.check_online()?;
            let mut readings = self.readings.lock().unwrap();
            let record = readings
                .iter_mut()
                .find(|record| record.id == reading_id)
                .ok_or_else(|| ApiError::new(Some(404), "Reading not found"))?;
            if let Some(systolic) = updates.systolic {
                record.systolic = systolic;
            }
            if let Some(diastolic) = updates.diastolic {
                record.diastolic = diastolic;
            }
            if let Some(notes) = &updates.notes {
                record.notes = notes.clone();
            }
            if let Some(timestamp) = updates.timestamp {
                record.timestamp = timestamp;
            }
            record.updated_at = Utc::now();
            Ok(record.clone())
        }

        async fn delete_reading(&self, _token: Option<&str>, reading_id: &str) -> std::result::Result<(), ApiError> {
            self.check_online()?;
            let mut readings = self.readings.lock().unwrap();
            let index = readings
                .iter()
                .position(|record| record.id == reading_id)
                .ok_or_else(|| ApiError::new(Some(404), "Reading not found"))?;
            readings.remove(index);
            Ok(())
        }
    }

    fn client() -> (BpClient, Arc<FakeRemote>, Arc<MemoryStorage>) {
        let remote = Arc::new(FakeRemote::default());
        let storage = Arc::new(MemoryStorage::new());
        let client = BpClient::new(remote.clone(), storage.clone());
        (client, remote, storage)
    }

    fn count_notifications(client: &BpClient) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _ = client.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    #[tokio::test]
    async fn login_persists_session_and_remembers_email() {
        let (client, _, storage) = client();
        let session = client.login(" ana@example.com ", "secret", true).await.unwrap();

        assert!(session.is_authenticated);
        assert_eq!(client.session(), session);
        assert_eq!(storage.get(USER_TOKEN).await.unwrap().as_deref(), Some("tok-1"));
        assert!(storage.get(USER_DATA).await.unwrap().is_some());
        assert_eq!(client.remembered_email().await.unwrap().as_deref(), Some("ana@example.com"));

        client.login("ana@example.com", "secret", false).await.unwrap();
        assert_eq!(client.remembered_email().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_login_stays_signed_out() {
        let (client, remote, _) = client();

        let err = client.login("", "secret", false).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = client.login("ana@example.com", "wrong", false).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::InvalidCredentials));
        assert!(!client.is_authenticated());

        remote.offline.store(true, Ordering::SeqCst);
        let err = client.login("ana@example.com", "secret", false).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(client.session(), Session::default());
    }

    #[tokio::test]
    async fn register_reports_duplicates_as_conflict() {
        let (client, _, _) = client();
        let form = RegisterForm {
            email: "taken@example.com".into(),
            password: "secret".into(),
            name: "Ana".into(),
            profile: None,
        };
        let err = client.register(form.clone()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::Conflict));

        let session = client
            .register(RegisterForm {
                email: "new@example.com".into(),
                ..form
            })
            .await
            .unwrap();
        assert_eq!(session.token.as_deref(), Some("tok-new"));
    }

    #[tokio::test]
    async fn offline_reading_is_kept_with_local_id() {
        let (client, remote, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();

        remote.offline.store(true, Ordering::SeqCst);
        let reading = client.add_reading(ReadingDraft::new(132, 85).with_pulse(72)).await;

        assert!(reading.id.starts_with("local-"));
        assert_eq!(reading.server_id, None);
        assert_eq!(client.latest_reading(), Some(reading));
    }

    #[tokio::test]
    async fn confirmed_reading_carries_server_id() {
        let (client, _, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();

        let reading = client.add_reading(ReadingDraft::new(120, 80).with_note("morning")).await;
        assert_eq!(reading.id, "srv-1");
        assert_eq!(reading.server_id.as_deref(), Some("srv-1"));
        assert_eq!(reading.user_id.as_deref(), Some("user_1"));
        assert_eq!(client.list_readings().len(), 1);
    }

    #[tokio::test]
    async fn readings_list_newest_first_and_feed_the_streak() {
        let (client, _, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();

        for day in [2, 1, 3] {
            client
                .add_reading(ReadingDraft::new(120, 80).with_timestamp(local_noon(2024, 1, day)))
                .await;
        }

        let readings = client.list_readings();
        assert!(readings.windows(2).all(|pair| pair[0].timestamp >= pair[1].timestamp));
        assert_eq!(client.recent_readings(2).len(), 2);

        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let streak = client.streak_as_of(today);
        assert_eq!((streak.current_streak, streak.best_streak), (3, 3));
    }

    #[tokio::test]
    async fn signed_out_reading_is_sent_as_anonymous() {
        let (client, remote, _) = client();
        let reading = client.add_reading(ReadingDraft::new(118, 78)).await;

        assert_eq!(reading.user_id.as_deref(), Some(ANONYMOUS_USER));
        assert_eq!(remote.readings.lock().unwrap()[0].user_id, ANONYMOUS_USER);
    }

    #[tokio::test]
    async fn deleting_a_reading_shortens_the_streak() {
        let (client, remote, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();
        for day in 1..=3 {
            client
                .add_reading(ReadingDraft::new(120, 80).with_timestamp(local_noon(2024, 1, day)))
                .await;
        }
        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(client.streak_as_of(today).current_streak, 3);

        let middle = client.list_readings()[1].clone();
        let removed = client.delete_reading(&middle.id).await.unwrap();
        assert_eq!(removed.id, middle.id);
        assert_eq!(client.list_readings().len(), 2);
        assert_eq!(remote.readings.lock().unwrap().len(), 2);

        let streak = client.streak_as_of(today);
        assert_eq!((streak.current_streak, streak.best_streak), (1, 1));

        let err = client.delete_reading(&middle.id).await.unwrap_err();
        assert_eq!(err, ClientError::NotFound(format!("Reading {} not found", middle.id)));
    }

    #[tokio::test]
    async fn failed_remote_delete_keeps_the_reading() {
        let (client, remote, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();
        let reading = client.add_reading(ReadingDraft::new(120, 80)).await;

        remote.offline.store(true, Ordering::SeqCst);
        let err = client.delete_reading(&reading.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(client.list_readings(), vec![reading]);
    }

    #[tokio::test]
    async fn local_readings_are_edited_and_removed_without_the_backend() {
        let (client, remote, _) = client();
        remote.offline.store(true, Ordering::SeqCst);
        let local = client.add_reading(ReadingDraft::new(120, 80)).await;

        let edited = client
            .update_reading(
                &local.id,
                ReadingUpdate {
                    note: Some("retake".into()),
                    ..ReadingUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.id, local.id);
        assert_eq!(edited.note, "retake");

        client.delete_reading(&local.id).await.unwrap();
        assert!(client.list_readings().is_empty());
    }

    #[tokio::test]
    async fn confirmed_reading_update_goes_through_the_backend() {
        let (client, remote, _) = client();
        client.login("ana@example.com", "secret", false).await.unwrap();
        let reading = client
            .add_reading(ReadingDraft::new(120, 80).with_timestamp(local_noon(2024, 1, 2)))
            .await;

        let updated = client
            .update_reading(
                &reading.id,
                ReadingUpdate {
                    systolic: Some(135),
                    timestamp: Some(local_noon(2024, 1, 1)),
                    ..ReadingUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.systolic, 135);
        assert_eq!(remote.readings.lock().unwrap()[0].systolic, 135);
        assert_eq!(client.latest_reading(), Some(updated));

        let streak = client.streak_as_of(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(streak.last_reading_date, NaiveDate::from_ymd_opt(2024, 1, 1));

        let err = client
            .update_reading("missing", ReadingUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_is_down() {
        let (client, remote, storage) = client();
        client.login("ana@example.com", "secret", true).await.unwrap();
        client.add_reading(ReadingDraft::new(120, 80)).await;
        client.add_note(NoteDraft::default());

        remote.offline.store(true, Ordering::SeqCst);
        client.logout().await.unwrap();

        assert_eq!(client.session(), Session::default());
        assert!(client.list_readings().is_empty());
        assert!(client.all_notes().is_empty());
        assert_eq!(client.streak(), StreakData::default());
        assert_eq!(storage.get(USER_TOKEN).await.unwrap(), None);
        assert_eq!(storage.get(USER_DATA).await.unwrap(), None);
        assert_eq!(client.remembered_email().await.unwrap().as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn restore_trusts_stored_token_without_verifying() {
        let (first, remote, storage) = client();
        first.login("ana@example.com", "secret", false).await.unwrap();
        first.add_reading(ReadingDraft::new(125, 82)).await;

        let second = BpClient::new(remote.clone(), storage.clone());
        let session = second.restore().await.unwrap();

        assert!(session.is_authenticated);
        assert_eq!(session.token.as_deref(), Some("tok-1"));
        assert_eq!(second.list_readings().len(), 1);
        assert_eq!(remote.verify_calls.load(Ordering::SeqCst), 0);

        second.verify_session().await.unwrap();
        assert_eq!(remote.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_profile_requires_a_session() {
        let (client, _, storage) = client();
        let err = client.update_profile(Profile::default()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(AuthErrorKind::Unauthenticated));

        client.login("ana@example.com", "secret", false).await.unwrap();
        let user = client
            .update_profile(Profile {
                age: Some(54),
                ..Profile::default()
            })
            .await
            .unwrap();
        assert_eq!(user.profile.age, Some(54));
        assert_eq!(client.session().user.unwrap().profile.age, Some(54));

        let stored: User = serde_json::from_str(&storage.get(USER_DATA).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.profile.age, Some(54));
    }

    #[tokio::test]
    async fn every_mutation_notifies() {
        let (client, _, _) = client();
        let hits = count_notifications(&client);

        client.add_reading(ReadingDraft::new(120, 80)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let note = client.add_note(NoteDraft::default());
        client.toggle_note_favorite(&note.id).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        assert!(client.delete_note("missing").is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        client.clear();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert!(client.list_readings().is_empty());
        assert!(client.all_notes().is_empty());
    }

    #[tokio::test]
    async fn notes_round_through_the_client() {
        let (client, _, _) = client();
        let note = client.add_note(NoteDraft {
            title: "Ask about salt".into(),
            category: NoteCategory::Doctor,
            ..NoteDraft::default()
        });

        let updated = client
            .update_note(
                &note.id,
                NoteUpdate {
                    content: Some("and caffeine".into()),
                    ..NoteUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Ask about salt");
        assert_eq!(client.search_notes("CAFFEINE").len(), 1);
        assert_eq!(client.notes_by_category(NoteCategory::Doctor).len(), 1);
        assert!(client.favorite_notes().is_empty());
        assert!(client.notes_with_reminders().is_empty());
        assert!(matches!(
            client.update_note("missing", NoteUpdate::default()),
            Err(ClientError::NotFound(_))
        ));

        client.clear_notes();
        assert!(client.all_notes().is_empty());
    }
}
