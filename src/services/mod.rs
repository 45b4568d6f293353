use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub mod surreal;

pub type ServiceResult<T> = Result<T, AdminError>;

/// Opaque identifier for a persisted record.
pub type RecordId = i64;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: RecordId,
    /// Identity-provider reference. Never exported.
    pub auth_id: String,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub picture: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub portfolio: Option<String>,
    pub reputation: i64,
    pub saved: Vec<RecordId>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: RecordId,
    pub title: String,
    pub content: String,
    pub author: RecordId,
    pub tags: Vec<RecordId>,
    /// Disjoint from `downvotes` per user; the voting action enforces this.
    pub upvotes: Vec<RecordId>,
    pub downvotes: Vec<RecordId>,
    pub views: i64,
    pub answers: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: RecordId,
    pub content: String,
    pub author: RecordId,
    pub question: RecordId,
    pub upvotes: Vec<RecordId>,
    pub downvotes: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: RecordId,
    pub name: String,
    pub questions: Vec<RecordId>,
    pub followers: Vec<RecordId>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    AskQuestion,
    Answer,
    View,
    Upvote,
    Downvote,
}

/// Append-only activity log entry. Read for analytics, deleted only as a
/// cascade side effect, never edited.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: RecordId,
    pub action: InteractionKind,
    pub user: RecordId,
    pub question: Option<RecordId>,
    pub answer: Option<RecordId>,
    pub tag: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAnswer,
    NewReply,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: RecordId,
    pub recipient: RecordId,
    pub trigger: RecordId,
    pub kind: NotificationKind,
    pub question: RecordId,
    pub answer: Option<RecordId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Abstract repository over the platform content store.
///
/// The analytics and moderation modules only ever talk to this trait, so the
/// concrete storage engine is swappable. Methods are synchronous single-shot
/// calls; backends that need an async client bridge internally.
pub trait ContentStore {
    // Users
    fn list_users(&self) -> ServiceResult<Vec<UserRecord>>;
    fn find_user(&self, id: RecordId) -> ServiceResult<Option<UserRecord>>;
    fn find_user_by_auth(&self, auth_id: &str) -> ServiceResult<Option<UserRecord>>;
    fn count_users(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64>;
    fn delete_user(&self, id: RecordId) -> ServiceResult<()>;

    // Questions
    fn list_questions(&self) -> ServiceResult<Vec<QuestionRecord>>;
    fn find_question(&self, id: RecordId) -> ServiceResult<Option<QuestionRecord>>;
    fn questions_by_author(&self, author: RecordId) -> ServiceResult<Vec<QuestionRecord>>;
    fn count_questions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64>;
    fn delete_questions(&self, ids: &[RecordId]) -> ServiceResult<usize>;
    fn detach_answer(&self, question_id: RecordId, answer_id: RecordId) -> ServiceResult<()>;
    fn prune_question_votes(&self, user_id: RecordId) -> ServiceResult<usize>;

    // Answers
    fn list_answers(&self) -> ServiceResult<Vec<AnswerRecord>>;
    fn find_answer(&self, id: RecordId) -> ServiceResult<Option<AnswerRecord>>;
    fn answers_by_author(&self, author: RecordId) -> ServiceResult<Vec<AnswerRecord>>;
    fn count_answers(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64>;
    fn delete_answer(&self, id: RecordId) -> ServiceResult<()>;
    fn delete_answers_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize>;
    fn delete_answers_by_author(&self, author: RecordId) -> ServiceResult<usize>;
    fn prune_answer_votes(&self, user_id: RecordId) -> ServiceResult<usize>;

    // Tags
    fn list_tags(&self) -> ServiceResult<Vec<TagRecord>>;
    fn count_tags(&self) -> ServiceResult<i64>;
    fn prune_tag_followers(&self, user_id: RecordId) -> ServiceResult<usize>;

    // Interactions
    fn interactions_since(&self, since: DateTime<Utc>) -> ServiceResult<Vec<InteractionRecord>>;
    fn interactions_by_user(
        &self,
        user_id: RecordId,
        limit: usize,
    ) -> ServiceResult<Vec<InteractionRecord>>;
    fn count_interactions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64>;
    fn count_active_users(&self, since: DateTime<Utc>) -> ServiceResult<i64>;
    fn delete_interactions_by_user(&self, user_id: RecordId) -> ServiceResult<usize>;
    fn delete_interactions_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize>;
    fn delete_interactions_by_answer(&self, answer_id: RecordId) -> ServiceResult<usize>;

    // Notifications
    fn notifications_for(&self, recipient: RecordId) -> ServiceResult<Vec<NotificationRecord>>;
    fn mark_notification_read(&self, id: RecordId) -> ServiceResult<()>;
    fn mark_all_notifications_read(&self, recipient: RecordId) -> ServiceResult<usize>;
    fn delete_notifications_naming(&self, user_id: RecordId) -> ServiceResult<usize>;

    // Integrity probes
    fn count_orphan_answers(&self) -> ServiceResult<i64>;
    fn count_users_missing_email(&self) -> ServiceResult<i64>;
}

pub fn ensure(condition: bool, error: AdminError) -> ServiceResult<()> {
    if condition {
        Ok(())
    } else {
        Err(error)
    }
}

/// Short plain preview of a rich-text body.
pub fn content_preview(text: &str, limit: usize) -> String {
    let mut preview = text.trim().chars().take(limit).collect::<String>();
    if text.trim().chars().count() > limit {
        preview.push_str("...");
    }
    preview
}

#[derive(Default)]
struct InMemoryState {
    users: HashMap<RecordId, UserRecord>,
    questions: HashMap<RecordId, QuestionRecord>,
    answers: HashMap<RecordId, AnswerRecord>,
    tags: HashMap<RecordId, TagRecord>,
    interactions: Vec<InteractionRecord>,
    notifications: HashMap<RecordId, NotificationRecord>,
    next_id: RecordId,
}

impl InMemoryState {
    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState::default())),
        }
    }

    pub fn new_with_sample() -> Self {
        let store = Self::new();
        store.seed_sample();
        store
    }

    pub fn insert_user(&self, mut user: UserRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if user.id == 0 {
            user.id = state.next_id();
        }
        let id = user.id;
        state.users.insert(id, user);
        id
    }

    pub fn insert_question(&self, mut question: QuestionRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if question.id == 0 {
            question.id = state.next_id();
        }
        let id = question.id;
        state.questions.insert(id, question);
        id
    }

    pub fn insert_answer(&self, mut answer: AnswerRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if answer.id == 0 {
            answer.id = state.next_id();
        }
        let id = answer.id;
        state.answers.insert(id, answer);
        id
    }

    pub fn insert_tag(&self, mut tag: TagRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if tag.id == 0 {
            tag.id = state.next_id();
        }
        let id = tag.id;
        state.tags.insert(id, tag);
        id
    }

    pub fn insert_interaction(&self, mut interaction: InteractionRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if interaction.id == 0 {
            interaction.id = state.next_id();
        }
        let id = interaction.id;
        state.interactions.push(interaction);
        id
    }

    pub fn insert_notification(&self, mut notification: NotificationRecord) -> RecordId {
        let mut state = self.state.lock().unwrap();
        if notification.id == 0 {
            notification.id = state.next_id();
        }
        let id = notification.id;
        state.notifications.insert(id, notification);
        id
    }

    fn seed_sample(&self) {
        let now = Utc::now();
        let alice = self.insert_user(UserRecord {
            id: 0,
            auth_id: "idp_alice".into(),
            name: "Alice Hart".into(),
            username: Some("alicehart".into()),
            email: "alice@example.com".into(),
            picture: "https://img.stackit.dev/alice.png".into(),
            bio: Some("Systems tinkerer".into()),
            location: Some("Lisbon".into()),
            portfolio: None,
            reputation: 320,
            saved: Vec::new(),
            joined_at: now - Duration::days(400),
        });
        let bruno = self.insert_user(UserRecord {
            id: 0,
            auth_id: "idp_bruno".into(),
            name: "Bruno Vega".into(),
            username: Some("bvega".into()),
            email: "bruno@example.com".into(),
            picture: "https://img.stackit.dev/bruno.png".into(),
            bio: None,
            location: None,
            portfolio: Some("https://bvega.dev".into()),
            reputation: 145,
            saved: Vec::new(),
            joined_at: now - Duration::days(200),
        });
        let carmen = self.insert_user(UserRecord {
            id: 0,
            auth_id: "idp_carmen".into(),
            name: "Carmen Ito".into(),
            username: None,
            email: "carmen@example.com".into(),
            picture: "https://img.stackit.dev/carmen.png".into(),
            bio: None,
            location: Some("Osaka".into()),
            portfolio: None,
            reputation: 45,
            saved: Vec::new(),
            joined_at: now - Duration::days(20),
        });
        let dana = self.insert_user(UserRecord {
            id: 0,
            auth_id: "idp_dana".into(),
            name: "Dana Moss".into(),
            username: Some("dmoss".into()),
            email: "admin@stackit.com".into(),
            picture: "https://img.stackit.dev/dana.png".into(),
            bio: Some("Keeps the lights on".into()),
            location: None,
            portfolio: None,
            reputation: 980,
            saved: Vec::new(),
            joined_at: now - Duration::days(500),
        });

        let q1 = self.insert_question(QuestionRecord {
            id: 0,
            title: "How do lifetimes interact with async blocks?".into(),
            content: "<p>Borrowing across an await point confuses me.</p>".into(),
            author: alice,
            tags: Vec::new(),
            upvotes: vec![bruno, carmen],
            downvotes: Vec::new(),
            views: 412,
            answers: Vec::new(),
            created_at: now - Duration::days(60),
        });
        let q2 = self.insert_question(QuestionRecord {
            id: 0,
            title: "When should a trait return an owned value?".into(),
            content: "<p>Cloning everywhere feels wrong.</p>".into(),
            author: bruno,
            tags: Vec::new(),
            upvotes: vec![alice],
            downvotes: vec![carmen],
            views: 87,
            answers: Vec::new(),
            created_at: now - Duration::days(12),
        });

        let a1 = self.insert_answer(AnswerRecord {
            id: 0,
            content: "<p>Pin the borrow inside the block and move the rest.</p>".into(),
            author: bruno,
            question: q1,
            upvotes: vec![alice, carmen],
            downvotes: Vec::new(),
            created_at: now - Duration::days(55),
        });
        let a2 = self.insert_answer(AnswerRecord {
            id: 0,
            content: "<p>Restructure so the future owns its data.</p>".into(),
            author: dana,
            question: q1,
            upvotes: Vec::new(),
            downvotes: vec![carmen],
            created_at: now - Duration::days(50),
        });

        let rust_tag = self.insert_tag(TagRecord {
            id: 0,
            name: "rust".into(),
            questions: vec![q1, q2],
            followers: vec![bruno, carmen],
        });
        let async_tag = self.insert_tag(TagRecord {
            id: 0,
            name: "async".into(),
            questions: vec![q1],
            followers: Vec::new(),
        });

        {
            let mut state = self.state.lock().unwrap();
            if let Some(question) = state.questions.get_mut(&q1) {
                question.answers = vec![a1, a2];
                question.tags = vec![rust_tag, async_tag];
            }
            if let Some(question) = state.questions.get_mut(&q2) {
                question.tags = vec![rust_tag];
            }
        }

        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::AskQuestion,
            user: alice,
            question: Some(q1),
            answer: None,
            tag: Some(rust_tag),
            created_at: now - Duration::days(60),
        });
        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::Answer,
            user: bruno,
            question: Some(q1),
            answer: Some(a1),
            tag: None,
            created_at: now - Duration::days(55),
        });
        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::Upvote,
            user: bruno,
            question: Some(q1),
            answer: None,
            tag: None,
            created_at: now - Duration::days(54),
        });
        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::AskQuestion,
            user: bruno,
            question: Some(q2),
            answer: None,
            tag: Some(rust_tag),
            created_at: now - Duration::days(12),
        });
        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::View,
            user: carmen,
            question: Some(q1),
            answer: None,
            tag: None,
            created_at: now - Duration::hours(2),
        });
        self.insert_interaction(InteractionRecord {
            id: 0,
            action: InteractionKind::Upvote,
            user: carmen,
            question: Some(q1),
            answer: Some(a1),
            tag: None,
            created_at: now - Duration::hours(3),
        });

        self.insert_notification(NotificationRecord {
            id: 0,
            recipient: alice,
            trigger: bruno,
            kind: NotificationKind::NewAnswer,
            question: q1,
            answer: Some(a1),
            read: false,
            created_at: now - Duration::days(55),
        });
        self.insert_notification(NotificationRecord {
            id: 0,
            recipient: alice,
            trigger: dana,
            kind: NotificationKind::NewAnswer,
            question: q1,
            answer: Some(a2),
            read: true,
            created_at: now - Duration::days(50),
        });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new_with_sample()
    }
}

impl ContentStore for InMemoryStore {
    fn list_users(&self) -> ServiceResult<Vec<UserRecord>> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<UserRecord> = state.users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    fn find_user(&self, id: RecordId) -> ServiceResult<Option<UserRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.get(&id).cloned())
    }

    fn find_user_by_auth(&self, auth_id: &str) -> ServiceResult<Option<UserRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .values()
            .find(|user| user.auth_id == auth_id)
            .cloned())
    }

    fn count_users(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .values()
            .filter(|user| since.map(|ts| user.joined_at >= ts).unwrap_or(true))
            .count() as i64)
    }

    fn delete_user(&self, id: RecordId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.users.remove(&id);
        Ok(())
    }

    fn list_questions(&self) -> ServiceResult<Vec<QuestionRecord>> {
        let state = self.state.lock().unwrap();
        let mut questions: Vec<QuestionRecord> = state.questions.values().cloned().collect();
        questions.sort_by_key(|question| question.id);
        Ok(questions)
    }

    fn find_question(&self, id: RecordId) -> ServiceResult<Option<QuestionRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.questions.get(&id).cloned())
    }

    fn questions_by_author(&self, author: RecordId) -> ServiceResult<Vec<QuestionRecord>> {
        let state = self.state.lock().unwrap();
        let mut questions: Vec<QuestionRecord> = state
            .questions
            .values()
            .filter(|question| question.author == author)
            .cloned()
            .collect();
        questions.sort_by_key(|question| question.id);
        Ok(questions)
    }

    fn count_questions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .questions
            .values()
            .filter(|question| since.map(|ts| question.created_at >= ts).unwrap_or(true))
            .count() as i64)
    }

    fn delete_questions(&self, ids: &[RecordId]) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.questions.len();
        for id in ids {
            state.questions.remove(id);
        }
        Ok(before - state.questions.len())
    }

    fn detach_answer(&self, question_id: RecordId, answer_id: RecordId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(question) = state.questions.get_mut(&question_id) {
            question.answers.retain(|id| *id != answer_id);
        }
        Ok(())
    }

    fn prune_question_votes(&self, user_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut touched = 0;
        for question in state.questions.values_mut() {
            let had = question.upvotes.contains(&user_id) || question.downvotes.contains(&user_id);
            if had {
                question.upvotes.retain(|id| *id != user_id);
                question.downvotes.retain(|id| *id != user_id);
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn list_answers(&self) -> ServiceResult<Vec<AnswerRecord>> {
        let state = self.state.lock().unwrap();
        let mut answers: Vec<AnswerRecord> = state.answers.values().cloned().collect();
        answers.sort_by_key(|answer| answer.id);
        Ok(answers)
    }

    fn find_answer(&self, id: RecordId) -> ServiceResult<Option<AnswerRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.answers.get(&id).cloned())
    }

    fn answers_by_author(&self, author: RecordId) -> ServiceResult<Vec<AnswerRecord>> {
        let state = self.state.lock().unwrap();
        let mut answers: Vec<AnswerRecord> = state
            .answers
            .values()
            .filter(|answer| answer.author == author)
            .cloned()
            .collect();
        answers.sort_by_key(|answer| answer.id);
        Ok(answers)
    }

    fn count_answers(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .answers
            .values()
            .filter(|answer| since.map(|ts| answer.created_at >= ts).unwrap_or(true))
            .count() as i64)
    }

    fn delete_answer(&self, id: RecordId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.answers.remove(&id);
        Ok(())
    }

    fn delete_answers_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.answers.len();
        state
            .answers
            .retain(|_, answer| !question_ids.contains(&answer.question));
        Ok(before - state.answers.len())
    }

    fn delete_answers_by_author(&self, author: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let removed: Vec<RecordId> = state
            .answers
            .values()
            .filter(|answer| answer.author == author)
            .map(|answer| answer.id)
            .collect();
        for id in &removed {
            state.answers.remove(id);
        }
        // The parent question's answer list also names these answers.
        for question in state.questions.values_mut() {
            question.answers.retain(|id| !removed.contains(id));
        }
        Ok(removed.len())
    }

    fn prune_answer_votes(&self, user_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut touched = 0;
        for answer in state.answers.values_mut() {
            let had = answer.upvotes.contains(&user_id) || answer.downvotes.contains(&user_id);
            if had {
                answer.upvotes.retain(|id| *id != user_id);
                answer.downvotes.retain(|id| *id != user_id);
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn list_tags(&self) -> ServiceResult<Vec<TagRecord>> {
        let state = self.state.lock().unwrap();
        let mut tags: Vec<TagRecord> = state.tags.values().cloned().collect();
        tags.sort_by_key(|tag| tag.id);
        Ok(tags)
    }

    fn count_tags(&self) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state.tags.len() as i64)
    }

    fn prune_tag_followers(&self, user_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut touched = 0;
        for tag in state.tags.values_mut() {
            if tag.followers.contains(&user_id) {
                tag.followers.retain(|id| *id != user_id);
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn interactions_since(&self, since: DateTime<Utc>) -> ServiceResult<Vec<InteractionRecord>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<InteractionRecord> = state
            .interactions
            .iter()
            .filter(|entry| entry.created_at >= since)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    fn interactions_by_user(
        &self,
        user_id: RecordId,
        limit: usize,
    ) -> ServiceResult<Vec<InteractionRecord>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<InteractionRecord> = state
            .interactions
            .iter()
            .filter(|entry| entry.user == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }

    fn count_interactions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .interactions
            .iter()
            .filter(|entry| since.map(|ts| entry.created_at >= ts).unwrap_or(true))
            .count() as i64)
    }

    fn count_active_users(&self, since: DateTime<Utc>) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        let users: HashSet<RecordId> = state
            .interactions
            .iter()
            .filter(|entry| entry.created_at >= since)
            .map(|entry| entry.user)
            .collect();
        Ok(users.len() as i64)
    }

    fn delete_interactions_by_user(&self, user_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.interactions.len();
        state.interactions.retain(|entry| entry.user != user_id);
        Ok(before - state.interactions.len())
    }

    fn delete_interactions_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.interactions.len();
        state.interactions.retain(|entry| {
            entry
                .question
                .map(|id| !question_ids.contains(&id))
                .unwrap_or(true)
        });
        Ok(before - state.interactions.len())
    }

    fn delete_interactions_by_answer(&self, answer_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.interactions.len();
        state
            .interactions
            .retain(|entry| entry.answer != Some(answer_id));
        Ok(before - state.interactions.len())
    }

    fn notifications_for(&self, recipient: RecordId) -> ServiceResult<Vec<NotificationRecord>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<NotificationRecord> = state
            .notifications
            .values()
            .filter(|entry| entry.recipient == recipient)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    fn mark_notification_read(&self, id: RecordId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.notifications.get_mut(&id) {
            Some(entry) => {
                entry.read = true;
                Ok(())
            }
            None => Err(AdminError::NotFound(format!("notification {id}"))),
        }
    }

    fn mark_all_notifications_read(&self, recipient: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut marked = 0;
        for entry in state.notifications.values_mut() {
            if entry.recipient == recipient && !entry.read {
                entry.read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    fn delete_notifications_naming(&self, user_id: RecordId) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|_, entry| entry.recipient != user_id && entry.trigger != user_id);
        Ok(before - state.notifications.len())
    }

    fn count_orphan_answers(&self) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .answers
            .values()
            .filter(|answer| !state.questions.contains_key(&answer.question))
            .count() as i64)
    }

    fn count_users_missing_email(&self) -> ServiceResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .values()
            .filter(|user| user.email.trim().is_empty())
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_line_up() {
        let store = InMemoryStore::default();
        assert_eq!(store.count_users(None).unwrap(), 4);
        assert_eq!(store.count_questions(None).unwrap(), 2);
        assert_eq!(store.count_answers(None).unwrap(), 2);
        assert_eq!(store.count_tags().unwrap(), 2);
        assert_eq!(store.count_interactions(None).unwrap(), 6);
    }

    #[test]
    fn rolling_window_counts() {
        let store = InMemoryStore::default();
        let cutoff = Utc::now() - Duration::days(30);
        assert_eq!(store.count_users(Some(cutoff)).unwrap(), 1);
        assert_eq!(store.count_questions(Some(cutoff)).unwrap(), 1);
        assert_eq!(store.count_answers(Some(cutoff)).unwrap(), 0);
    }

    #[test]
    fn auth_lookup_resolves() {
        let store = InMemoryStore::default();
        let user = store.find_user_by_auth("idp_dana").unwrap().unwrap();
        assert_eq!(user.email, "admin@stackit.com");
        assert!(store.find_user_by_auth("idp_nobody").unwrap().is_none());
    }

    #[test]
    fn vote_prune_touches_both_sets() {
        let store = InMemoryStore::default();
        let carmen = store.find_user_by_auth("idp_carmen").unwrap().unwrap();
        let touched = store.prune_question_votes(carmen.id).unwrap();
        assert_eq!(touched, 2);
        for question in store.list_questions().unwrap() {
            assert!(!question.upvotes.contains(&carmen.id));
            assert!(!question.downvotes.contains(&carmen.id));
        }
    }

    #[test]
    fn orphan_answer_detected_after_question_removal() {
        let store = InMemoryStore::default();
        assert_eq!(store.count_orphan_answers().unwrap(), 0);
        let question = store.list_answers().unwrap()[0].question;
        store.delete_questions(&[question]).unwrap();
        assert_eq!(store.count_orphan_answers().unwrap(), 2);
    }
}
