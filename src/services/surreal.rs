use crate::services::{
    AdminError, AnswerRecord, ContentStore, InteractionRecord, NotificationRecord, QuestionRecord,
    RecordId, ServiceResult, TagRecord, UserRecord,
};
use crate::surreal::{connect_from_env, SurrealClient};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;

const USER_FIELDS: &str = "record_id AS id, auth_id, name, username, email, picture, bio, \
                           location, portfolio, reputation, saved, joined_at";
const QUESTION_FIELDS: &str = "record_id AS id, title, content, author, tags, upvotes, \
                               downvotes, views, answers, created_at";
const ANSWER_FIELDS: &str =
    "record_id AS id, content, author, question, upvotes, downvotes, created_at";
const TAG_FIELDS: &str = "record_id AS id, name, questions, followers";
const INTERACTION_FIELDS: &str =
    "record_id AS id, action, user, question, answer, tag, created_at";
const NOTIFICATION_FIELDS: &str =
    "record_id AS id, recipient, trigger, kind, question, answer, read, created_at";

#[derive(Debug, Deserialize)]
struct CountRow {
    total: i64,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    user: RecordId,
}

#[derive(Debug, Deserialize)]
struct QuestionRef {
    question: RecordId,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: RecordId,
}

/// Surreal-backed content store.
///
/// The store trait is synchronous, so every call bridges onto a dedicated
/// runtime. Timestamps live in the database as RFC 3339 strings; their
/// lexicographic order matches chronological order for UTC.
#[derive(Clone)]
pub struct SurrealStore {
    client: SurrealClient,
    runtime: Arc<Runtime>,
}

impl SurrealStore {
    pub fn new(client: SurrealClient) -> ServiceResult<Self> {
        let runtime = Runtime::new()
            .map_err(|err| AdminError::Internal(format!("runtime init failed: {err}")))?;
        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }

    /// Connect with `SURREAL_*` environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        let runtime = Runtime::new()
            .map_err(|err| AdminError::Internal(format!("runtime init failed: {err}")))?;
        let client = runtime
            .block_on(connect_from_env())
            .map_err(|err| AdminError::Internal(err.to_string()))?;
        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }

    fn run<T, F>(&self, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = Result<T, surrealdb::Error>>,
    {
        self.runtime
            .block_on(fut)
            .map_err(|err| AdminError::Internal(err.to_string()))
    }

    fn count(&self, query: String, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let row: Option<CountRow> = self.run(async {
            let mut request = self.client.query(query);
            if let Some(ts) = since {
                request = request.bind(("since", ts.to_rfc3339()));
            }
            let mut response = request.await?;
            response.take(0)
        })?;
        Ok(row.map(|row| row.total).unwrap_or(0))
    }
}

impl ContentStore for SurrealStore {
    fn list_users(&self) -> ServiceResult<Vec<UserRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {USER_FIELDS} FROM users ORDER BY record_id ASC"
                ))
                .await?;
            response.take(0)
        })
    }

    fn find_user(&self, id: RecordId) -> ServiceResult<Option<UserRecord>> {
        let rows: Vec<UserRecord> = self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {USER_FIELDS} FROM users WHERE record_id = $id"
                ))
                .bind(("id", id))
                .await?;
            response.take(0)
        })?;
        Ok(rows.into_iter().next())
    }

    fn find_user_by_auth(&self, auth_id: &str) -> ServiceResult<Option<UserRecord>> {
        let auth_id = auth_id.to_owned();
        let rows: Vec<UserRecord> = self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {USER_FIELDS} FROM users WHERE auth_id = $auth_id"
                ))
                .bind(("auth_id", auth_id))
                .await?;
            response.take(0)
        })?;
        Ok(rows.into_iter().next())
    }

    fn count_users(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let query = match since {
            Some(_) => {
                "SELECT count() AS total FROM users WHERE joined_at >= $since GROUP ALL".into()
            }
            None => "SELECT count() AS total FROM users GROUP ALL".into(),
        };
        self.count(query, since)
    }

    fn delete_user(&self, id: RecordId) -> ServiceResult<()> {
        self.run(async {
            self.client
                .query("DELETE users WHERE record_id = $id")
                .bind(("id", id))
                .await?;
            Ok(())
        })
    }

    fn list_questions(&self) -> ServiceResult<Vec<QuestionRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {QUESTION_FIELDS} FROM questions ORDER BY record_id ASC"
                ))
                .await?;
            response.take(0)
        })
    }

    fn find_question(&self, id: RecordId) -> ServiceResult<Option<QuestionRecord>> {
        let rows: Vec<QuestionRecord> = self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {QUESTION_FIELDS} FROM questions WHERE record_id = $id"
                ))
                .bind(("id", id))
                .await?;
            response.take(0)
        })?;
        Ok(rows.into_iter().next())
    }

    fn questions_by_author(&self, author: RecordId) -> ServiceResult<Vec<QuestionRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {QUESTION_FIELDS} FROM questions WHERE author = $author \
                     ORDER BY record_id ASC"
                ))
                .bind(("author", author))
                .await?;
            response.take(0)
        })
    }

    fn count_questions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let query = match since {
            Some(_) => {
                "SELECT count() AS total FROM questions WHERE created_at >= $since GROUP ALL".into()
            }
            None => "SELECT count() AS total FROM questions GROUP ALL".into(),
        };
        self.count(query, since)
    }

    fn delete_questions(&self, ids: &[RecordId]) -> ServiceResult<usize> {
        let ids = ids.to_vec();
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("DELETE questions WHERE record_id IN $ids RETURN BEFORE")
                .bind(("ids", ids))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn detach_answer(&self, question_id: RecordId, answer_id: RecordId) -> ServiceResult<()> {
        self.run(async {
            self.client
                .query(
                    "UPDATE questions SET answers -= $answer \
                     WHERE record_id = $question RETURN NONE",
                )
                .bind(("question", question_id))
                .bind(("answer", answer_id))
                .await?;
            Ok(())
        })
    }

    fn prune_question_votes(&self, user_id: RecordId) -> ServiceResult<usize> {
        let touched: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query(
                    "UPDATE questions SET upvotes -= $user, downvotes -= $user \
                     WHERE upvotes CONTAINS $user OR downvotes CONTAINS $user RETURN AFTER",
                )
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })?;
        Ok(touched.len())
    }

    fn list_answers(&self) -> ServiceResult<Vec<AnswerRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {ANSWER_FIELDS} FROM answers ORDER BY record_id ASC"
                ))
                .await?;
            response.take(0)
        })
    }

    fn find_answer(&self, id: RecordId) -> ServiceResult<Option<AnswerRecord>> {
        let rows: Vec<AnswerRecord> = self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {ANSWER_FIELDS} FROM answers WHERE record_id = $id"
                ))
                .bind(("id", id))
                .await?;
            response.take(0)
        })?;
        Ok(rows.into_iter().next())
    }

    fn answers_by_author(&self, author: RecordId) -> ServiceResult<Vec<AnswerRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {ANSWER_FIELDS} FROM answers WHERE author = $author \
                     ORDER BY record_id ASC"
                ))
                .bind(("author", author))
                .await?;
            response.take(0)
        })
    }

    fn count_answers(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let query = match since {
            Some(_) => {
                "SELECT count() AS total FROM answers WHERE created_at >= $since GROUP ALL".into()
            }
            None => "SELECT count() AS total FROM answers GROUP ALL".into(),
        };
        self.count(query, since)
    }

    fn delete_answer(&self, id: RecordId) -> ServiceResult<()> {
        self.run(async {
            self.client
                .query("DELETE answers WHERE record_id = $id")
                .bind(("id", id))
                .await?;
            Ok(())
        })
    }

    fn delete_answers_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize> {
        let ids = question_ids.to_vec();
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("DELETE answers WHERE question IN $ids RETURN BEFORE")
                .bind(("ids", ids))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn delete_answers_by_author(&self, author: RecordId) -> ServiceResult<usize> {
        let removed: Vec<AnswerRecord> = self.run(async {
            let mut response = self
                .client
                .query("DELETE answers WHERE author = $author RETURN BEFORE")
                .bind(("author", author))
                .await?;
            response.take(0)
        })?;
        if removed.is_empty() {
            return Ok(0);
        }
        let removed_ids: Vec<RecordId> = removed.iter().map(|answer| answer.id).collect();
        self.run(async {
            self.client
                .query(
                    "UPDATE questions SET answers = array::difference(answers, $removed) \
                     WHERE answers CONTAINSANY $removed RETURN NONE",
                )
                .bind(("removed", removed_ids))
                .await?;
            Ok(())
        })?;
        Ok(removed.len())
    }

    fn prune_answer_votes(&self, user_id: RecordId) -> ServiceResult<usize> {
        let touched: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query(
                    "UPDATE answers SET upvotes -= $user, downvotes -= $user \
                     WHERE upvotes CONTAINS $user OR downvotes CONTAINS $user RETURN AFTER",
                )
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })?;
        Ok(touched.len())
    }

    fn list_tags(&self) -> ServiceResult<Vec<TagRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {TAG_FIELDS} FROM tags ORDER BY record_id ASC"
                ))
                .await?;
            response.take(0)
        })
    }

    fn count_tags(&self) -> ServiceResult<i64> {
        self.count(
            "SELECT count() AS total FROM tags GROUP ALL".into(),
            None,
        )
    }

    fn prune_tag_followers(&self, user_id: RecordId) -> ServiceResult<usize> {
        let touched: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query(
                    "UPDATE tags SET followers -= $user \
                     WHERE followers CONTAINS $user RETURN AFTER",
                )
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })?;
        Ok(touched.len())
    }

    fn interactions_since(&self, since: DateTime<Utc>) -> ServiceResult<Vec<InteractionRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {INTERACTION_FIELDS} FROM interactions \
                     WHERE created_at >= $since ORDER BY created_at DESC"
                ))
                .bind(("since", since.to_rfc3339()))
                .await?;
            response.take(0)
        })
    }

    fn interactions_by_user(
        &self,
        user_id: RecordId,
        limit: usize,
    ) -> ServiceResult<Vec<InteractionRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {INTERACTION_FIELDS} FROM interactions WHERE user = $user \
                     ORDER BY created_at DESC LIMIT {limit}"
                ))
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })
    }

    fn count_interactions(&self, since: Option<DateTime<Utc>>) -> ServiceResult<i64> {
        let query = match since {
            Some(_) => {
                "SELECT count() AS total FROM interactions WHERE created_at >= $since GROUP ALL"
                    .into()
            }
            None => "SELECT count() AS total FROM interactions GROUP ALL".into(),
        };
        self.count(query, since)
    }

    fn count_active_users(&self, since: DateTime<Utc>) -> ServiceResult<i64> {
        let rows: Vec<UserRow> = self.run(async {
            let mut response = self
                .client
                .query("SELECT user FROM interactions WHERE created_at >= $since")
                .bind(("since", since.to_rfc3339()))
                .await?;
            response.take(0)
        })?;
        let mut users: Vec<RecordId> = rows.into_iter().map(|row| row.user).collect();
        users.sort_unstable();
        users.dedup();
        Ok(users.len() as i64)
    }

    fn delete_interactions_by_user(&self, user_id: RecordId) -> ServiceResult<usize> {
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("DELETE interactions WHERE user = $user RETURN BEFORE")
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn delete_interactions_by_question(&self, question_ids: &[RecordId]) -> ServiceResult<usize> {
        let ids = question_ids.to_vec();
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("DELETE interactions WHERE question IN $ids RETURN BEFORE")
                .bind(("ids", ids))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn delete_interactions_by_answer(&self, answer_id: RecordId) -> ServiceResult<usize> {
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("DELETE interactions WHERE answer = $answer RETURN BEFORE")
                .bind(("answer", answer_id))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn notifications_for(&self, recipient: RecordId) -> ServiceResult<Vec<NotificationRecord>> {
        self.run(async {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {NOTIFICATION_FIELDS} FROM notifications \
                     WHERE recipient = $recipient ORDER BY created_at DESC"
                ))
                .bind(("recipient", recipient))
                .await?;
            response.take(0)
        })
    }

    fn mark_notification_read(&self, id: RecordId) -> ServiceResult<()> {
        let updated: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query("UPDATE notifications SET read = true WHERE record_id = $id RETURN AFTER")
                .bind(("id", id))
                .await?;
            response.take(0)
        })?;
        if updated.is_empty() {
            return Err(AdminError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    fn mark_all_notifications_read(&self, recipient: RecordId) -> ServiceResult<usize> {
        let updated: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query(
                    "UPDATE notifications SET read = true \
                     WHERE recipient = $recipient AND read = false RETURN AFTER",
                )
                .bind(("recipient", recipient))
                .await?;
            response.take(0)
        })?;
        Ok(updated.len())
    }

    fn delete_notifications_naming(&self, user_id: RecordId) -> ServiceResult<usize> {
        let removed: Vec<Value> = self.run(async {
            let mut response = self
                .client
                .query(
                    "DELETE notifications WHERE recipient = $user OR trigger = $user \
                     RETURN BEFORE",
                )
                .bind(("user", user_id))
                .await?;
            response.take(0)
        })?;
        Ok(removed.len())
    }

    fn count_orphan_answers(&self) -> ServiceResult<i64> {
        let answer_refs: Vec<QuestionRef> = self.run(async {
            let mut response = self.client.query("SELECT question FROM answers").await?;
            response.take(0)
        })?;
        let question_ids: Vec<IdRow> = self.run(async {
            let mut response = self
                .client
                .query("SELECT record_id AS id FROM questions")
                .await?;
            response.take(0)
        })?;
        let known: std::collections::HashSet<RecordId> =
            question_ids.into_iter().map(|row| row.id).collect();
        Ok(answer_refs
            .into_iter()
            .filter(|row| !known.contains(&row.question))
            .count() as i64)
    }

    fn count_users_missing_email(&self) -> ServiceResult<i64> {
        self.count(
            "SELECT count() AS total FROM users WHERE email = NONE OR email = '' GROUP ALL".into(),
            None,
        )
    }
}
