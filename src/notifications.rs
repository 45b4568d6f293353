use crate::services::{
    content_preview, AdminError, ContentStore, NotificationKind, RecordId, ServiceResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

const PREVIEW_CHARS: usize = 100;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTrigger {
    pub id: RecordId,
    pub name: String,
    pub picture: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: RecordId,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub trigger: Option<NotificationTrigger>,
    pub question_title: Option<String>,
    pub answer_preview: Option<String>,
}

/// Notification feed for the resolved caller, newest first, with trigger and
/// content references expanded inline.
pub fn notifications_for_user<S: ContentStore>(
    store: &S,
    auth_id: &str,
) -> ServiceResult<Vec<NotificationView>> {
    let user = resolve(store, auth_id)?;

    let users = store.list_users()?;
    let questions = store.list_questions()?;
    let answers = store.list_answers()?;
    let user_index: HashMap<RecordId, &crate::services::UserRecord> =
        users.iter().map(|entry| (entry.id, entry)).collect();
    let question_index: HashMap<RecordId, &crate::services::QuestionRecord> =
        questions.iter().map(|entry| (entry.id, entry)).collect();
    let answer_index: HashMap<RecordId, &crate::services::AnswerRecord> =
        answers.iter().map(|entry| (entry.id, entry)).collect();

    Ok(store
        .notifications_for(user.id)?
        .into_iter()
        .map(|entry| NotificationView {
            id: entry.id,
            kind: entry.kind,
            read: entry.read,
            created_at: entry.created_at,
            trigger: user_index.get(&entry.trigger).map(|user| NotificationTrigger {
                id: user.id,
                name: user.name.clone(),
                picture: user.picture.clone(),
            }),
            question_title: question_index
                .get(&entry.question)
                .map(|question| question.title.clone()),
            answer_preview: entry
                .answer
                .and_then(|id| answer_index.get(&id))
                .map(|answer| content_preview(&answer.content, PREVIEW_CHARS)),
        })
        .collect())
}

pub fn mark_as_read<S: ContentStore>(
    store: &S,
    auth_id: &str,
    notification_id: RecordId,
) -> ServiceResult<()> {
    resolve(store, auth_id)?;
    store.mark_notification_read(notification_id)
}

/// Returns the number of notifications flipped to read.
pub fn mark_all_as_read<S: ContentStore>(store: &S, auth_id: &str) -> ServiceResult<usize> {
    let user = resolve(store, auth_id)?;
    store.mark_all_notifications_read(user.id)
}

fn resolve<S: ContentStore>(
    store: &S,
    auth_id: &str,
) -> ServiceResult<crate::services::UserRecord> {
    store
        .find_user_by_auth(auth_id)?
        .ok_or_else(|| AdminError::NotFound(format!("no user for identity {auth_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    #[test]
    fn feed_is_expanded_and_newest_first() {
        let store = InMemoryStore::default();
        let feed = notifications_for_user(&store, "idp_alice").unwrap();
        assert_eq!(feed.len(), 2);
        assert!(feed[0].created_at >= feed[1].created_at);
        let trigger = feed[1].trigger.as_ref().unwrap();
        assert_eq!(trigger.name, "Bruno Vega");
        assert!(feed[1].question_title.as_ref().unwrap().contains("lifetimes"));
        assert!(feed[1].answer_preview.is_some());
    }

    #[test]
    fn mark_all_flips_only_own_unread() {
        let store = InMemoryStore::default();
        let flipped = mark_all_as_read(&store, "idp_alice").unwrap();
        assert_eq!(flipped, 1);
        let feed = notifications_for_user(&store, "idp_alice").unwrap();
        assert!(feed.iter().all(|entry| entry.read));
        // A second pass has nothing left to do.
        assert_eq!(mark_all_as_read(&store, "idp_alice").unwrap(), 0);
    }

    #[test]
    fn unknown_caller_is_not_found() {
        let store = InMemoryStore::default();
        assert!(matches!(
            notifications_for_user(&store, "idp_ghost"),
            Err(AdminError::NotFound(_))
        ));
    }

    #[test]
    fn mark_one_requires_existing_notification() {
        let store = InMemoryStore::default();
        assert!(matches!(
            mark_as_read(&store, "idp_alice", 777),
            Err(AdminError::NotFound(_))
        ));
    }
}
