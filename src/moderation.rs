use crate::access::AdminGuard;
use crate::services::{AdminError, ContentStore, RecordId, ServiceResult};
use serde::Serialize;
use tracing::info;

/// Outcome of a single-answer removal. The cascade is best-effort: there is
/// no transaction, so a failure partway leaves earlier steps applied. The
/// report states what each step removed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDeleteReport {
    pub answer_id: RecordId,
    pub detached_from_question: RecordId,
    pub interactions_deleted: usize,
}

/// Outcome of a user cascade. Same best-effort caveat as
/// [`AnswerDeleteReport`]: steps run sequentially and are not rolled back.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCascadeReport {
    pub user_id: RecordId,
    pub questions_deleted: usize,
    pub answers_deleted: usize,
    pub interactions_deleted: usize,
    pub question_votes_pruned: usize,
    pub answer_votes_pruned: usize,
    pub tag_follows_pruned: usize,
    pub notifications_deleted: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteItem {
    pub user_id: RecordId,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteOutcome {
    pub results: Vec<BulkDeleteItem>,
    pub summary: BulkDeleteSummary,
}

/// Delete one answer: detach it from its parent question, drop interactions
/// referencing it, then drop the record.
pub fn delete_answer<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    answer_id: RecordId,
) -> ServiceResult<AnswerDeleteReport> {
    let admin = guard.ensure_admin(store, auth_id)?;

    let answer = store
        .find_answer(answer_id)?
        .ok_or_else(|| AdminError::NotFound(format!("answer {answer_id}")))?;

    store.detach_answer(answer.question, answer_id)?;
    let interactions_deleted = store.delete_interactions_by_answer(answer_id)?;
    store.delete_answer(answer_id)?;

    info!(
        admin = %admin.email,
        answer_id,
        question_id = answer.question,
        interactions_deleted,
        "answer removed by moderator"
    );

    Ok(AnswerDeleteReport {
        answer_id,
        detached_from_question: answer.question,
        interactions_deleted,
    })
}

/// Cascade-delete a user together with everything that exists only in
/// reference to them: authored questions (and their answers and
/// interactions), authored answers, their own interactions, their entries in
/// vote sets and tag follower lists, and notifications naming them.
///
/// Steps run in dependency order so a reader never observes an answer whose
/// question is already gone; with no transaction available this stays
/// best-effort, and a mid-cascade failure leaves the completed steps applied.
pub fn delete_user<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    user_id: RecordId,
) -> ServiceResult<UserCascadeReport> {
    let admin = guard.ensure_admin(store, auth_id)?;

    let user = store
        .find_user(user_id)?
        .ok_or_else(|| AdminError::NotFound(format!("user {user_id}")))?;

    let question_ids: Vec<RecordId> = store
        .questions_by_author(user.id)?
        .into_iter()
        .map(|question| question.id)
        .collect();

    let mut answers_deleted = store.delete_answers_by_question(&question_ids)?;
    let mut interactions_deleted = store.delete_interactions_by_question(&question_ids)?;
    let questions_deleted = store.delete_questions(&question_ids)?;
    answers_deleted += store.delete_answers_by_author(user.id)?;
    interactions_deleted += store.delete_interactions_by_user(user.id)?;
    let question_votes_pruned = store.prune_question_votes(user.id)?;
    let answer_votes_pruned = store.prune_answer_votes(user.id)?;
    let tag_follows_pruned = store.prune_tag_followers(user.id)?;
    let notifications_deleted = store.delete_notifications_naming(user.id)?;
    store.delete_user(user.id)?;

    info!(
        admin = %admin.email,
        user_id,
        questions_deleted,
        answers_deleted,
        interactions_deleted,
        "user removed by moderator"
    );

    Ok(UserCascadeReport {
        user_id,
        questions_deleted,
        answers_deleted,
        interactions_deleted,
        question_votes_pruned,
        answer_votes_pruned,
        tag_follows_pruned,
        notifications_deleted,
    })
}

/// Apply the user cascade to each identifier independently. A failure on one
/// target never aborts the batch; the outcome carries per-item results and a
/// summary.
pub fn bulk_delete_users<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    user_ids: &[RecordId],
) -> ServiceResult<BulkDeleteOutcome> {
    guard.ensure_admin(store, auth_id)?;
    if user_ids.is_empty() {
        return Err(AdminError::Validation("no user ids given".into()));
    }

    let mut results = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        match delete_user(store, guard, auth_id, *user_id) {
            Ok(_) => results.push(BulkDeleteItem {
                user_id: *user_id,
                success: true,
                error: None,
            }),
            Err(err) => results.push(BulkDeleteItem {
                user_id: *user_id,
                success: false,
                error: Some(err.to_string()),
            }),
        }
    }

    let successful = results.iter().filter(|item| item.success).count();
    Ok(BulkDeleteOutcome {
        summary: BulkDeleteSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        },
        results,
    })
}
