use crate::access::AdminGuard;
use crate::analytics::{QuestionSummary, TagSummary};
use crate::services::{
    content_preview, AdminError, ContentStore, InteractionKind, RecordId, ServiceResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

const INTERACTION_LIMIT: usize = 50;
const PREVIEW_CHARS: usize = 100;

/// Constant weight used by the reputation breakdown. The breakdown is
/// illustrative; it is not reconciled against the persisted reputation field.
const REPUTATION_POINTS: i64 = 10;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: RecordId,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub picture: String,
    pub reputation: i64,
    pub location: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredQuestion {
    pub id: RecordId,
    pub title: String,
    pub views: i64,
    pub upvotes: usize,
    pub downvotes: usize,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<TagSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredAnswer {
    pub id: RecordId,
    pub content: String,
    pub upvotes: usize,
    pub downvotes: usize,
    pub created_at: DateTime<Utc>,
    pub question: Option<QuestionSummary>,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingActivity {
    pub questions_upvoted: usize,
    pub questions_downvoted: usize,
    pub answers_upvoted: usize,
    pub answers_downvoted: usize,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSources {
    pub questions_created: i64,
    pub answers_created: i64,
    pub question_upvotes_received: i64,
    pub answer_upvotes_received: i64,
    pub question_downvotes_received: i64,
    pub answer_downvotes_received: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteraction {
    pub id: RecordId,
    pub action: InteractionKind,
    pub created_at: DateTime<Utc>,
    pub question: Option<QuestionSummary>,
    pub answer_preview: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_questions: usize,
    pub total_answers: usize,
    pub total_views: i64,
    pub avg_upvotes_per_question: f64,
    pub avg_upvotes_per_answer: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    pub user: UserProfile,
    pub questions: Vec<AuthoredQuestion>,
    pub answers: Vec<AuthoredAnswer>,
    pub voting_activity: VotingActivity,
    pub interactions: Vec<UserInteraction>,
    pub reputation_sources: ReputationSources,
    pub stats: UserStats,
}

/// Detailed analytics for one user: authored content, votes cast and
/// received, a reputation breakdown at fixed weights, and recent activity.
pub fn user_analytics<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    user_id: RecordId,
) -> ServiceResult<UserAnalytics> {
    guard.ensure_admin(store, auth_id)?;

    let user = store
        .find_user(user_id)?
        .ok_or_else(|| AdminError::NotFound(format!("user {user_id}")))?;

    let authored_questions = store.questions_by_author(user.id)?;
    let authored_answers = store.answers_by_author(user.id)?;
    let all_questions = store.list_questions()?;
    let all_answers = store.list_answers()?;
    let tags = store.list_tags()?;

    let tag_index: HashMap<RecordId, &crate::services::TagRecord> =
        tags.iter().map(|tag| (tag.id, tag)).collect();
    let question_index: HashMap<RecordId, &crate::services::QuestionRecord> = all_questions
        .iter()
        .map(|question| (question.id, question))
        .collect();
    let answer_index: HashMap<RecordId, &crate::services::AnswerRecord> =
        all_answers.iter().map(|answer| (answer.id, answer)).collect();

    let mut questions: Vec<AuthoredQuestion> = authored_questions
        .iter()
        .map(|question| AuthoredQuestion {
            id: question.id,
            title: question.title.clone(),
            views: question.views,
            upvotes: question.upvotes.len(),
            downvotes: question.downvotes.len(),
            created_at: question.created_at,
            tags: question
                .tags
                .iter()
                .filter_map(|id| tag_index.get(id))
                .map(|tag| TagSummary {
                    id: tag.id,
                    name: tag.name.clone(),
                })
                .collect(),
        })
        .collect();
    questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut answers: Vec<AuthoredAnswer> = authored_answers
        .iter()
        .map(|answer| AuthoredAnswer {
            id: answer.id,
            content: answer.content.clone(),
            upvotes: answer.upvotes.len(),
            downvotes: answer.downvotes.len(),
            created_at: answer.created_at,
            question: question_index
                .get(&answer.question)
                .map(|question| QuestionSummary {
                    id: question.id,
                    title: question.title.clone(),
                }),
        })
        .collect();
    answers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let voting_activity = VotingActivity {
        questions_upvoted: all_questions
            .iter()
            .filter(|question| question.upvotes.contains(&user.id))
            .count(),
        questions_downvoted: all_questions
            .iter()
            .filter(|question| question.downvotes.contains(&user.id))
            .count(),
        answers_upvoted: all_answers
            .iter()
            .filter(|answer| answer.upvotes.contains(&user.id))
            .count(),
        answers_downvoted: all_answers
            .iter()
            .filter(|answer| answer.downvotes.contains(&user.id))
            .count(),
    };

    let interactions = store
        .interactions_by_user(user.id, INTERACTION_LIMIT)?
        .into_iter()
        .map(|entry| UserInteraction {
            id: entry.id,
            action: entry.action,
            created_at: entry.created_at,
            question: entry
                .question
                .and_then(|id| question_index.get(&id))
                .map(|question| QuestionSummary {
                    id: question.id,
                    title: question.title.clone(),
                }),
            answer_preview: entry
                .answer
                .and_then(|id| answer_index.get(&id))
                .map(|answer| content_preview(&answer.content, PREVIEW_CHARS)),
        })
        .collect();

    let question_upvotes: i64 = authored_questions
        .iter()
        .map(|question| question.upvotes.len() as i64)
        .sum();
    let question_downvotes: i64 = authored_questions
        .iter()
        .map(|question| question.downvotes.len() as i64)
        .sum();
    let answer_upvotes: i64 = authored_answers
        .iter()
        .map(|answer| answer.upvotes.len() as i64)
        .sum();
    let answer_downvotes: i64 = authored_answers
        .iter()
        .map(|answer| answer.downvotes.len() as i64)
        .sum();

    let reputation_sources = ReputationSources {
        questions_created: authored_questions.len() as i64 * REPUTATION_POINTS,
        answers_created: authored_answers.len() as i64 * REPUTATION_POINTS,
        question_upvotes_received: question_upvotes * REPUTATION_POINTS,
        answer_upvotes_received: answer_upvotes * REPUTATION_POINTS,
        question_downvotes_received: -question_downvotes * REPUTATION_POINTS,
        answer_downvotes_received: -answer_downvotes * REPUTATION_POINTS,
    };

    let total_views: i64 = authored_questions.iter().map(|question| question.views).sum();
    let stats = UserStats {
        total_questions: authored_questions.len(),
        total_answers: authored_answers.len(),
        total_views,
        avg_upvotes_per_question: if authored_questions.is_empty() {
            0.0
        } else {
            question_upvotes as f64 / authored_questions.len() as f64
        },
        avg_upvotes_per_answer: if authored_answers.is_empty() {
            0.0
        } else {
            answer_upvotes as f64 / authored_answers.len() as f64
        },
    };

    Ok(UserAnalytics {
        user: UserProfile {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            picture: user.picture,
            reputation: user.reputation,
            location: user.location,
            joined_at: user.joined_at,
        },
        questions,
        answers,
        voting_activity,
        interactions,
        reputation_sources,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    fn guard() -> AdminGuard {
        AdminGuard::new(["admin@stackit.com"])
    }

    #[test]
    fn unknown_user_is_not_found() {
        let store = InMemoryStore::default();
        let result = user_analytics(&store, &guard(), "idp_dana", 9999);
        assert!(matches!(result, Err(AdminError::NotFound(_))));
    }

    #[test]
    fn reputation_breakdown_uses_fixed_weights() {
        let store = InMemoryStore::default();
        let bruno = store.find_user_by_auth("idp_bruno").unwrap().unwrap();
        let payload = user_analytics(&store, &guard(), "idp_dana", bruno.id).unwrap();
        // Bruno: 1 question, 1 answer, question has 1 upvote and 1 downvote,
        // answer has 2 upvotes.
        assert_eq!(payload.reputation_sources.questions_created, 10);
        assert_eq!(payload.reputation_sources.answers_created, 10);
        assert_eq!(payload.reputation_sources.question_upvotes_received, 10);
        assert_eq!(payload.reputation_sources.answer_upvotes_received, 20);
        assert_eq!(payload.reputation_sources.question_downvotes_received, -10);
        assert_eq!(payload.reputation_sources.answer_downvotes_received, 0);
    }

    #[test]
    fn voting_activity_counts_votes_cast() {
        let store = InMemoryStore::default();
        let carmen = store.find_user_by_auth("idp_carmen").unwrap().unwrap();
        let payload = user_analytics(&store, &guard(), "idp_dana", carmen.id).unwrap();
        assert_eq!(payload.voting_activity.questions_upvoted, 1);
        assert_eq!(payload.voting_activity.questions_downvoted, 1);
        assert_eq!(payload.voting_activity.answers_upvoted, 1);
        assert_eq!(payload.voting_activity.answers_downvoted, 1);
    }

    #[test]
    fn answers_carry_question_summaries() {
        let store = InMemoryStore::default();
        let bruno = store.find_user_by_auth("idp_bruno").unwrap().unwrap();
        let payload = user_analytics(&store, &guard(), "idp_dana", bruno.id).unwrap();
        assert_eq!(payload.answers.len(), 1);
        let question = payload.answers[0].question.as_ref().unwrap();
        assert!(question.title.contains("lifetimes"));
    }
}
