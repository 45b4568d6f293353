use crate::access::AdminGuard;
use crate::services::{
    ContentStore, InteractionKind, QuestionRecord, RecordId, ServiceResult, UserRecord,
};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const LEADERBOARD_LIMIT: usize = 10;
const POPULAR_QUESTION_LIMIT: usize = 5;
const TAG_LIMIT: usize = 10;
const ACTIVITY_PAGE_SIZE: usize = 20;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    pub total_users: i64,
    pub total_questions: i64,
    pub total_answers: i64,
    pub total_tags: i64,
    pub total_interactions: i64,
    pub new_users_last_30_days: i64,
    pub questions_last_30_days: i64,
    pub answers_last_30_days: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub reputation: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub reputation: i64,
    pub questions_count: usize,
    pub answers_count: usize,
    pub total_activity: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub id: RecordId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularQuestion {
    pub id: RecordId,
    pub title: String,
    pub views: i64,
    pub upvotes: usize,
    pub downvotes: usize,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorSummary>,
    pub tags: Vec<TagSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: RecordId,
    pub title: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: RecordId,
    pub action: InteractionKind,
    pub created_at: DateTime<Utc>,
    pub user: Option<AuthorSummary>,
    pub question: Option<QuestionSummary>,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTotals {
    pub total_upvotes: i64,
    pub total_downvotes: i64,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStats {
    pub questions: VoteTotals,
    pub answers: VoteTotals,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    pub id: RecordId,
    pub name: String,
    pub question_count: usize,
    pub follower_count: usize,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthData {
    pub users: Vec<MonthlyCount>,
    pub questions: Vec<MonthlyCount>,
    pub answers: Vec<MonthlyCount>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAnalytics {
    pub overview: OverviewCounts,
    pub top_users: Vec<TopUser>,
    pub most_active_users: Vec<ActiveUser>,
    pub popular_questions: Vec<PopularQuestion>,
    pub recent_activity: Vec<ActivityEntry>,
    pub vote_stats: VoteStats,
    pub tag_stats: Vec<TagUsage>,
    pub growth_data: GrowthData,
}

/// Full platform overview for the admin dashboard.
///
/// Every section is a pure read over the content store; the rolling windows
/// are computed against "now" at call time.
pub fn admin_analytics<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
) -> ServiceResult<AdminAnalytics> {
    guard.ensure_admin(store, auth_id)?;

    let now = Utc::now();
    let thirty_days_ago = now - Duration::days(30);

    let overview = OverviewCounts {
        total_users: store.count_users(None)?,
        total_questions: store.count_questions(None)?,
        total_answers: store.count_answers(None)?,
        total_tags: store.count_tags()?,
        total_interactions: store.count_interactions(None)?,
        new_users_last_30_days: store.count_users(Some(thirty_days_ago))?,
        questions_last_30_days: store.count_questions(Some(thirty_days_ago))?,
        answers_last_30_days: store.count_answers(Some(thirty_days_ago))?,
    };

    let users = store.list_users()?;
    let questions = store.list_questions()?;
    let answers = store.list_answers()?;
    let tags = store.list_tags()?;

    let user_index: HashMap<RecordId, &UserRecord> =
        users.iter().map(|user| (user.id, user)).collect();
    let question_index: HashMap<RecordId, &QuestionRecord> =
        questions.iter().map(|question| (question.id, question)).collect();

    let top_users = top_users_by_reputation(&users);
    let most_active_users = most_active(&users, &questions, &answers);
    let popular_questions = popular(&questions, &user_index, &tags);

    let recent_activity = store
        .interactions_since(now - Duration::hours(24))?
        .into_iter()
        .take(ACTIVITY_PAGE_SIZE)
        .map(|entry| ActivityEntry {
            id: entry.id,
            action: entry.action,
            created_at: entry.created_at,
            user: user_index.get(&entry.user).map(|user| AuthorSummary {
                name: user.name.clone(),
                email: user.email.clone(),
            }),
            question: entry
                .question
                .and_then(|id| question_index.get(&id))
                .map(|question| QuestionSummary {
                    id: question.id,
                    title: question.title.clone(),
                }),
        })
        .collect();

    let vote_stats = VoteStats {
        questions: questions.iter().fold(VoteTotals::default(), |acc, q| VoteTotals {
            total_upvotes: acc.total_upvotes + q.upvotes.len() as i64,
            total_downvotes: acc.total_downvotes + q.downvotes.len() as i64,
        }),
        answers: answers.iter().fold(VoteTotals::default(), |acc, a| VoteTotals {
            total_upvotes: acc.total_upvotes + a.upvotes.len() as i64,
            total_downvotes: acc.total_downvotes + a.downvotes.len() as i64,
        }),
    };

    let mut tag_stats: Vec<TagUsage> = tags
        .iter()
        .map(|tag| TagUsage {
            id: tag.id,
            name: tag.name.clone(),
            question_count: tag.questions.len(),
            follower_count: tag.followers.len(),
        })
        .collect();
    tag_stats.sort_by(|a, b| b.question_count.cmp(&a.question_count).then(a.id.cmp(&b.id)));
    tag_stats.truncate(TAG_LIMIT);

    let twelve_months_ago = now - Months::new(12);
    let growth_data = GrowthData {
        users: monthly_counts(users.iter().map(|user| user.joined_at), twelve_months_ago),
        questions: monthly_counts(
            questions.iter().map(|question| question.created_at),
            twelve_months_ago,
        ),
        answers: monthly_counts(
            answers.iter().map(|answer| answer.created_at),
            twelve_months_ago,
        ),
    };

    Ok(AdminAnalytics {
        overview,
        top_users,
        most_active_users,
        popular_questions,
        recent_activity,
        vote_stats,
        tag_stats,
        growth_data,
    })
}

fn top_users_by_reputation(users: &[UserRecord]) -> Vec<TopUser> {
    let mut ranked: Vec<&UserRecord> = users.iter().collect();
    // Descending by reputation; record id as the explicit tie-break.
    ranked.sort_by(|a, b| b.reputation.cmp(&a.reputation).then(a.id.cmp(&b.id)));
    ranked
        .into_iter()
        .take(LEADERBOARD_LIMIT)
        .map(|user| TopUser {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            reputation: user.reputation,
            joined_at: user.joined_at,
        })
        .collect()
}

fn most_active(
    users: &[UserRecord],
    questions: &[QuestionRecord],
    answers: &[crate::services::AnswerRecord],
) -> Vec<ActiveUser> {
    let mut question_counts: HashMap<RecordId, usize> = HashMap::new();
    for question in questions {
        *question_counts.entry(question.author).or_default() += 1;
    }
    let mut answer_counts: HashMap<RecordId, usize> = HashMap::new();
    for answer in answers {
        *answer_counts.entry(answer.author).or_default() += 1;
    }

    let mut entries: Vec<ActiveUser> = users
        .iter()
        .map(|user| {
            let questions_count = question_counts.get(&user.id).copied().unwrap_or(0);
            let answers_count = answer_counts.get(&user.id).copied().unwrap_or(0);
            ActiveUser {
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                reputation: user.reputation,
                questions_count,
                answers_count,
                total_activity: questions_count + answers_count,
            }
        })
        .collect();
    entries.sort_by(|a, b| b.total_activity.cmp(&a.total_activity).then(a.id.cmp(&b.id)));
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}

fn popular(
    questions: &[QuestionRecord],
    user_index: &HashMap<RecordId, &UserRecord>,
    tags: &[crate::services::TagRecord],
) -> Vec<PopularQuestion> {
    let tag_index: HashMap<RecordId, &crate::services::TagRecord> =
        tags.iter().map(|tag| (tag.id, tag)).collect();
    let mut ranked: Vec<&QuestionRecord> = questions.iter().collect();
    ranked.sort_by(|a, b| b.views.cmp(&a.views).then(a.id.cmp(&b.id)));
    ranked
        .into_iter()
        .take(POPULAR_QUESTION_LIMIT)
        .map(|question| PopularQuestion {
            id: question.id,
            title: question.title.clone(),
            views: question.views,
            upvotes: question.upvotes.len(),
            downvotes: question.downvotes.len(),
            created_at: question.created_at,
            author: user_index.get(&question.author).map(|user| AuthorSummary {
                name: user.name.clone(),
                email: user.email.clone(),
            }),
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
        .collect()
}

/// Counts grouped by calendar (year, month), chronological. Months with no
/// activity are absent; callers treat a missing month as zero.
pub fn monthly_counts<I>(dates: I, since: DateTime<Utc>) -> Vec<MonthlyCount>
where
    I: Iterator<Item = DateTime<Utc>>,
{
    let mut buckets: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for date in dates {
        if date >= since {
            *buckets.entry((date.year(), date.month())).or_default() += 1;
        }
    }
    buckets
        .into_iter()
        .map(|((year, month), count)| MonthlyCount { year, month, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryStore, UserRecord};

    fn guard() -> AdminGuard {
        AdminGuard::new(["admin@stackit.com"])
    }

    fn user(auth: &str, email: &str, reputation: i64) -> UserRecord {
        UserRecord {
            id: 0,
            auth_id: auth.into(),
            name: auth.trim_start_matches("idp_").into(),
            username: None,
            email: email.into(),
            picture: String::new(),
            bio: None,
            location: None,
            portfolio: None,
            reputation,
            saved: Vec::new(),
            joined_at: Utc::now() - Duration::days(1),
        }
    }

    #[test]
    fn overview_matches_sample() {
        let store = InMemoryStore::default();
        let payload = admin_analytics(&store, &guard(), "idp_dana").unwrap();
        assert_eq!(payload.overview.total_users, 4);
        assert_eq!(payload.overview.total_questions, 2);
        assert_eq!(payload.overview.total_answers, 2);
        assert_eq!(payload.overview.new_users_last_30_days, 1);
    }

    #[test]
    fn guard_runs_before_any_aggregation() {
        let store = InMemoryStore::default();
        assert!(admin_analytics(&store, &guard(), "idp_alice").is_err());
    }

    #[test]
    fn empty_platform_reports_zeroes_and_ranked_users() {
        let store = InMemoryStore::new();
        store.insert_user(user("idp_root", "admin@stackit.com", 50));
        store.insert_user(user("idp_two", "two@example.com", 200));
        store.insert_user(user("idp_three", "three@example.com", 10));

        let payload = admin_analytics(&store, &guard(), "idp_root").unwrap();
        assert_eq!(payload.overview.total_users, 3);
        assert_eq!(payload.overview.total_questions, 0);
        assert_eq!(payload.overview.total_answers, 0);
        let reputations: Vec<i64> = payload
            .top_users
            .iter()
            .map(|entry| entry.reputation)
            .collect();
        assert_eq!(reputations, vec![200, 50, 10]);
        assert_eq!(payload.vote_stats.questions.total_upvotes, 0);
        assert_eq!(payload.vote_stats.answers.total_downvotes, 0);
    }

    #[test]
    fn top_five_of_three_returns_three() {
        let store = InMemoryStore::new();
        store.insert_user(user("idp_root", "admin@stackit.com", 1));
        store.insert_user(user("idp_a", "a@example.com", 2));
        store.insert_user(user("idp_b", "b@example.com", 3));
        let payload = admin_analytics(&store, &guard(), "idp_root").unwrap();
        assert_eq!(payload.top_users.len(), 3);
    }

    #[test]
    fn vote_totals_equal_set_sizes() {
        let store = InMemoryStore::default();
        let payload = admin_analytics(&store, &guard(), "idp_dana").unwrap();
        let questions = store.list_questions().unwrap();
        let expected_up: i64 = questions.iter().map(|q| q.upvotes.len() as i64).sum();
        let expected_down: i64 = questions.iter().map(|q| q.downvotes.len() as i64).sum();
        assert_eq!(payload.vote_stats.questions.total_upvotes, expected_up);
        assert_eq!(payload.vote_stats.questions.total_downvotes, expected_down);
    }

    #[test]
    fn growth_sums_match_bounded_counts() {
        let store = InMemoryStore::default();
        let payload = admin_analytics(&store, &guard(), "idp_dana").unwrap();
        let since = Utc::now() - Months::new(12);
        let expected = store.count_questions(Some(since)).unwrap();
        let summed: i64 = payload
            .growth_data
            .questions
            .iter()
            .map(|month| month.count)
            .sum();
        assert_eq!(summed, expected);
    }

    #[test]
    fn recent_activity_is_newest_first_and_capped() {
        let store = InMemoryStore::default();
        let payload = admin_analytics(&store, &guard(), "idp_dana").unwrap();
        assert!(payload.recent_activity.len() <= 20);
        for pair in payload.recent_activity.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn tag_usage_ranked_by_question_count() {
        let store = InMemoryStore::default();
        let payload = admin_analytics(&store, &guard(), "idp_dana").unwrap();
        assert_eq!(payload.tag_stats[0].name, "rust");
        assert_eq!(payload.tag_stats[0].question_count, 2);
        assert_eq!(payload.tag_stats[0].follower_count, 2);
    }
}
