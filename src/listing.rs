use crate::access::AdminGuard;
use crate::analytics::{QuestionSummary, TagSummary};
use crate::services::{ContentStore, RecordId, ServiceResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserSort {
    Newest,
    Oldest,
    Reputation,
    Name,
}

impl UserSort {
    /// Unknown values fall back to `Newest`, mirroring the management UI's
    /// default ordering.
    pub fn parse(value: &str) -> Self {
        match value {
            "oldest" => UserSort::Oldest,
            "reputation" => UserSort::Reputation,
            "name" => UserSort::Name,
            _ => UserSort::Newest,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnswerSort {
    Newest,
    Oldest,
    Upvotes,
    Downvotes,
}

impl AnswerSort {
    pub fn parse(value: &str) -> Self {
        match value {
            "oldest" => AnswerSort::Oldest,
            "upvotes" => AnswerSort::Upvotes,
            "downvotes" => AnswerSort::Downvotes,
            _ => AnswerSort::Newest,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListParams {
    pub page: usize,
    pub page_size: usize,
    pub search_query: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search_query: None,
        }
    }
}

impl ListParams {
    fn skip(&self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }

    fn matches(&self, haystacks: &[&str]) -> bool {
        match &self.search_query {
            None => true,
            Some(query) if query.trim().is_empty() => true,
            Some(query) => {
                let needle = query.to_lowercase();
                haystacks
                    .iter()
                    .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: RecordId,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub picture: String,
    pub reputation: i64,
    pub location: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub questions_count: usize,
    pub answers_count: usize,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserListEntry>,
    pub is_next: bool,
    pub total_users: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAuthor {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerListEntry {
    pub id: RecordId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub upvotes_count: usize,
    pub downvotes_count: usize,
    pub author: Option<AnswerAuthor>,
    pub question: Option<QuestionSummary>,
    pub tags: Vec<TagSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPage {
    pub answers: Vec<AnswerListEntry>,
    pub is_next: bool,
    pub total_answers: usize,
}

/// Paginated user listing for the management screen, annotated with content
/// counts and the author's most recent content timestamp.
pub fn admin_users<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    params: &ListParams,
    sort: UserSort,
) -> ServiceResult<UserPage> {
    guard.ensure_admin(store, auth_id)?;

    let questions = store.list_questions()?;
    let answers = store.list_answers()?;

    let mut question_counts: HashMap<RecordId, usize> = HashMap::new();
    let mut last_content: HashMap<RecordId, DateTime<Utc>> = HashMap::new();
    for question in &questions {
        *question_counts.entry(question.author).or_default() += 1;
        bump_latest(&mut last_content, question.author, question.created_at);
    }
    let mut answer_counts: HashMap<RecordId, usize> = HashMap::new();
    for answer in &answers {
        *answer_counts.entry(answer.author).or_default() += 1;
        bump_latest(&mut last_content, answer.author, answer.created_at);
    }

    let mut entries: Vec<UserListEntry> = store
        .list_users()?
        .into_iter()
        .filter(|user| {
            params.matches(&[
                user.name.as_str(),
                user.email.as_str(),
                user.username.as_deref().unwrap_or(""),
            ])
        })
        .map(|user| UserListEntry {
            questions_count: question_counts.get(&user.id).copied().unwrap_or(0),
            answers_count: answer_counts.get(&user.id).copied().unwrap_or(0),
            last_active: last_content.get(&user.id).copied(),
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            picture: user.picture,
            reputation: user.reputation,
            location: user.location,
            joined_at: user.joined_at,
        })
        .collect();

    match sort {
        UserSort::Newest => entries.sort_by(|a, b| b.joined_at.cmp(&a.joined_at)),
        UserSort::Oldest => entries.sort_by(|a, b| a.joined_at.cmp(&b.joined_at)),
        UserSort::Reputation => {
            entries.sort_by(|a, b| b.reputation.cmp(&a.reputation).then(a.id.cmp(&b.id)))
        }
        UserSort::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
    }

    let total_users = entries.len();
    let page: Vec<UserListEntry> = entries
        .into_iter()
        .skip(params.skip())
        .take(params.page_size)
        .collect();
    let is_next = total_users > params.skip() + page.len();

    Ok(UserPage {
        users: page,
        is_next,
        total_users,
    })
}

/// Paginated answer listing with author and parent-question expansion.
pub fn admin_answers<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    params: &ListParams,
    sort: AnswerSort,
) -> ServiceResult<AnswerPage> {
    guard.ensure_admin(store, auth_id)?;

    let users = store.list_users()?;
    let questions = store.list_questions()?;
    let tags = store.list_tags()?;
    let user_index: HashMap<RecordId, &crate::services::UserRecord> =
        users.iter().map(|user| (user.id, user)).collect();
    let question_index: HashMap<RecordId, &crate::services::QuestionRecord> = questions
        .iter()
        .map(|question| (question.id, question))
        .collect();
    let tag_index: HashMap<RecordId, &crate::services::TagRecord> =
        tags.iter().map(|tag| (tag.id, tag)).collect();

    let mut entries: Vec<AnswerListEntry> = store
        .list_answers()?
        .into_iter()
        .filter(|answer| {
            let author_name = user_index
                .get(&answer.author)
                .map(|user| user.name.as_str())
                .unwrap_or("");
            let question_title = question_index
                .get(&answer.question)
                .map(|question| question.title.as_str())
                .unwrap_or("");
            params.matches(&[answer.content.as_str(), author_name, question_title])
        })
        .map(|answer| {
            let question = question_index.get(&answer.question);
            AnswerListEntry {
                id: answer.id,
                created_at: answer.created_at,
                upvotes_count: answer.upvotes.len(),
                downvotes_count: answer.downvotes.len(),
                author: user_index.get(&answer.author).map(|user| AnswerAuthor {
                    id: user.id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    picture: user.picture.clone(),
                }),
                question: question.map(|question| QuestionSummary {
                    id: question.id,
                    title: question.title.clone(),
                }),
                tags: question
                    .map(|question| {
                        question
                            .tags
                            .iter()
                            .filter_map(|id| tag_index.get(id))
                            .map(|tag| TagSummary {
                                id: tag.id,
                                name: tag.name.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                content: answer.content,
            }
        })
        .collect();

    match sort {
        AnswerSort::Newest => entries.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        AnswerSort::Oldest => entries.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        AnswerSort::Upvotes => {
            entries.sort_by(|a, b| b.upvotes_count.cmp(&a.upvotes_count).then(a.id.cmp(&b.id)))
        }
        AnswerSort::Downvotes => entries.sort_by(|a, b| {
            b.downvotes_count
                .cmp(&a.downvotes_count)
                .then(a.id.cmp(&b.id))
        }),
    }

    let total_answers = entries.len();
    let page: Vec<AnswerListEntry> = entries
        .into_iter()
        .skip(params.skip())
        .take(params.page_size)
        .collect();
    let is_next = total_answers > params.skip() + page.len();

    Ok(AnswerPage {
        answers: page,
        is_next,
        total_answers,
    })
}

fn bump_latest(
    latest: &mut HashMap<RecordId, DateTime<Utc>>,
    user: RecordId,
    candidate: DateTime<Utc>,
) {
    latest
        .entry(user)
        .and_modify(|current| {
            if candidate > *current {
                *current = candidate;
            }
        })
        .or_insert(candidate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    fn guard() -> AdminGuard {
        AdminGuard::new(["admin@stackit.com"])
    }

    #[test]
    fn users_sorted_by_reputation() {
        let store = InMemoryStore::default();
        let page = admin_users(
            &store,
            &guard(),
            "idp_dana",
            &ListParams::default(),
            UserSort::Reputation,
        )
        .unwrap();
        let reputations: Vec<i64> = page.users.iter().map(|user| user.reputation).collect();
        assert_eq!(reputations, vec![980, 320, 145, 45]);
        assert!(!page.is_next);
        assert_eq!(page.total_users, 4);
    }

    #[test]
    fn user_search_is_case_insensitive() {
        let store = InMemoryStore::default();
        let params = ListParams {
            search_query: Some("BRUNO".into()),
            ..ListParams::default()
        };
        let page = admin_users(&store, &guard(), "idp_dana", &params, UserSort::Newest).unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].name, "Bruno Vega");
    }

    #[test]
    fn pagination_reports_next_flag() {
        let store = InMemoryStore::default();
        let params = ListParams {
            page: 1,
            page_size: 2,
            search_query: None,
        };
        let page = admin_users(&store, &guard(), "idp_dana", &params, UserSort::Newest).unwrap();
        assert_eq!(page.users.len(), 2);
        assert!(page.is_next);
        let tail = admin_users(
            &store,
            &guard(),
            "idp_dana",
            &ListParams {
                page: 2,
                ..params.clone()
            },
            UserSort::Newest,
        )
        .unwrap();
        assert_eq!(tail.users.len(), 2);
        assert!(!tail.is_next);
    }

    #[test]
    fn answers_sorted_by_upvotes_descending() {
        let store = InMemoryStore::default();
        let page = admin_answers(
            &store,
            &guard(),
            "idp_dana",
            &ListParams::default(),
            AnswerSort::Upvotes,
        )
        .unwrap();
        for pair in page.answers.windows(2) {
            assert!(pair[0].upvotes_count >= pair[1].upvotes_count);
        }
        assert_eq!(page.answers[0].upvotes_count, 2);
    }

    #[test]
    fn answer_search_covers_question_title() {
        let store = InMemoryStore::default();
        let params = ListParams {
            search_query: Some("lifetimes".into()),
            ..ListParams::default()
        };
        let page =
            admin_answers(&store, &guard(), "idp_dana", &params, AnswerSort::Newest).unwrap();
        assert_eq!(page.answers.len(), 2);
    }

    #[test]
    fn sort_keys_parse_with_default() {
        assert_eq!(UserSort::parse("reputation"), UserSort::Reputation);
        assert_eq!(UserSort::parse("bogus"), UserSort::Newest);
        assert_eq!(AnswerSort::parse("downvotes"), AnswerSort::Downvotes);
        assert_eq!(AnswerSort::parse(""), AnswerSort::Newest);
    }
}
