use crate::access::AdminGuard;
use crate::services::{AdminError, ContentStore, RecordId, ServiceResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExportSelection {
    Users,
    Questions,
    Answers,
    All,
}

impl ExportSelection {
    fn wants_users(&self) -> bool {
        matches!(self, ExportSelection::Users | ExportSelection::All)
    }

    fn wants_questions(&self) -> bool {
        matches!(self, ExportSelection::Questions | ExportSelection::All)
    }

    fn wants_answers(&self) -> bool {
        matches!(self, ExportSelection::Answers | ExportSelection::All)
    }
}

impl Default for ExportSelection {
    fn default() -> Self {
        ExportSelection::All
    }
}

impl FromStr for ExportSelection {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "users" => Ok(ExportSelection::Users),
            "questions" => Ok(ExportSelection::Questions),
            "answers" => Ok(ExportSelection::Answers),
            "all" => Ok(ExportSelection::All),
            other => Err(AdminError::Validation(format!(
                "unknown export type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Json
    }
}

impl FromStr for ExportFormat {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(AdminError::Validation(format!(
                "unknown export format: {other}"
            ))),
        }
    }
}

/// Serialized snapshot. Transport metadata (filename, content type header)
/// is the HTTP layer's business; this is only the payload and its format.
#[derive(Clone, Debug)]
pub struct ExportPayload {
    pub body: String,
    pub format: ExportFormat,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedUser {
    id: RecordId,
    name: String,
    username: Option<String>,
    email: String,
    picture: String,
    bio: Option<String>,
    location: Option<String>,
    portfolio: Option<String>,
    reputation: i64,
    saved: Vec<RecordId>,
    joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedQuestion {
    id: RecordId,
    title: String,
    author_name: String,
    author_email: String,
    tags: Vec<String>,
    views: i64,
    upvotes: usize,
    downvotes: usize,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedAnswer {
    id: RecordId,
    author_name: String,
    author_email: String,
    question_title: String,
    upvotes: usize,
    downvotes: usize,
    created_at: DateTime<Utc>,
}

/// Snapshot the selected collections. The identity-provider reference is
/// stripped from users; content references are expanded to author name/email
/// and tag names only.
pub fn export_platform_data<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    selection: ExportSelection,
    format: ExportFormat,
) -> ServiceResult<ExportPayload> {
    guard.ensure_admin(store, auth_id)?;

    let users = store.list_users()?;
    let user_index: HashMap<RecordId, (String, String)> = users
        .iter()
        .map(|user| (user.id, (user.name.clone(), user.email.clone())))
        .collect();
    let tags = store.list_tags()?;
    let tag_names: HashMap<RecordId, String> =
        tags.iter().map(|tag| (tag.id, tag.name.clone())).collect();

    let exported_users: Vec<ExportedUser> = if selection.wants_users() {
        users
            .iter()
            .map(|user| ExportedUser {
                id: user.id,
                name: user.name.clone(),
                username: user.username.clone(),
                email: user.email.clone(),
                picture: user.picture.clone(),
                bio: user.bio.clone(),
                location: user.location.clone(),
                portfolio: user.portfolio.clone(),
                reputation: user.reputation,
                saved: user.saved.clone(),
                joined_at: user.joined_at,
            })
            .collect()
    } else {
        Vec::new()
    };

    let exported_questions: Vec<ExportedQuestion> = if selection.wants_questions() {
        store
            .list_questions()?
            .iter()
            .map(|question| {
                let (author_name, author_email) = user_index
                    .get(&question.author)
                    .cloned()
                    .unwrap_or_default();
                ExportedQuestion {
                    id: question.id,
                    title: question.title.clone(),
                    author_name,
                    author_email,
                    tags: question
                        .tags
                        .iter()
                        .filter_map(|id| tag_names.get(id).cloned())
                        .collect(),
                    views: question.views,
                    upvotes: question.upvotes.len(),
                    downvotes: question.downvotes.len(),
                    created_at: question.created_at,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let exported_answers: Vec<ExportedAnswer> = if selection.wants_answers() {
        let question_titles: HashMap<RecordId, String> = store
            .list_questions()?
            .iter()
            .map(|question| (question.id, question.title.clone()))
            .collect();
        store
            .list_answers()?
            .iter()
            .map(|answer| {
                let (author_name, author_email) =
                    user_index.get(&answer.author).cloned().unwrap_or_default();
                ExportedAnswer {
                    id: answer.id,
                    author_name,
                    author_email,
                    question_title: question_titles
                        .get(&answer.question)
                        .cloned()
                        .unwrap_or_default(),
                    upvotes: answer.upvotes.len(),
                    downvotes: answer.downvotes.len(),
                    created_at: answer.created_at,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let body = match format {
        ExportFormat::Json => {
            let mut document = Map::new();
            if selection.wants_users() {
                document.insert("users".into(), json!(exported_users));
            }
            if selection.wants_questions() {
                document.insert("questions".into(), json!(exported_questions));
            }
            if selection.wants_answers() {
                document.insert("answers".into(), json!(exported_answers));
            }
            serde_json::to_string_pretty(&Value::Object(document))
                .map_err(|err| AdminError::Internal(err.to_string()))?
        }
        ExportFormat::Csv => {
            let mut blocks = Vec::new();
            if selection.wants_users() {
                blocks.push(users_csv(&exported_users));
            }
            if selection.wants_questions() {
                blocks.push(questions_csv(&exported_questions));
            }
            if selection.wants_answers() {
                blocks.push(answers_csv(&exported_answers));
            }
            blocks.join("\n")
        }
    };

    Ok(ExportPayload { body, format })
}

fn users_csv(users: &[ExportedUser]) -> String {
    let mut out = String::from("id,name,username,email,reputation,location,joinedAt\n");
    for user in users {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            user.id,
            csv_field(&user.name),
            csv_field(user.username.as_deref().unwrap_or("")),
            csv_field(&user.email),
            user.reputation,
            csv_field(user.location.as_deref().unwrap_or("")),
            user.joined_at.to_rfc3339(),
        ));
    }
    out
}

fn questions_csv(questions: &[ExportedQuestion]) -> String {
    let mut out =
        String::from("id,title,authorName,authorEmail,tags,views,upvotes,downvotes,createdAt\n");
    for question in questions {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            question.id,
            csv_field(&question.title),
            csv_field(&question.author_name),
            csv_field(&question.author_email),
            csv_field(&question.tags.join("|")),
            question.views,
            question.upvotes,
            question.downvotes,
            question.created_at.to_rfc3339(),
        ));
    }
    out
}

fn answers_csv(answers: &[ExportedAnswer]) -> String {
    let mut out =
        String::from("id,authorName,authorEmail,questionTitle,upvotes,downvotes,createdAt\n");
    for answer in answers {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            answer.id,
            csv_field(&answer.author_name),
            csv_field(&answer.author_email),
            csv_field(&answer.question_title),
            answer.upvotes,
            answer.downvotes,
            answer.created_at.to_rfc3339(),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    fn guard() -> AdminGuard {
        AdminGuard::new(["admin@stackit.com"])
    }

    #[test]
    fn json_export_never_contains_identity_reference() {
        let store = InMemoryStore::default();
        let payload = export_platform_data(
            &store,
            &guard(),
            "idp_dana",
            ExportSelection::Users,
            ExportFormat::Json,
        )
        .unwrap();
        assert!(!payload.body.contains("auth_id"));
        assert!(!payload.body.contains("authId"));
        assert!(!payload.body.contains("idp_alice"));
        assert!(payload.body.contains("alice@example.com"));
    }

    #[test]
    fn selection_limits_collections() {
        let store = InMemoryStore::default();
        let payload = export_platform_data(
            &store,
            &guard(),
            "idp_dana",
            ExportSelection::Questions,
            ExportFormat::Json,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&payload.body).unwrap();
        assert!(parsed.get("questions").is_some());
        assert!(parsed.get("users").is_none());
        assert!(parsed.get("answers").is_none());
    }

    #[test]
    fn csv_export_has_headers_and_quoting() {
        let store = InMemoryStore::default();
        let payload = export_platform_data(
            &store,
            &guard(),
            "idp_dana",
            ExportSelection::All,
            ExportFormat::Csv,
        )
        .unwrap();
        assert!(payload
            .body
            .starts_with("id,name,username,email,reputation,location,joinedAt"));
        assert!(payload.body.contains("authorName"));
        // Question titles contain punctuation but no commas in the sample;
        // a title with a comma must come out quoted.
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn selectors_parse() {
        assert_eq!(
            "users".parse::<ExportSelection>().unwrap(),
            ExportSelection::Users
        );
        assert!(matches!(
            "everything".parse::<ExportSelection>(),
            Err(AdminError::Validation(_))
        ));
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn export_requires_admin() {
        let store = InMemoryStore::default();
        let result = export_platform_data(
            &store,
            &guard(),
            "idp_carmen",
            ExportSelection::All,
            ExportFormat::Json,
        );
        assert!(result.is_err());
    }
}
