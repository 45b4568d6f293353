use chrono::{Duration, Utc};

use stackit_admin::access::AdminGuard;
use stackit_admin::moderation::{bulk_delete_users, delete_answer, delete_user};
use stackit_admin::services::{
    AnswerRecord, ContentStore, InMemoryStore, InteractionKind, InteractionRecord, QuestionRecord,
    RecordId, TagRecord, UserRecord,
};

fn guard() -> AdminGuard {
    AdminGuard::new(["root@example.com"])
}

fn seed_user(store: &InMemoryStore, auth: &str, email: &str) -> RecordId {
    store.insert_user(UserRecord {
        id: 0,
        auth_id: auth.into(),
        name: auth.into(),
        username: None,
        email: email.into(),
        picture: String::new(),
        bio: None,
        location: None,
        portfolio: None,
        reputation: 0,
        saved: Vec::new(),
        joined_at: Utc::now() - Duration::days(10),
    })
}

/// A small platform: one admin, one target user who asked a question,
/// answered someone else's question, voted, and follows a tag.
fn scenario() -> (InMemoryStore, RecordId) {
    let store = InMemoryStore::new();
    let admin = seed_user(&store, "idp_root", "root@example.com");
    let target = seed_user(&store, "idp_target", "target@example.com");

    let own_question = store.insert_question(QuestionRecord {
        id: 0,
        title: "Target's question".into(),
        content: String::new(),
        author: target,
        tags: Vec::new(),
        upvotes: vec![admin],
        downvotes: Vec::new(),
        views: 5,
        answers: Vec::new(),
        created_at: Utc::now() - Duration::days(5),
    });
    let admins_question = store.insert_question(QuestionRecord {
        id: 0,
        title: "Admin's question".into(),
        content: String::new(),
        author: admin,
        tags: Vec::new(),
        upvotes: vec![target],
        downvotes: Vec::new(),
        views: 9,
        answers: Vec::new(),
        created_at: Utc::now() - Duration::days(4),
    });
    let reply_to_own = store.insert_answer(AnswerRecord {
        id: 0,
        content: "answer on target's question".into(),
        author: admin,
        question: own_question,
        upvotes: vec![target],
        downvotes: Vec::new(),
        created_at: Utc::now() - Duration::days(3),
    });
    let targets_answer = store.insert_answer(AnswerRecord {
        id: 0,
        content: "target answers admin".into(),
        author: target,
        question: admins_question,
        upvotes: Vec::new(),
        downvotes: Vec::new(),
        created_at: Utc::now() - Duration::days(2),
    });
    store.insert_tag(TagRecord {
        id: 0,
        name: "testing".into(),
        questions: vec![own_question],
        followers: vec![target],
    });
    store.insert_interaction(InteractionRecord {
        id: 0,
        action: InteractionKind::AskQuestion,
        user: target,
        question: Some(own_question),
        answer: None,
        tag: None,
        created_at: Utc::now() - Duration::days(5),
    });
    store.insert_interaction(InteractionRecord {
        id: 0,
        action: InteractionKind::Answer,
        user: target,
        question: Some(admins_question),
        answer: Some(targets_answer),
        tag: None,
        created_at: Utc::now() - Duration::days(2),
    });
    store.insert_interaction(InteractionRecord {
        id: 0,
        action: InteractionKind::Answer,
        user: admin,
        question: Some(own_question),
        answer: Some(reply_to_own),
        tag: None,
        created_at: Utc::now() - Duration::days(3),
    });

    (store, target)
}

#[test]
fn cascade_leaves_zero_references() {
    let (store, target) = scenario();
    delete_user(&store, &guard(), "idp_root", target).unwrap();

    assert!(store.find_user(target).unwrap().is_none());
    for question in store.list_questions().unwrap() {
        assert_ne!(question.author, target);
        assert!(!question.upvotes.contains(&target));
        assert!(!question.downvotes.contains(&target));
    }
    for answer in store.list_answers().unwrap() {
        assert_ne!(answer.author, target);
        assert!(!answer.upvotes.contains(&target));
        assert!(!answer.downvotes.contains(&target));
    }
    for tag in store.list_tags().unwrap() {
        assert!(!tag.followers.contains(&target));
    }
    assert!(store
        .interactions_by_user(target, usize::MAX)
        .unwrap()
        .is_empty());
}

#[test]
fn cascade_takes_answers_to_own_questions_along() {
    let (store, target) = scenario();
    let report = delete_user(&store, &guard(), "idp_root", target).unwrap();
    // The answer the admin left on the target's question goes with the
    // question; the target's own answer goes too.
    assert_eq!(report.questions_deleted, 1);
    assert_eq!(report.answers_deleted, 2);
    // Admin's own question survives.
    assert_eq!(store.count_questions(None).unwrap(), 1);
}

#[test]
fn missing_targets_fail_without_mutation() {
    let (store, _) = scenario();
    let users = store.count_users(None).unwrap();
    let questions = store.count_questions(None).unwrap();
    let answers = store.count_answers(None).unwrap();
    let interactions = store.count_interactions(None).unwrap();

    assert!(delete_user(&store, &guard(), "idp_root", 777).is_err());
    assert!(delete_answer(&store, &guard(), "idp_root", 777).is_err());

    assert_eq!(store.count_users(None).unwrap(), users);
    assert_eq!(store.count_questions(None).unwrap(), questions);
    assert_eq!(store.count_answers(None).unwrap(), answers);
    assert_eq!(store.count_interactions(None).unwrap(), interactions);
}

#[test]
fn bulk_summary_counts_mixed_results() {
    let (store, target) = scenario();
    let outcome = bulk_delete_users(&store, &guard(), "idp_root", &[target, 555]).unwrap();
    assert_eq!(outcome.summary.total, 2);
    assert_eq!(outcome.summary.successful, 1);
    assert_eq!(outcome.summary.failed, 1);
    let failures: Vec<_> = outcome
        .results
        .iter()
        .filter(|item| !item.success)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].user_id, 555);
}

#[test]
fn non_admin_cannot_moderate() {
    let (store, target) = scenario();
    let result = delete_user(&store, &guard(), "idp_target", target);
    assert!(result.is_err());
    assert!(store.find_user(target).unwrap().is_some());
}
