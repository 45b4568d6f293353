use chrono::{Duration, Months, Utc};

use stackit_admin::access::AdminGuard;
use stackit_admin::analytics::admin_analytics;
use stackit_admin::export::{export_platform_data, ExportFormat, ExportSelection};
use stackit_admin::services::{ContentStore, InMemoryStore, QuestionRecord, UserRecord};

fn guard() -> AdminGuard {
    AdminGuard::new(["root@example.com"])
}

fn seed_user(store: &InMemoryStore, auth: &str, email: &str, reputation: i64, days_ago: i64) {
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
        reputation,
        saved: Vec::new(),
        joined_at: Utc::now() - Duration::days(days_ago),
    });
}

#[test]
fn leaderboard_is_descending_and_bounded_by_population() {
    let store = InMemoryStore::new();
    seed_user(&store, "idp_root", "root@example.com", 50, 700);
    seed_user(&store, "idp_a", "a@example.com", 200, 10);
    seed_user(&store, "idp_b", "b@example.com", 10, 3);

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
    for pair in reputations.windows(2) {
        assert!(pair[0] >= pair[1]);
    }

    assert_eq!(payload.vote_stats.questions.total_upvotes, 0);
    assert_eq!(payload.vote_stats.questions.total_downvotes, 0);
    assert_eq!(payload.vote_stats.answers.total_upvotes, 0);
    assert_eq!(payload.vote_stats.answers.total_downvotes, 0);
}

#[test]
fn growth_series_sums_to_window_count() {
    let store = InMemoryStore::new();
    seed_user(&store, "idp_root", "root@example.com", 1, 800);
    // Signups scattered across the trailing year, plus one outside it.
    for (index, days_ago) in [15i64, 45, 100, 200, 340, 500].iter().enumerate() {
        seed_user(
            &store,
            &format!("idp_u{index}"),
            &format!("u{index}@example.com"),
            0,
            *days_ago,
        );
    }

    let payload = admin_analytics(&store, &guard(), "idp_root").unwrap();
    let summed: i64 = payload
        .growth_data
        .users
        .iter()
        .map(|month| month.count)
        .sum();
    let window_start = Utc::now() - Months::new(12);
    let expected = store.count_users(Some(window_start)).unwrap();
    assert_eq!(summed, expected);

    // Chronological ordering.
    for pair in payload.growth_data.users.windows(2) {
        assert!((pair[0].year, pair[0].month) < (pair[1].year, pair[1].month));
    }
}

#[test]
fn vote_totals_match_per_record_sets() {
    let store = InMemoryStore::default();
    let payload = admin_analytics(&store, &guard_sample(), "idp_dana").unwrap();

    let questions = store.list_questions().unwrap();
    let answers = store.list_answers().unwrap();
    assert_eq!(
        payload.vote_stats.questions.total_upvotes,
        questions.iter().map(|q| q.upvotes.len() as i64).sum::<i64>()
    );
    assert_eq!(
        payload.vote_stats.answers.total_upvotes,
        answers.iter().map(|a| a.upvotes.len() as i64).sum::<i64>()
    );
}

#[test]
fn popular_questions_rank_by_views() {
    let store = InMemoryStore::new();
    seed_user(&store, "idp_root", "root@example.com", 1, 100);
    let author = store.list_users().unwrap()[0].id;
    for (title, views) in [("low", 3i64), ("high", 90), ("mid", 40)] {
        store.insert_question(QuestionRecord {
            id: 0,
            title: title.into(),
            content: String::new(),
            author,
            tags: Vec::new(),
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            views,
            answers: Vec::new(),
            created_at: Utc::now() - Duration::days(1),
        });
    }

    let payload = admin_analytics(&store, &guard(), "idp_root").unwrap();
    let titles: Vec<&str> = payload
        .popular_questions
        .iter()
        .map(|question| question.title.as_str())
        .collect();
    assert_eq!(titles, vec!["high", "mid", "low"]);
}

#[test]
fn export_strips_identity_provider_reference() {
    let store = InMemoryStore::default();
    let payload = export_platform_data(
        &store,
        &guard_sample(),
        "idp_dana",
        ExportSelection::Users,
        ExportFormat::Json,
    )
    .unwrap();
    assert!(!payload.body.contains("idp_"));
    assert!(payload.body.contains("\"users\""));
}

fn guard_sample() -> AdminGuard {
    AdminGuard::new(["admin@stackit.com"])
}
