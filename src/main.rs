use std::env;

use stackit_admin::access::AdminGuard;
use stackit_admin::analytics::admin_analytics;
use stackit_admin::health::system_health;
use stackit_admin::moderation::delete_answer;
use stackit_admin::services::{ContentStore, InMemoryStore};
use stackit_admin::services::surreal::SurrealStore;

fn main() {
    dotenvy::dotenv().ok();
    let auth_id = env::var("DEMO_AUTH_ID").unwrap_or_else(|_| "idp_dana".into());
    let guard = AdminGuard::from_env();

    match env::var("STACKIT_STORE").as_deref() {
        Ok("surreal") => match SurrealStore::from_env() {
            Ok(store) => run_read_only(&store, &guard, &auth_id),
            Err(error) => eprintln!("surreal connect -> {error}"),
        },
        _ => {
            let store = InMemoryStore::new_with_sample();
            run_read_only(&store, &guard, &auth_id);
            run_moderation_demo(&store, &guard, &auth_id);
        }
    }
}

fn run_read_only<S: ContentStore>(store: &S, guard: &AdminGuard, auth_id: &str) {
    match admin_analytics(store, guard, auth_id) {
        Ok(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => println!("{rendered}"),
            Err(error) => eprintln!("serialize analytics -> {error}"),
        },
        Err(error) => eprintln!("analytics -> {error}"),
    }
    match system_health(store, guard, auth_id) {
        Ok(snapshot) => println!(
            "health: {} interactions in 24h, {} orphaned answers",
            snapshot.active_last_24h, snapshot.orphaned_answers
        ),
        Err(error) => eprintln!("health -> {error}"),
    }
}

fn run_moderation_demo<S: ContentStore>(store: &S, guard: &AdminGuard, auth_id: &str) {
    let answers = match store.list_answers() {
        Ok(answers) => answers,
        Err(error) => {
            eprintln!("list answers -> {error}");
            return;
        }
    };
    let Some(target) = answers.first() else {
        println!("no answers to moderate");
        return;
    };
    match delete_answer(store, guard, auth_id, target.id) {
        Ok(report) => println!(
            "removed answer {} from question {} ({} interactions dropped)",
            report.answer_id, report.detached_from_question, report.interactions_deleted
        ),
        Err(error) => eprintln!("delete_answer -> {error}"),
    }
}
