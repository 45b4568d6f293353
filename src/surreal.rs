use std::env;

use surrealdb::{
    engine::remote::http::{Client, Http},
    opt::auth::Root,
    Surreal,
};
use tracing::info;

pub type SurrealClient = Surreal<Client>;

fn normalize_endpoint(raw: String) -> String {
    let ep = raw.trim().to_string();
    if ep.starts_with("http://") || ep.starts_with("https://") {
        ep
    } else {
        format!("http://{ep}")
    }
}

/// Connect to SurrealDB using environment variables, defaults to local root
/// account.
pub async fn connect_from_env() -> Result<SurrealClient, surrealdb::Error> {
    let endpoint_raw =
        env::var("SURREAL_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:8000".into());
    let endpoint = normalize_endpoint(endpoint_raw);
    let ns = env::var("SURREAL_NAMESPACE").unwrap_or_else(|_| "stackit".into());
    let db = env::var("SURREAL_DATABASE").unwrap_or_else(|_| "main".into());
    let user = env::var("SURREAL_USER").unwrap_or_else(|_| "root".into());
    let pass = env::var("SURREAL_PASS").unwrap_or_else(|_| "root".into());

    info!(endpoint, namespace = %ns, database = %db, "connecting to SurrealDB (HTTP)");
    let client = Surreal::new::<Http>(&endpoint).await?;
    client
        .signin(Root {
            username: &user,
            password: &pass,
        })
        .await?;
    client.use_ns(&ns).use_db(&db).await?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gains_scheme_when_missing() {
        assert_eq!(
            normalize_endpoint("127.0.0.1:8000".into()),
            "http://127.0.0.1:8000"
        );
        assert_eq!(
            normalize_endpoint("https://db.internal".into()),
            "https://db.internal"
        );
    }
}
