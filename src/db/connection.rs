use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("DB_NAMESPACE").unwrap_or_else(|_| "tollgate".to_string()),
            database: env::var("DB_DATABASE").unwrap_or_else(|_| "api".to_string()),
            username: env::var("DB_USERNAME").ok(),
            password: env::var("DB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // User table: one record per external subject. `created_at` is set on
        // create only; `updated_at` is recomputed on every write.
        "DEFINE TABLE user SCHEMAFULL;
         DEFINE FIELD subject ON TABLE user TYPE string;
         DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
         DEFINE FIELD updated_at ON TABLE user TYPE datetime VALUE time::now();
         DEFINE FIELD last_seen_at ON TABLE user TYPE datetime DEFAULT time::now();",
        // Second guarantee of the one-record-per-subject invariant; the first
        // is the subject-derived record id used by the user store.
        "DEFINE INDEX user_subject ON TABLE user COLUMNS subject UNIQUE;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}
