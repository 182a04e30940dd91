use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, sqlx::PgPool};
use tracing::info;

/// Connects the ORM, brings the schema up to date and opens the raw pool the
/// session store runs on.
pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let mut options = ConnectOptions::new(db_url);
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    info!("database migrations applied");

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}

#[cfg(test)]
pub(crate) mod testing {
    use sea_orm::DatabaseConnection;

    /// Every statement a mock connection saw, as `VERB` or `VERB table`.
    pub(crate) fn statement_log(db: DatabaseConnection) -> Vec<String> {
        db.into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements())
            .map(|stmt| {
                let words: Vec<&str> = stmt.sql.split_whitespace().collect();
                let table = match words.first().copied() {
                    Some("UPDATE") => words.get(1),
                    Some("DELETE") | Some("INSERT") => words.get(2),
                    _ => None,
                };
                match table {
                    Some(table) => format!("{} {}", words[0], table.trim_matches('"')),
                    None => words.first().copied().unwrap_or_default().to_string(),
                }
            })
            .collect()
    }
}
