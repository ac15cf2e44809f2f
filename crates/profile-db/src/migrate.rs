use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!();

/// Apply the profiles, avatars and follows schema from `migrations/`.
/// Already applied versions are skipped.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or_default();
    info!(
        migrations = MIGRATOR.iter().count(),
        latest, "Applying profile schema"
    );

    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    info!(latest, "Profile schema up to date");
    Ok(())
}
