use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::debug;

use crate::bloom::StreamerBloom;
use crate::error::Result;

/// Relational streamer registry, gated by an in-process bloom filter so
/// already-seen broadcaster ids never reach Postgres (§3, §4 broadcaster-id
/// ingestion worker).
pub struct StreamerRegistry {
    pool: PgPool,
    bloom: Mutex<StreamerBloom>,
}

impl StreamerRegistry {
    pub async fn connect(
        database_url: &str,
        bloom_expected_items: u64,
        bloom_false_positive_rate: f64,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            bloom: Mutex::new(StreamerBloom::new(
                bloom_expected_items,
                bloom_false_positive_rate,
            )),
        })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Record `streamer_id` as ever-seen-live. Skips the SQL write when the
    /// bloom filter reports the id as already present.
    pub async fn observe(&self, streamer_id: u64) -> Result<()> {
        let should_insert = self.bloom.lock().await.should_insert(streamer_id);
        if !should_insert {
            debug!(streamer_id, "bloom filter suppressed a duplicate insert");
            return Ok(());
        }

        sqlx::query("INSERT INTO streamers (streamer_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(streamer_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
