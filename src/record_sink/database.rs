use {
    super::{RecordSink, async_trait},
    crate::{FoundBlock, Result, Share},
    sqlx::{Pool, Postgres, postgres::PgPoolOptions},
};

pub struct DatabaseSink {
    pool: Pool<Postgres>,
}

impl DatabaseSink {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordSink for DatabaseSink {
    async fn insert_shares(&self, shares: Vec<Share>) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        for share in shares {
            sqlx::query(
                r#"
                INSERT INTO shares (
                    pool_id, block_height, miner, rig, user_agent,
                    difficulty, network_difficulty, ip_address, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, to_timestamp($9))
                "#,
            )
            .bind(&share.pool_id)
            .bind(share.block_height as i64)
            .bind(&share.miner)
            .bind(&share.rig)
            .bind(&share.user_agent)
            .bind(share.difficulty)
            .bind(share.network_difficulty)
            .bind(&share.ip_address)
            .bind(share.created_at as i64)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    async fn insert_found(&self, block: FoundBlock) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blocks (
                pool_id, chain, type, block_height, hash,
                transaction_confirmation_data, network_difficulty,
                status, miner, created_at, confirmation_progress
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, to_timestamp($10), $11)
            "#,
        )
        .bind(&block.pool_id)
        .bind(&block.chain)
        .bind(block.kind.to_string())
        .bind(block.height as i64)
        .bind(&block.hash)
        .bind(&block.transaction_confirmation_data)
        .bind(block.network_difficulty)
        .bind(block.status.to_string().to_lowercase())
        .bind(&block.miner)
        .bind(block.created_at as i64)
        .bind(block.confirmation_progress)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
