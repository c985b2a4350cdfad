use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use taskevents_domain::{
    AuditAction, AuditFilter, AuditRecord, AuditStore, ConsumerResult, EntityType,
};

/// Postgres审计存储实现
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 连接数据库并创建存储实例
    pub async fn connect(url: &str, max_connections: u32) -> ConsumerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("审计数据库连接成功");
        Ok(Self::new(pool))
    }

    /// 初始化审计表
    pub async fn ensure_schema(&self) -> ConsumerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id UUID PRIMARY KEY,
                user_id VARCHAR NOT NULL,
                action VARCHAR NOT NULL,
                entity_type VARCHAR NOT NULL,
                entity_id VARCHAR NOT NULL,
                details TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_user_id ON audit_logs (user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_entity_id ON audit_logs (entity_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs (created_at)",
        )
        .execute(&self.pool)
        .await?;

        debug!("审计表初始化完成");
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, record: &AuditRecord) -> ConsumerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(record.action.as_str())
        .bind(record.entity_type.as_str())
        .bind(&record.entity_id)
        .bind(&record.details)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(
            audit_id = %record.id,
            action = record.action.as_str(),
            entity_id = %record.entity_id,
            "审计记录已写入"
        );
        Ok(())
    }

    async fn find_recent(&self, filter: &AuditFilter) -> ConsumerResult<Vec<AuditRecord>> {
        let mut builder = sqlx::QueryBuilder::new(
            "SELECT id, user_id, action, entity_type, entity_id, details, created_at \
             FROM audit_logs WHERE 1=1",
        );

        if let Some(user_id) = &filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(entity_type) = filter.entity_type {
            builder.push(" AND entity_type = ").push_bind(entity_type.as_str());
        }
        if let Some(entity_id) = &filter.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(AuditRecord {
                id: row.try_get::<Uuid, _>("id")?,
                user_id: row.try_get("user_id")?,
                action: AuditAction::parse(&row.try_get::<String, _>("action")?),
                entity_type: EntityType::parse(&row.try_get::<String, _>("entity_type")?),
                entity_id: row.try_get("entity_id")?,
                details: row.try_get("details")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(records)
    }
}
