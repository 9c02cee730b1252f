use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::TenantBranding;
use crate::core::{DocumentError, DocumentResult};

#[async_trait]
pub trait BrandingStore: Send + Sync {
    async fn load(&self, tenant_id: &str) -> DocumentResult<Option<TenantBranding>>;

    async fn save(&self, tenant_id: &str, branding: &TenantBranding) -> DocumentResult<()>;
}

#[derive(Default)]
pub struct MemoryBrandingStore {
    profiles: RwLock<HashMap<String, TenantBranding>>,
}

impl MemoryBrandingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrandingStore for MemoryBrandingStore {
    async fn load(&self, tenant_id: &str) -> DocumentResult<Option<TenantBranding>> {
        Ok(self.profiles.read().await.get(tenant_id).cloned())
    }

    async fn save(&self, tenant_id: &str, branding: &TenantBranding) -> DocumentResult<()> {
        self.profiles
            .write()
            .await
            .insert(tenant_id.to_string(), branding.clone());
        Ok(())
    }
}

/// Perfiles de marca guardados como JSON en la tabla `branding_profiles`
pub struct SqliteBrandingStore {
    pool: SqlitePool,
}

impl SqliteBrandingStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteBrandingStore { pool }
    }
}

#[async_trait]
impl BrandingStore for SqliteBrandingStore {
    async fn load(&self, tenant_id: &str) -> DocumentResult<Option<TenantBranding>> {
        let row = sqlx::query("SELECT profile FROM branding_profiles WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("profile")?;
                let branding = serde_json::from_str(&raw).map_err(|e| {
                    DocumentError::Storage(format!("corrupt branding profile for {}: {}", tenant_id, e))
                })?;
                Ok(Some(branding))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, tenant_id: &str, branding: &TenantBranding) -> DocumentResult<()> {
        let profile = serde_json::to_string(branding).map_err(DocumentError::storage)?;

        sqlx::query(
            r#"
            INSERT INTO branding_profiles (tenant_id, profile, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(tenant_id) DO UPDATE SET
                profile = excluded.profile,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(profile)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
