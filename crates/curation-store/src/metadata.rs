//! Metadata registry and node-metadata link management (§3, §4.4). Usage
//! counts are maintained transactionally so invariant 4 (usage_count equals
//! the number of live links) always holds after a commit.

use chrono::Utc;
use curation_core::{CurationResult, MetadataCode, NodeId};
use sqlx::{Sqlite, Transaction};

use crate::error::from_sqlx;
use crate::NodeStore;

impl NodeStore {
    /// Replace a node's entire metadata set with `codes`.
    pub async fn set_metadata(&self, node_id: NodeId, codes: &[MetadataCode]) -> CurationResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let existing: Vec<i64> =
            sqlx::query_scalar("SELECT registry_id FROM node_metadata WHERE node_id = ?")
                .bind(node_id.to_string())
                .fetch_all(&mut *tx)
                .await
                .map_err(from_sqlx)?;

        sqlx::query("DELETE FROM node_metadata WHERE node_id = ?")
            .bind(node_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx)?;
        for registry_id in existing {
            decrement_usage(&mut tx, registry_id).await?;
        }

        for code in codes {
            add_one(&mut tx, node_id, code).await?;
        }
        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    /// Append metadata codes to a node's existing set (upserting the
    /// registry entry for each, incrementing usage counts).
    pub async fn add_metadata(&self, node_id: NodeId, codes: &[MetadataCode]) -> CurationResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        for code in codes {
            add_one(&mut tx, node_id, code).await?;
        }
        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    pub async fn get_registry_entry(
        &self,
        metadata_type: curation_core::MetadataType,
        code: &str,
    ) -> CurationResult<Option<curation_core::MetadataRegistryEntry>> {
        let row = sqlx::query_as::<_, crate::model::RegistryRow>(
            "SELECT * FROM metadata_code_registry WHERE type = ? AND code = ?",
        )
        .bind(metadata_type.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(row.map(crate::model::RegistryRow::into_entry))
    }
}

/// Insert a (node, registry-entry) link, creating the registry entry on
/// first reference and bumping its usage count. Idempotent: re-adding the
/// same (node, code) pair is a no-op rather than a duplicate-key error.
pub(crate) async fn add_one(
    tx: &mut Transaction<'_, Sqlite>,
    node_id: NodeId,
    code: &MetadataCode,
) -> CurationResult<()> {
    let normalized = MetadataCode::normalize_code(&code.code);
    let now = Utc::now().to_rfc3339();

    let registry_id: i64 = sqlx::query_scalar(
        "SELECT id FROM metadata_code_registry WHERE type = ? AND code = ?",
    )
    .bind(code.metadata_type.as_str())
    .bind(&normalized)
    .fetch_optional(&mut **tx)
    .await
    .map_err(from_sqlx)?
    .unwrap_or({
        sqlx::query_scalar(
            r#"
            INSERT INTO metadata_code_registry (type, code, display_name, usage_count, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(code.metadata_type.as_str())
        .bind(&normalized)
        .bind(&normalized)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut **tx)
        .await
        .map_err(from_sqlx)?
    });

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO node_metadata (node_id, registry_id, confidence, source, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(node_id.to_string())
    .bind(registry_id)
    .bind(code.confidence.clamp(0.0, 1.0))
    .bind(&code.source)
    .bind(&now)
    .execute(&mut **tx)
    .await
    .map_err(from_sqlx)?;

    if inserted.rows_affected() > 0 {
        sqlx::query(
            "UPDATE metadata_code_registry SET usage_count = usage_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(registry_id)
        .execute(&mut **tx)
        .await
        .map_err(from_sqlx)?;
    }

    Ok(())
}

pub(crate) async fn decrement_usage(
    tx: &mut Transaction<'_, Sqlite>,
    registry_id: i64,
) -> CurationResult<()> {
    sqlx::query(
        "UPDATE metadata_code_registry SET usage_count = MAX(usage_count - 1, 0), updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(registry_id)
    .execute(&mut **tx)
    .await
    .map_err(from_sqlx)?;
    Ok(())
}
