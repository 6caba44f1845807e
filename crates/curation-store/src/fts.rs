//! Full-text index maintenance. Invariant 3 (§4.4): the FTS index stays
//! consistent with the node row because every call here runs inside the
//! same transaction as the row write it mirrors.

use curation_core::Node;
use sqlx::{Sqlite, Transaction};

use crate::error::from_sqlx;
use curation_core::CurationResult;

pub(crate) async fn upsert(tx: &mut Transaction<'_, Sqlite>, node: &Node) -> CurationResult<()> {
    delete(tx, node.id).await?;
    let key_concepts = node.key_concepts.join(" ");
    sqlx::query(
        r#"
        INSERT INTO nodes_fts
            (node_id, title, short_description, phrase_description, ai_summary, company, source_domain, key_concepts, descriptor)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(node.id.to_string())
    .bind(&node.title)
    .bind(&node.short_description)
    .bind(&node.phrase_description)
    .bind(&node.ai_summary)
    .bind(&node.company)
    .bind(&node.source_domain)
    .bind(key_concepts)
    .bind(&node.descriptor)
    .execute(&mut **tx)
    .await
    .map_err(from_sqlx)?;
    Ok(())
}

pub(crate) async fn delete(
    tx: &mut Transaction<'_, Sqlite>,
    node_id: uuid::Uuid,
) -> CurationResult<()> {
    sqlx::query("DELETE FROM nodes_fts WHERE node_id = ?")
        .bind(node_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(from_sqlx)?;
    Ok(())
}
