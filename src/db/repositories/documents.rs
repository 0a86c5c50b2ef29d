use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_body, parse_datetime},
    Database,
};

/// One stored record of a named collection.
#[derive(Debug, Clone)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub body: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

fn row_to_document(row: &Row) -> Result<Document> {
    let body: String = row.get("body")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Document {
        collection: row.get("collection")?,
        id: row.get("id")?,
        body: parse_body(&body, "body")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Insert or replace the document stored under `(collection, id)`.
    pub async fn upsert_document(
        &self,
        collection: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        let body = serde_json::to_string(body).context("failed to serialize document")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET
                     body = excluded.body,
                     updated_at = excluded.updated_at",
                params![collection, id, body, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to upsert document")?;
            Ok(())
        })
        .await
    }

    /// Remove a document. Deleting a missing id is not an error.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .with_context(|| "failed to delete document")?;
            Ok(())
        })
        .await
    }

    pub async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let collection = collection.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT collection, id, body, updated_at
                 FROM documents
                 WHERE collection = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![collection])?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                // An unreadable row must not hide the rest of the collection.
                match row_to_document(row) {
                    Ok(document) => documents.push(document),
                    Err(err) => warn!("Skipping unreadable {collection} document: {err:#}"),
                }
            }

            Ok(documents)
        })
        .await
    }
}
