//! Lead storage using SQLite
//!
//! The store is the single shared mutable resource of the service. The
//! public contact endpoint, the admin update path and the conversion sync
//! bookkeeping all write through [`LeadStore`]. There is no version column:
//! concurrent updates to the same lead are last-writer-wins.

mod filter;
mod model;
mod schema;

pub use filter::*;
pub use model::*;
pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use tracing::{debug, info};

/// Counts shown on the conversion sync status page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub pending_sync: u64,
    pub already_synced: u64,
    pub total_with_gclid: u64,
}

/// Lead database handle
#[derive(Clone)]
pub struct LeadStore {
    pool: SqlitePool,
}

impl LeadStore {
    /// Connect to the lead database configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_path(&config.paths.db_file, config.database.max_connections).await
    }

    /// Connect to a SQLite file, creating it if needed
    pub async fn connect_path(db_path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect and make sure the schema exists
    pub async fn open(config: &Config) -> Result<Self> {
        let store = Self::connect(config).await?;
        if !store.is_initialized().await? {
            store.init_schema().await?;
        }
        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing lead store schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='leads'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    /// Persist a new submission with status `new` and empty history
    pub async fn insert(&self, new_lead: NewLead) -> Result<Lead> {
        let lead = new_lead.into_lead(Utc::now());
        let a = &lead.attribution;

        sqlx::query(
            r#"
            INSERT INTO leads (
                id, created_at, updated_at,
                name, practice_name, email, phone, website, project_type,
                status, status_history_json, notes, conversion_value, converted_at,
                utm_source, utm_medium, utm_campaign, utm_term, utm_content,
                gclid, fbclid, msclkid, ttclid, li_fat_id,
                landing_page, referrer, user_agent, ip_address,
                gads_conversion_sent, gads_conversion_sent_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.id)
        .bind(db_timestamp(&lead.created_at))
        .bind(db_timestamp(&lead.updated_at))
        .bind(&lead.name)
        .bind(&lead.practice_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.website)
        .bind(&lead.project_type)
        .bind(lead.status.as_str())
        .bind(Option::<String>::None)
        .bind(&lead.notes)
        .bind(lead.conversion_value)
        .bind(Option::<String>::None)
        .bind(&a.utm_source)
        .bind(&a.utm_medium)
        .bind(&a.utm_campaign)
        .bind(&a.utm_term)
        .bind(&a.utm_content)
        .bind(&a.gclid)
        .bind(&a.fbclid)
        .bind(&a.msclkid)
        .bind(&a.ttclid)
        .bind(&a.li_fat_id)
        .bind(&a.landing_page)
        .bind(&a.referrer)
        .bind(&lead.user_agent)
        .bind(&lead.ip_address)
        .bind(false)
        .bind(Option::<String>::None)
        .execute(&self.pool)
        .await?;

        debug!(lead_id = %lead.id, "Inserted lead");
        Ok(lead)
    }

    /// Get a lead by id
    pub async fn get(&self, id: &str) -> Result<Lead> {
        sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::LeadNotFound(id.to_string()))?
            .try_into()
    }

    /// Apply `patch` and stamp `updated_at`, returning the stored record
    pub async fn update(&self, id: &str, patch: &LeadPatch) -> Result<Lead> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE leads SET updated_at = ");
        builder.push_bind(db_timestamp(&Utc::now()));

        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(history) = &patch.status_history {
            builder
                .push(", status_history_json = ")
                .push_bind(serde_json::to_string(history)?);
        }
        if let Some(notes) = &patch.notes {
            builder.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(value) = patch.conversion_value {
            builder.push(", conversion_value = ").push_bind(value);
        }
        if let Some(at) = &patch.converted_at {
            builder.push(", converted_at = ").push_bind(db_timestamp(at));
        }
        if let Some(sent_at) = &patch.conversion_sent_at {
            builder
                .push(", gads_conversion_sent = ")
                .push_bind(sent_at.is_some())
                .push(", gads_conversion_sent_at = ")
                .push_bind(sent_at.as_ref().map(db_timestamp));
        }

        builder.push(" WHERE id = ").push_bind(id.to_string());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::LeadNotFound(id.to_string()));
        }

        self.get(id).await
    }

    /// Matching page of leads plus the total number of matches
    pub async fn query(&self, query: &LeadQuery) -> Result<(Vec<Lead>, u64)> {
        let total = self.count(&query.filters).await?;
        let leads = self.list(query).await?;
        Ok((leads, total))
    }

    /// Matching leads without the total count
    pub async fn list(&self, query: &LeadQuery) -> Result<Vec<Lead>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM leads");
        push_filters(&mut builder, &query.filters);
        push_window(&mut builder, query);

        builder
            .build_query_as::<LeadRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Lead::try_from)
            .collect()
    }

    /// Number of leads matching every filter
    pub async fn count(&self, filters: &[LeadFilter]) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM leads");
        push_filters(&mut builder, filters);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Distinct non-empty campaign sources across all leads
    pub async fn distinct_utm_sources(&self) -> Result<Vec<String>> {
        let sources: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT utm_source FROM leads
            WHERE utm_source IS NOT NULL AND utm_source != ''
            ORDER BY utm_source
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    /// Pending, synced and click-id totals
    pub async fn sync_stats(&self) -> Result<SyncStats> {
        Ok(SyncStats {
            pending_sync: self.count(&LeadFilter::pending_sync()).await?,
            already_synced: self.count(&[LeadFilter::ConversionSent(true)]).await?,
            total_with_gclid: self.count(&[LeadFilter::HasGclid]).await?,
        })
    }

    /// Record a successful conversion upload for every id in `ids`
    pub async fn mark_conversions_sent(&self, ids: &[String], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let stamp = db_timestamp(&at);
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE leads SET gads_conversion_sent = 1");
        builder
            .push(", gads_conversion_sent_at = ")
            .push_bind(stamp.clone())
            .push(", updated_at = ")
            .push_bind(stamp);
        push_filters(&mut builder, &[LeadFilter::Ids(ids.to_vec())]);

        let result = builder.build().execute(&self.pool).await?;
        debug!(count = result.rows_affected(), "Marked conversions as sent");
        Ok(result.rows_affected())
    }
}
