//! [`SqliteStore`], the SQLite implementation of [`FormStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;

use formfill_core::{
  mapping::{InvertedMapping, Mapping, MappingKey, PutOutcome, Versioned},
  profile::ProfileRecord,
  store::FormStore,
};

use crate::{
  Result,
  encode::{
    INVERTED_COLUMNS, MAPPING_COLUMNS, PROFILE_COLUMNS, RawInverted, RawMapping, RawProfile,
    decode_dt, encode_dt, encode_fields, encode_flat, encode_owner, fold,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A formfill store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count(&self, table: &'static str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn query_profiles(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<ProfileRecord>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_record).collect()
  }

  async fn query_mappings(&self, sql: String, limit: Option<i64>) -> Result<Vec<Mapping>> {
    let raws: Vec<RawMapping> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match limit {
          Some(limit) => stmt.query_map([limit], RawMapping::from_row)?,
          None => stmt.query_map([], RawMapping::from_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMapping::into_mapping).collect()
  }
}

// ─── FormStore impl ──────────────────────────────────────────────────────────

impl FormStore for SqliteStore {
  type Error = crate::Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(&self, record: ProfileRecord) -> Result<ProfileRecord> {
    let email      = record.email.clone();
    let first_name = fold(record.flat.text("firstName").unwrap_or_default());
    let last_name  = fold(record.flat.text("lastName").unwrap_or_default());
    let email_fold = fold(&record.email);
    let flat_json  = encode_flat(&record.flat)?;
    let created_at = encode_dt(record.created_at);
    let updated_at = encode_dt(record.updated_at);

    let stored_created: String = self
      .conn
      .call(move |conn| {
        let created = conn.query_row(
          "INSERT INTO profiles
             (email, first_name_fold, last_name_fold, email_fold, flat_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(email) DO UPDATE SET
             first_name_fold = excluded.first_name_fold,
             last_name_fold  = excluded.last_name_fold,
             email_fold      = excluded.email_fold,
             flat_json       = excluded.flat_json,
             updated_at      = excluded.updated_at
           RETURNING created_at",
          rusqlite::params![
            email, first_name, last_name, email_fold, flat_json, created_at, updated_at
          ],
          |r| r.get(0),
        )?;
        Ok(created)
      })
      .await?;

    debug!(email = %record.email, "profile upserted");
    Ok(ProfileRecord { created_at: decode_dt(&stored_created)?, ..record })
  }

  async fn get_profile(&self, email: String) -> Result<Option<ProfileRecord>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1");
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [email], RawProfile::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_record).transpose()
  }

  async fn search_profiles(&self, text: String, limit: usize) -> Result<Vec<ProfileRecord>> {
    let sql = format!(
      "SELECT {PROFILE_COLUMNS} FROM profiles
       WHERE instr(first_name_fold, ?1) > 0
          OR instr(last_name_fold,  ?1) > 0
          OR instr(email_fold,      ?1) > 0
       ORDER BY updated_at DESC, email
       LIMIT ?2"
    );
    self
      .query_profiles(sql, vec![fold(&text).into(), (limit as i64).into()])
      .await
  }

  async fn delete_profile(&self, email: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM profiles WHERE email = ?1", [email])?))
      .await?;
    Ok(removed > 0)
  }

  async fn count_profiles(&self) -> Result<u64> { self.count("profiles").await }

  async fn recent_profiles(&self, limit: usize) -> Result<Vec<ProfileRecord>> {
    let sql = format!(
      "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY updated_at DESC, rowid DESC LIMIT ?1"
    );
    self.query_profiles(sql, vec![(limit as i64).into()]).await
  }

  // ── Mappings ──────────────────────────────────────────────────────────────

  async fn get_mapping(&self, key: MappingKey) -> Result<Option<Versioned<Mapping>>> {
    let sql = format!("SELECT {MAPPING_COLUMNS} FROM mappings WHERE page_id = ?1 AND owner_id = ?2");
    let owner = encode_owner(key.owner_id.as_deref());
    let raw: Option<RawMapping> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![key.page_id, owner], RawMapping::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMapping::into_versioned).transpose()
  }

  async fn put_mapping(&self, mapping: Mapping, expected: Option<u64>) -> Result<PutOutcome> {
    let MappingKey { page_id, owner_id } = mapping.key();
    let owner       = encode_owner(owner_id.as_deref());
    let fields_json = encode_fields(&mapping.fields)?;
    let created_at  = encode_dt(mapping.created_at);
    let updated_at  = encode_dt(mapping.updated_at);

    let written: Option<i64> = self
      .conn
      .call(move |conn| {
        let changed = match expected {
          None => conn.execute(
            "INSERT INTO mappings (page_id, owner_id, fields_json, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)
             ON CONFLICT(page_id, owner_id) DO NOTHING",
            rusqlite::params![page_id, owner, fields_json, created_at, updated_at],
          )?,
          Some(version) => conn.execute(
            "UPDATE mappings
             SET fields_json = ?3, version = version + 1, updated_at = ?4
             WHERE page_id = ?1 AND owner_id = ?2 AND version = ?5",
            rusqlite::params![page_id, owner, fields_json, updated_at, version as i64],
          )?,
        };
        if changed == 0 {
          return Ok(None);
        }
        let version = conn.query_row(
          "SELECT version FROM mappings WHERE page_id = ?1 AND owner_id = ?2",
          rusqlite::params![page_id, owner],
          |r| r.get(0),
        )?;
        Ok(Some(version))
      })
      .await?;

    Ok(match written {
      Some(version) => {
        debug!(page_id = %mapping.page_id, version, "mapping written");
        PutOutcome::Written(Versioned { version: version.max(0) as u64, doc: mapping })
      }
      None => {
        debug!(page_id = %mapping.page_id, ?expected, "mapping version mismatch");
        PutOutcome::Conflict
      }
    })
  }

  async fn delete_mapping(&self, key: MappingKey) -> Result<bool> {
    let owner = encode_owner(key.owner_id.as_deref());
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM mappings WHERE page_id = ?1 AND owner_id = ?2",
          rusqlite::params![key.page_id, owner],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn count_mappings(&self) -> Result<u64> { self.count("mappings").await }

  async fn recent_mappings(&self, limit: usize) -> Result<Vec<Mapping>> {
    let sql = format!(
      "SELECT {MAPPING_COLUMNS} FROM mappings ORDER BY created_at DESC, rowid DESC LIMIT ?1"
    );
    self.query_mappings(sql, Some(limit as i64)).await
  }

  async fn list_mappings(&self) -> Result<Vec<Mapping>> {
    let sql = format!("SELECT {MAPPING_COLUMNS} FROM mappings ORDER BY page_id, owner_id");
    self.query_mappings(sql, None).await
  }

  // ── Inverted mappings ─────────────────────────────────────────────────────

  async fn put_inverted(&self, inverted: InvertedMapping) -> Result<InvertedMapping> {
    let page_id     = inverted.page_id.clone();
    let fields_json = encode_fields(&inverted.fields)?;
    let created_at  = encode_dt(inverted.created_at);
    let updated_at  = encode_dt(inverted.updated_at);

    let stored_created: String = self
      .conn
      .call(move |conn| {
        let created = conn.query_row(
          "INSERT INTO inverted_mappings (page_id, fields_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(page_id) DO UPDATE SET
             fields_json = excluded.fields_json,
             updated_at  = excluded.updated_at
           RETURNING created_at",
          rusqlite::params![page_id, fields_json, created_at, updated_at],
          |r| r.get(0),
        )?;
        Ok(created)
      })
      .await?;

    Ok(InvertedMapping { created_at: decode_dt(&stored_created)?, ..inverted })
  }

  async fn get_inverted(&self, page_id: String) -> Result<Option<InvertedMapping>> {
    let sql = format!("SELECT {INVERTED_COLUMNS} FROM inverted_mappings WHERE page_id = ?1");
    let raw: Option<RawInverted> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [page_id], RawInverted::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInverted::into_inverted).transpose()
  }

  async fn find_inverted_by_host(&self, host: String) -> Result<Option<InvertedMapping>> {
    let sql = format!(
      "SELECT {INVERTED_COLUMNS} FROM inverted_mappings
       WHERE instr(page_id, ?1) > 0
       ORDER BY updated_at DESC, rowid DESC
       LIMIT 1"
    );
    let raw: Option<RawInverted> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [host], RawInverted::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInverted::into_inverted).transpose()
  }

  async fn list_inverted(&self) -> Result<Vec<InvertedMapping>> {
    let sql = format!("SELECT {INVERTED_COLUMNS} FROM inverted_mappings ORDER BY page_id");
    let raws: Vec<RawInverted> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawInverted::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInverted::into_inverted).collect()
  }

  async fn count_inverted(&self) -> Result<u64> { self.count("inverted_mappings").await }
}
