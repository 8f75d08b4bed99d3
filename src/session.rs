//! Persistence session (`spec.md` §4.6): a short-lived unit of work that
//! binds the catalog, the file backend, and the API backend, and owns
//! commit ordering and flush.
//!
//! Grounded in the teacher-adjacent shape of `persistence_session.go`
//! (`NewSession`/`FinishSession`), extended with the `shallow` hint
//! `spec.md` §4.6/§9 describes: a session that only touches already-known
//! `(name, type)` pairs can skip the backend round-trip and let the
//! reconciler catch up later.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::backend::api::ApiBackend;
use crate::backend::file::FileBackend;
use crate::catalog::DNSRecord;
use crate::db::records;
use crate::error::ShimikoError;

pub struct Session {
    pool: SqlitePool,
    pub file_backend: FileBackend,
    pub api_backend: ApiBackend,
    pub zone_name: String,
    /// `spec.md` §4.6 "Shallow hint": starts `false`. The caller may flip
    /// it to `true` before mutating, then reset it to `false` the moment
    /// any touched `(name, type)` turns out not to already exist — the
    /// "shallow only applies when every affected pair was already present"
    /// rule from `spec.md` §9.
    pub shallow: bool,
}

impl Session {
    /// `spec.md` §4.6 "Open": loads the current zone file from the first
    /// configured file-backend host and opens an empty API change-batch.
    pub async fn open(
        pool: SqlitePool,
        zone_name: String,
        file_hosts: Vec<String>,
        file_remote_path: String,
        ssh_username: String,
        ssh_password: String,
        api_base_url: String,
        api_zone_id: String,
        api_token: String,
    ) -> Result<Self, ShimikoError> {
        let file_backend =
            FileBackend::load(file_hosts, file_remote_path, ssh_username, ssh_password).await?;
        let mut api_backend = ApiBackend::new(api_base_url, api_zone_id, api_token);
        api_backend.start_batch();

        Ok(Self {
            pool,
            file_backend,
            api_backend,
            zone_name,
            shallow: false,
        })
    }

    /// `spec.md` §4.6 "`DNSRecord.Upsert` semantics": look up the existing
    /// row by id or `(name, type)` including soft-deleted rows, merge in
    /// missing fields, save, then forward to both backends unless the
    /// session is shallow.
    pub async fn upsert(&mut self, record: DNSRecord) -> Result<DNSRecord, ShimikoError> {
        let existing = if record.id != 0 {
            records::get(&self.pool, record.id).await?
        } else {
            records::get_by_name_type_any(&self.pool, &record.name, &record.rtype).await?
        };

        let to_save = match &existing {
            Some(existing) => record.merged_onto(existing),
            None => record,
        };
        let saved = if to_save.id == 0 {
            records::insert(&self.pool, &to_save).await?
        } else {
            records::update(&self.pool, &to_save).await?
        };

        if !self.shallow {
            self.file_backend
                .upsert_record(&saved, existing.as_ref(), &self.zone_name);
            self.api_backend
                .upsert(&self.zone_name, &saved, existing.as_ref())
                .await?;
        }

        Ok(saved)
    }

    /// `spec.md` §4.6 "`DNSRecord.Delete`": look up by id or `(name,
    /// type)`; soft-delete if found and not already gone, then remove from
    /// both backends unless shallow.
    pub async fn delete(&mut self, name: &str, rtype: &str) -> Result<(), ShimikoError> {
        let existing = records::get_by_name_type(&self.pool, name, rtype).await?;
        let Some(existing) = existing else {
            return Ok(());
        };

        records::soft_delete(&self.pool, existing.id).await?;

        if !self.shallow {
            self.file_backend.delete_record(&existing, &self.zone_name);
            self.api_backend.delete(&self.zone_name, &existing).await?;
        }
        Ok(())
    }

    /// Checks whether `(name, type)` is already present, used by the
    /// caller to decide whether the shallow hint still holds (`spec.md`
    /// §4.6 "Shallow hint").
    pub async fn exists_in_db(&self, name: &str, rtype: &str) -> Result<bool, ShimikoError> {
        Ok(records::get_by_name_type_any(&self.pool, name, rtype)
            .await?
            .is_some())
    }

    /// `spec.md` §4.6 "Finish": saves the zone file to every host (bumping
    /// SOA and re-formatting) and flushes the API change-batch. Errors
    /// from both sides are joined and returned as one aggregated error; no
    /// rollback of partial effects is attempted (`spec.md` §4.6, §7
    /// "Aggregated errors").
    ///
    /// A shallow session skips both flushes entirely — a later full
    /// reconcile will carry the catalog's state to both backends.
    pub async fn finish(mut self) -> Result<(), ShimikoError> {
        if self.shallow {
            debug!("shallow session finish: skipping backend flush");
            return Ok(());
        }

        let mut errors = Vec::new();
        if let Err(e) = self.file_backend.save().await {
            warn!(error = %e, "file backend save failed during session finish");
            errors.push(e);
        }
        if let Err(e) = self.api_backend.flush().await {
            warn!(error = %e, "api backend flush failed during session finish");
            errors.push(e);
        }

        match ShimikoError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
