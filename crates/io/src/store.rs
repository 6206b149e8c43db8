// Collection state persisted in a single SQLite file

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use inventa_recon::{
    Asset, AssetKey, CaptureMethod, Catalog, CatalogMeta, Collection, EngineConfig, Ledger,
    RecordOutcome, VerificationRecord,
};

use crate::error::IoError;
use crate::STORE_SCHEMA_VERSION;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    position INTEGER PRIMARY KEY,     -- import order
    asset_key TEXT NOT NULL UNIQUE,   -- "{code}-{row_index}"
    id TEXT NOT NULL,                 -- same as asset_key
    nome TEXT NOT NULL,
    ambiente TEXT                     -- NULL = no location
);

CREATE TABLE IF NOT EXISTS verifications (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id TEXT NOT NULL,
    nome TEXT NOT NULL,
    ambiente TEXT NOT NULL,
    data_hora TEXT NOT NULL,          -- RFC 3339, UTC
    tipo_verificacao TEXT NOT NULL,   -- camera | manual
    codigo_verificado TEXT NOT NULL,
    observacoes TEXT,
    UNIQUE (asset_id, ambiente)
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const META_SCHEMA_VERSION: &str = "schema_version";
const META_FILE_NAME: &str = "file_name";
const META_IMPORTED_AT: &str = "imported_at";
const META_LOCATIONS: &str = "locations";

/// Durable home of one collection. Every write is a single statement or runs
/// inside a transaction, so a failed write leaves the previous state intact.
///
/// The `UNIQUE (asset_id, ambiente)` constraint makes verify-once hold across
/// processes sharing the file: of two concurrent inserts for a pair, exactly
/// one reports [`RecordOutcome::Recorded`].
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        log::debug!("opened store {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch(SCHEMA)?;
        let store = Self { conn };

        match store.meta(META_SCHEMA_VERSION)? {
            None => store.set_meta(META_SCHEMA_VERSION, &STORE_SCHEMA_VERSION.to_string())?,
            Some(raw) => {
                let version: u32 = raw
                    .parse()
                    .map_err(|_| IoError::Corrupt(format!("bad schema version '{raw}'")))?;
                if version > STORE_SCHEMA_VERSION {
                    return Err(IoError::Corrupt(format!(
                        "store schema version {version} is newer than supported ({STORE_SCHEMA_VERSION})"
                    )));
                }
            }
        }
        Ok(store)
    }

    // -----------------------------------------------------------------------
    // Meta
    // -----------------------------------------------------------------------

    fn meta(&self, key: &str) -> Result<Option<String>, IoError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<(), IoError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Rebuild the persisted collection. Locations fall back to the
    /// configured defaults until they are first saved.
    pub fn load_collection(&self, config: EngineConfig) -> Result<Collection, IoError> {
        let catalog = Catalog::from_assets(self.load_assets()?);
        let meta = self.load_meta()?;
        let ledger = Ledger::from_records(self.load_records()?);
        let locations = match self.meta(META_LOCATIONS)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| IoError::Corrupt(format!("bad locations list: {e}")))?,
            None => config.locations.iter().map(|l| l.trim().to_string()).collect(),
        };
        log::debug!(
            "loaded collection: {} asset(s), {} verification(s)",
            catalog.len(),
            ledger.len()
        );
        Ok(Collection::from_parts(config, catalog, meta, ledger, locations))
    }

    fn load_assets(&self) -> Result<Vec<Asset>, IoError> {
        let mut stmt = self
            .conn
            .prepare("SELECT asset_key, id, nome, ambiente FROM assets ORDER BY position")?;
        let assets = stmt
            .query_map([], |row| {
                Ok(Asset {
                    key: AssetKey::from_raw(row.get::<_, String>(0)?),
                    id: row.get(1)?,
                    nome: row.get(2)?,
                    ambiente: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    fn load_meta(&self) -> Result<Option<CatalogMeta>, IoError> {
        let (Some(file_name), Some(imported_at)) =
            (self.meta(META_FILE_NAME)?, self.meta(META_IMPORTED_AT)?)
        else {
            return Ok(None);
        };
        Ok(Some(CatalogMeta {
            file_name,
            imported_at: parse_timestamp(&imported_at)?,
        }))
    }

    fn load_records(&self) -> Result<Vec<VerificationRecord>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT asset_id, nome, ambiente, data_hora, tipo_verificacao, codigo_verificado, observacoes
             FROM verifications ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(asset_id, nome, ambiente, data_hora, method, codigo_verificado, observacoes)| {
                    Ok(VerificationRecord {
                        asset_id,
                        nome,
                        ambiente,
                        data_hora: parse_timestamp(&data_hora)?,
                        tipo_verificacao: method.parse::<CaptureMethod>().map_err(IoError::Corrupt)?,
                        codigo_verificado,
                        observacoes,
                    })
                },
            )
            .collect()
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    /// Replace the stored catalog and its import metadata. Verifications are
    /// left untouched.
    pub fn replace_catalog(&mut self, catalog: &Catalog, meta: &CatalogMeta) -> Result<(), IoError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM assets", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO assets (position, asset_key, id, nome, ambiente) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, asset) in catalog.assets().iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    asset.key.as_str(),
                    asset.id,
                    asset.nome,
                    asset.ambiente,
                ])?;
            }
        }
        for (key, value) in [
            (META_FILE_NAME, meta.file_name.clone()),
            (META_IMPORTED_AT, meta.imported_at.to_rfc3339()),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        log::debug!("stored catalog of {} asset(s)", catalog.len());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Verifications
    // -----------------------------------------------------------------------

    /// Persist a record unless its `(asset_id, ambiente)` pair is already
    /// stored. The check and the insert are one statement.
    pub fn insert_verification(&self, record: &VerificationRecord) -> Result<RecordOutcome, IoError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO verifications
                (asset_id, nome, ambiente, data_hora, tipo_verificacao, codigo_verificado, observacoes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.asset_id,
                record.nome,
                record.ambiente,
                record.data_hora.to_rfc3339(),
                record.tipo_verificacao.to_string(),
                record.codigo_verificado,
                record.observacoes,
            ],
        )?;
        Ok(if changed == 0 {
            RecordOutcome::AlreadyRecorded
        } else {
            RecordOutcome::Recorded
        })
    }

    /// Returns whether a record was removed.
    pub fn delete_verification(&self, asset_id: &str, ambiente: &str) -> Result<bool, IoError> {
        let changed = self.conn.execute(
            "DELETE FROM verifications WHERE asset_id = ?1 AND ambiente = ?2",
            params![asset_id, ambiente],
        )?;
        Ok(changed > 0)
    }

    // -----------------------------------------------------------------------
    // Locations + Clear
    // -----------------------------------------------------------------------

    pub fn save_locations(&self, locations: &[String]) -> Result<(), IoError> {
        self.set_meta(META_LOCATIONS, &serde_json::to_string(locations)?)
    }

    /// Refile every verification under `from` to `to` and store the new
    /// registry, all in one transaction. Where the asset is already verified
    /// under `to`, that record stays and the `from` one is dropped. Returns
    /// the number of records moved.
    ///
    /// Works on the rows as stored, so verifications written by another
    /// process after this one loaded its collection move along too.
    pub fn rename_location(
        &mut self,
        from: &str,
        to: &str,
        locations: &[String],
    ) -> Result<usize, IoError> {
        let registry = serde_json::to_string(locations)?;
        let tx = self.conn.transaction()?;
        let mut moved = 0;
        if from != to {
            let dropped = tx.execute(
                "DELETE FROM verifications
                 WHERE ambiente = ?1
                   AND asset_id IN (SELECT asset_id FROM verifications WHERE ambiente = ?2)",
                params![from, to],
            )?;
            moved = tx.execute(
                "UPDATE verifications SET ambiente = ?2 WHERE ambiente = ?1",
                params![from, to],
            )?;
            if dropped > 0 {
                log::debug!("rename '{from}' -> '{to}': {dropped} verification(s) already under '{to}'");
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![META_LOCATIONS, registry],
        )?;
        tx.commit()?;
        Ok(moved)
    }

    /// Delete every verification under `name` and store the new registry in
    /// one transaction. Returns the number of records deleted.
    pub fn remove_location(&mut self, name: &str, locations: &[String]) -> Result<usize, IoError> {
        let registry = serde_json::to_string(locations)?;
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM verifications WHERE ambiente = ?1", [name])?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![META_LOCATIONS, registry],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Drop catalog, import metadata and every verification. Locations and
    /// the schema version survive.
    pub fn clear_collection(&mut self) -> Result<(), IoError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM assets", [])?;
        tx.execute("DELETE FROM verifications", [])?;
        tx.execute(
            "DELETE FROM meta WHERE key IN (?1, ?2)",
            params![META_FILE_NAME, META_IMPORTED_AT],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IoError::Corrupt(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use inventa_recon::{RawRow, ScanOutcome};
    use tempfile::tempdir;

    fn rows() -> Vec<RawRow> {
        vec![
            RawRow::new("Numero", "Nome"),
            RawRow::new("100", "Cadeira"),
            RawRow::new("200", "Mesa"),
            RawRow::new("", "Sem codigo"),
            RawRow::new("300", ""),
        ]
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    fn imported(store: &mut Store) -> Collection {
        let mut collection = store.load_collection(EngineConfig::default()).unwrap();
        collection.import(&rows(), "lista.csv", at(0));
        let meta = collection.meta().cloned().unwrap();
        store.replace_catalog(collection.catalog(), &meta).unwrap();
        collection
    }

    fn recorded(outcome: ScanOutcome) -> VerificationRecord {
        match outcome {
            ScanOutcome::Recorded { record, .. } => record,
            other => panic!("expected a new record, got {other:?}"),
        }
    }

    #[test]
    fn fresh_store_uses_configured_locations() {
        let store = Store::open_in_memory().unwrap();
        let collection = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(collection.locations(), ["Sala 01", "Sala 02", "Sala 03", "Sala 04"]);
        assert!(collection.catalog().is_empty());
        assert!(collection.info().is_none());
    }

    #[test]
    fn catalog_and_ledger_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventa.db");

        {
            let mut store = Store::open(&path).unwrap();
            let mut collection = imported(&mut store);
            let record = recorded(collection.scan(
                "100",
                "Sala 01",
                CaptureMethod::Manual,
                Some(" etiqueta gasta "),
                at(5),
            ));
            assert_eq!(store.insert_verification(&record).unwrap(), RecordOutcome::Recorded);
        }

        let store = Store::open(&path).unwrap();
        let collection = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(collection.catalog().len(), 3);
        assert_eq!(collection.catalog().assets()[2].nome, "Ativo 300");
        let info = collection.info().unwrap();
        assert_eq!(info.file_name, "lista.csv");
        assert_eq!(info.imported_at, at(0));

        let record = collection.ledger().get("100-1", "Sala 01").unwrap();
        assert_eq!(record.data_hora, at(5));
        assert_eq!(record.tipo_verificacao, CaptureMethod::Manual);
        assert_eq!(record.observacoes.as_deref(), Some("etiqueta gasta"));
    }

    #[test]
    fn duplicate_insert_reports_already_recorded() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        let record = recorded(collection.scan("200", "Sala 02", CaptureMethod::Camera, None, at(1)));

        assert_eq!(store.insert_verification(&record).unwrap(), RecordOutcome::Recorded);
        assert_eq!(
            store.insert_verification(&record).unwrap(),
            RecordOutcome::AlreadyRecorded
        );

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(reloaded.ledger().len(), 1);
    }

    #[test]
    fn second_handle_sees_the_same_pair_as_taken() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventa.db");
        let mut first = Store::open(&path).unwrap();
        let second = Store::open(&path).unwrap();

        let mut collection = imported(&mut first);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(2)));

        assert_eq!(first.insert_verification(&record).unwrap(), RecordOutcome::Recorded);
        assert_eq!(
            second.insert_verification(&record).unwrap(),
            RecordOutcome::AlreadyRecorded
        );
    }

    #[test]
    fn delete_verification_reports_removal() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(1)));
        store.insert_verification(&record).unwrap();

        assert!(!store.delete_verification("100", "Sala 01").unwrap());
        assert!(store.delete_verification("100-1", "Sala 01").unwrap());
        assert!(!store.delete_verification("100-1", "Sala 01").unwrap());
    }

    #[test]
    fn reimport_keeps_verifications() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(1)));
        store.insert_verification(&record).unwrap();

        collection.import(
            &[RawRow::new("Numero", "Nome"), RawRow::new("900", "Armario")],
            "nova.csv",
            at(30),
        );
        let meta = collection.meta().cloned().unwrap();
        store.replace_catalog(collection.catalog(), &meta).unwrap();

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(reloaded.catalog().len(), 1);
        assert_eq!(reloaded.info().unwrap().file_name, "nova.csv");
        assert_eq!(reloaded.ledger().len(), 1);
    }

    #[test]
    fn location_changes_persist() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(1)));
        store.insert_verification(&record).unwrap();

        collection.add_location("Almoxarifado").unwrap();
        assert_eq!(collection.rename_location("Sala 01", "Recepcao").unwrap(), 1);
        let moved = store
            .rename_location("Sala 01", "Recepcao", collection.locations())
            .unwrap();
        assert_eq!(moved, 1);

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(
            reloaded.locations(),
            ["Recepcao", "Sala 02", "Sala 03", "Sala 04", "Almoxarifado"]
        );
        assert!(reloaded.ledger().contains("100-1", "Recepcao"));
        assert!(!reloaded.ledger().contains("100-1", "Sala 01"));
    }

    #[test]
    fn rename_keeps_records_written_by_another_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventa.db");
        let mut first = Store::open(&path).unwrap();
        let mut collection = imported(&mut first);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(1)));
        first.insert_verification(&record).unwrap();

        // Written after `collection` was loaded, so it is not in its ledger.
        {
            let second = Store::open(&path).unwrap();
            let mut other = second.load_collection(EngineConfig::default()).unwrap();
            let late = recorded(other.scan("200", "Sala 01", CaptureMethod::Manual, None, at(2)));
            let elsewhere = recorded(other.scan("300", "Sala 02", CaptureMethod::Manual, None, at(3)));
            second.insert_verification(&late).unwrap();
            second.insert_verification(&elsewhere).unwrap();
        }

        collection.rename_location("Sala 01", "Recepcao").unwrap();
        let moved = first
            .rename_location("Sala 01", "Recepcao", collection.locations())
            .unwrap();
        assert_eq!(moved, 2);

        let reloaded = first.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(reloaded.ledger().len(), 3);
        assert!(reloaded.ledger().contains("100-1", "Recepcao"));
        assert!(reloaded.ledger().contains("200-2", "Recepcao"));
        assert!(reloaded.ledger().contains("300-4", "Sala 02"));
    }

    #[test]
    fn rename_into_occupied_location_drops_colliding_pairs() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        for (code, ambiente, minute) in [("100", "Sala 01", 1), ("200", "Sala 01", 2), ("200", "Sala 02", 3)] {
            let record = recorded(collection.scan(code, ambiente, CaptureMethod::Camera, None, at(minute)));
            store.insert_verification(&record).unwrap();
        }

        let locations = ["Sala 02".to_string()];
        assert_eq!(store.rename_location("Sala 01", "Sala 02", &locations).unwrap(), 1);

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(reloaded.ledger().len(), 2);
        assert_eq!(reloaded.ledger().get("200-2", "Sala 02").unwrap().data_hora, at(3));
        assert!(reloaded.ledger().contains("100-1", "Sala 02"));

        // Renaming onto itself only rewrites the registry.
        assert_eq!(store.rename_location("Sala 02", "Sala 02", &locations).unwrap(), 0);
        assert_eq!(store.load_collection(EngineConfig::default()).unwrap().ledger().len(), 2);
    }

    #[test]
    fn remove_location_deletes_only_its_records() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        for (code, ambiente) in [("100", "Sala 01"), ("200", "Sala 01"), ("100", "Sala 02")] {
            let record = recorded(collection.scan(code, ambiente, CaptureMethod::Camera, None, at(1)));
            store.insert_verification(&record).unwrap();
        }

        assert_eq!(collection.remove_location("Sala 01").unwrap(), 2);
        assert_eq!(store.remove_location("Sala 01", collection.locations()).unwrap(), 2);

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert_eq!(reloaded.locations(), ["Sala 02", "Sala 03", "Sala 04"]);
        assert_eq!(reloaded.ledger().len(), 1);
        assert!(reloaded.ledger().contains("100-1", "Sala 02"));
    }

    #[test]
    fn clear_keeps_locations() {
        let mut store = Store::open_in_memory().unwrap();
        let mut collection = imported(&mut store);
        let record = recorded(collection.scan("100", "Sala 01", CaptureMethod::Camera, None, at(1)));
        store.insert_verification(&record).unwrap();
        store.save_locations(&["Deposito".to_string()]).unwrap();

        store.clear_collection().unwrap();

        let reloaded = store.load_collection(EngineConfig::default()).unwrap();
        assert!(reloaded.catalog().is_empty());
        assert!(reloaded.ledger().is_empty());
        assert!(reloaded.info().is_none());
        assert_eq!(reloaded.locations(), ["Deposito"]);
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO verifications
                    (asset_id, nome, ambiente, data_hora, tipo_verificacao, codigo_verificado)
                 VALUES ('100', 'Cadeira', 'Sala 01', 'ontem', 'camera', '100')",
                [],
            )
            .unwrap();

        let err = store.load_collection(EngineConfig::default()).unwrap_err();
        assert!(matches!(err, IoError::Corrupt(_)));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventa.db");
        {
            let store = Store::open(&path).unwrap();
            store.set_meta(META_SCHEMA_VERSION, "99").unwrap();
        }
        assert!(matches!(Store::open(&path), Err(IoError::Corrupt(_))));
    }
}
