use crate::extract::Tier;
use crate::record::{Field, TransactionRecord};
use rusqlite::{Connection, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct TransactionStore {
    conn: Connection,
}

/// A persisted submission. Unknown fields are stored as NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    pub id: i64,
    pub uid: String,
    pub sentence: String,
    pub normalized_sentence: String,
    pub tier: Option<Tier>,
    pub record: TransactionRecord,
    pub created_at: String,
}

impl TransactionStore {
    /// Open (or create) the SQLite store at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> SqliteResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SqliteResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL UNIQUE,
                sentence TEXT NOT NULL,
                normalized_sentence TEXT NOT NULL,
                tier TEXT NOT NULL,
                service TEXT,
                price TEXT,
                tax TEXT,
                payment_method TEXT,
                billing_address TEXT,
                shipping_address TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_tier ON transactions(tier)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Unique id for a submission: the sentence plus the moment it arrived.
    pub fn generate_uid(sentence: &str, submitted_at: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(sentence.as_bytes());
        hasher.update(submitted_at.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Insert one assembled record and return its row id.
    pub fn insert_transaction(
        &self,
        uid: &str,
        sentence: &str,
        normalized_sentence: &str,
        tier: Tier,
        record: &TransactionRecord,
    ) -> SqliteResult<i64> {
        self.conn.execute(
            "INSERT INTO transactions
                (uid, sentence, normalized_sentence, tier, service, price, tax,
                 payment_method, billing_address, shipping_address)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                uid,
                sentence,
                normalized_sentence,
                tier.as_str(),
                record.service.as_known(),
                record.price.as_known(),
                record.tax.as_known(),
                record.payment_method.as_known(),
                record.billing_address.as_known(),
                record.shipping_address.as_known(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, uid = %uid, tier = %tier, "Transaction stored");
        Ok(id)
    }

    /// Get a transaction by its row id.
    pub fn get_transaction(&self, id: i64) -> SqliteResult<Option<StoredTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uid, sentence, normalized_sentence, tier, service, price, tax,
                    payment_method, billing_address, shipping_address, created_at
             FROM transactions
             WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_transaction(row)?)),
            None => Ok(None),
        }
    }

    /// Most recent transactions first.
    pub fn recent_transactions(&self, limit: usize) -> SqliteResult<Vec<StoredTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uid, sentence, normalized_sentence, tier, service, price, tax,
                    payment_method, billing_address, shipping_address, created_at
             FROM transactions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| Self::row_to_transaction(row))?;
        rows.collect()
    }

    /// Total count and count per extraction tier.
    pub fn get_counts(&self) -> SqliteResult<(usize, usize, usize, usize)> {
        let count = |tier: Option<Tier>| -> SqliteResult<usize> {
            match tier {
                Some(t) => self.conn.query_row(
                    "SELECT COUNT(*) FROM transactions WHERE tier = ?1",
                    params![t.as_str()],
                    |row| row.get(0),
                ),
                None => self
                    .conn
                    .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0)),
            }
        };

        Ok((
            count(None)?,
            count(Some(Tier::Parsed))?,
            count(Some(Tier::Salvaged))?,
            count(Some(Tier::FallbackUsed))?,
        ))
    }

    /// Helper: map a row with the 12-column projection to `StoredTransaction`.
    fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTransaction> {
        let field = |idx: usize| -> rusqlite::Result<Field> {
            Ok(Field::from(row.get::<_, Option<String>>(idx)?))
        };
        let tier: String = row.get(4)?;

        Ok(StoredTransaction {
            id: row.get(0)?,
            uid: row.get(1)?,
            sentence: row.get(2)?,
            normalized_sentence: row.get(3)?,
            tier: Tier::from_str_opt(&tier),
            record: TransactionRecord {
                service: field(5)?,
                price: field(6)?,
                tax: field(7)?,
                payment_method: field(8)?,
                billing_address: field(9)?,
                shipping_address: field(10)?,
            },
            created_at: row.get(11)?,
        })
    }
}
