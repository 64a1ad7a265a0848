use actix_web::web;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};

use crate::campaign::db::CampaignStore;
use crate::config::DatabaseConfig;
use crate::error::Error;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS campaign (
        campaign_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        due_date TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS ix_campaign_name ON campaign (name);
    CREATE INDEX IF NOT EXISTS ix_campaign_due_date ON campaign (due_date);
    CREATE INDEX IF NOT EXISTS ix_campaign_created_at ON campaign (created_at);
";

pub type DbPool = Pool<SqliteConnectionManager>;

pub type SqliteCampaignStore = SessionProvider;

pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
}

/// Hands out one pooled connection per unit of work.
#[derive(Clone)]
pub struct SessionProvider {
    pool: DbPool,
}

impl SessionProvider {
    /// Runs `work` on the blocking thread pool against a connection checked
    /// out for the duration of the call. The connection returns to the pool
    /// when the guard drops, on every exit path.
    pub async fn session<F, R>(&self, work: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Connection) -> Result<R, Error> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            work(&mut conn)
        })
        .await?
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    campaigns: SqliteCampaignStore,
}

impl SqliteDatabase {
    /// Opens the connection pool and makes sure the schema exists.
    pub async fn initialize(config: &DatabaseConfig) -> Result<SqliteDatabase, Error> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let busy_timeout_ms = config.busy_timeout_ms;

        let manager = SqliteConnectionManager::file(&config.path)
            .with_flags(flags)
            .with_init(move |conn| {
                conn.execute_batch(&format!("PRAGMA busy_timeout = {};", busy_timeout_ms))?;
                // journal_mode answers with a row, so it cannot go through execute_batch
                let _mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
                Ok(())
            });

        let max_size = config.pool_max_size;
        let pool = web::block(move || Pool::builder().max_size(max_size).build(manager)).await??;

        let sessions = SessionProvider { pool };
        sessions
            .session(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;

        Ok(SqliteDatabase {
            campaigns: sessions,
        })
    }
}

impl Database for SqliteDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }
}

#[cfg(test)]
pub mod test {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::campaign::{Campaign, CampaignId, NewCampaign};

    type Handler<A, R> = Box<dyn Fn(A) -> Result<R, Error> + Send + Sync>;

    pub struct MockCampaignStore {
        pub on_insert_campaign: Handler<NewCampaign, Campaign>,
        pub on_insert_campaigns: Handler<Vec<NewCampaign>, Vec<Campaign>>,
        pub on_fetch_campaigns: Handler<(), Vec<Campaign>>,
        pub on_fetch_campaign_by_id: Handler<CampaignId, Option<Campaign>>,
        pub on_count_campaigns: Handler<(), i64>,
        pub on_update_campaign:
            Handler<(CampaignId, String, Option<DateTime<Utc>>), Option<Campaign>>,
        pub on_delete_campaign: Handler<CampaignId, bool>,
    }

    impl MockCampaignStore {
        pub fn new() -> MockCampaignStore {
            MockCampaignStore {
                on_insert_campaign: Box::new(|_| panic!("unexpected insert_campaign")),
                on_insert_campaigns: Box::new(|_| panic!("unexpected insert_campaigns")),
                on_fetch_campaigns: Box::new(|_| panic!("unexpected fetch_campaigns")),
                on_fetch_campaign_by_id: Box::new(|_| panic!("unexpected fetch_campaign_by_id")),
                on_count_campaigns: Box::new(|_| panic!("unexpected count_campaigns")),
                on_update_campaign: Box::new(|_| panic!("unexpected update_campaign")),
                on_delete_campaign: Box::new(|_| panic!("unexpected delete_campaign")),
            }
        }
    }

    #[async_trait]
    impl CampaignStore for MockCampaignStore {
        async fn insert_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error> {
            (self.on_insert_campaign)(campaign)
        }

        async fn insert_campaigns(
            &self,
            campaigns: Vec<NewCampaign>,
        ) -> Result<Vec<Campaign>, Error> {
            (self.on_insert_campaigns)(campaigns)
        }

        async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_campaigns)(())
        }

        async fn fetch_campaign_by_id(
            &self,
            campaign_id: CampaignId,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_fetch_campaign_by_id)(campaign_id)
        }

        async fn count_campaigns(&self) -> Result<i64, Error> {
            (self.on_count_campaigns)(())
        }

        async fn update_campaign(
            &self,
            campaign_id: CampaignId,
            name: String,
            due_date: Option<DateTime<Utc>>,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_update_campaign)((campaign_id, name, due_date))
        }

        async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
            (self.on_delete_campaign)(campaign_id)
        }
    }

    pub struct MockDatabase {
        pub campaigns: MockCampaignStore,
    }

    impl MockDatabase {
        pub fn new() -> MockDatabase {
            MockDatabase {
                campaigns: MockCampaignStore::new(),
            }
        }
    }

    impl Database for MockDatabase {
        fn campaigns(&self) -> &dyn CampaignStore {
            &self.campaigns
        }
    }
}
