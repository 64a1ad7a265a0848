use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::SqliteCampaignStore;
use crate::error::Error;

use super::{Campaign, CampaignId, NewCampaign};

const SELECT_CAMPAIGN: &str = "SELECT campaign_id, name, due_date, created_at FROM campaign";

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error>;

    async fn insert_campaigns(&self, campaigns: Vec<NewCampaign>) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(&self, campaign_id: CampaignId)
        -> Result<Option<Campaign>, Error>;

    async fn count_campaigns(&self) -> Result<i64, Error>;

    async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        name: String,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Campaign>, Error>;

    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error>;
}

fn insert_row(conn: &Connection, campaign: NewCampaign) -> Result<Campaign, Error> {
    conn.execute(
        "INSERT INTO campaign (name, due_date, created_at) VALUES (?1, ?2, ?3)",
        params![campaign.name, campaign.due_date, campaign.created_at],
    )?;

    Ok(Campaign {
        campaign_id: CampaignId::from_raw(conn.last_insert_rowid()),
        name: campaign.name,
        due_date: campaign.due_date,
        created_at: campaign.created_at,
    })
}

fn select_by_id(conn: &Connection, campaign_id: CampaignId) -> Result<Option<Campaign>, Error> {
    let campaign = conn
        .query_row(
            &format!("{} WHERE campaign_id = ?1", SELECT_CAMPAIGN),
            [campaign_id],
            Campaign::from_row,
        )
        .optional()?;

    Ok(campaign)
}

#[async_trait]
impl CampaignStore for SqliteCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Error> {
        self.session(move |conn| {
            let tx = conn.transaction()?;
            let campaign = insert_row(&tx, campaign)?;
            tx.commit()?;

            Ok(campaign)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn insert_campaigns(&self, campaigns: Vec<NewCampaign>) -> Result<Vec<Campaign>, Error> {
        self.session(move |conn| {
            let tx = conn.transaction()?;
            let campaigns = campaigns
                .into_iter()
                .map(|campaign| insert_row(&tx, campaign))
                .collect::<Result<Vec<_>, _>>()?;
            tx.commit()?;

            Ok(campaigns)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        self.session(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY campaign_id", SELECT_CAMPAIGN))?;
            let campaigns = stmt
                .query_map([], Campaign::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(campaigns)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        self.session(move |conn| select_by_id(conn, campaign_id)).await
    }

    #[tracing::instrument(skip(self))]
    async fn count_campaigns(&self) -> Result<i64, Error> {
        self.session(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM campaign", [], |row| row.get(0))?;

            Ok(count)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        name: String,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Campaign>, Error> {
        self.session(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE campaign SET name = ?1, due_date = ?2 WHERE campaign_id = ?3",
                params![name, due_date, campaign_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let campaign = select_by_id(&tx, campaign_id)?;
            tx.commit()?;

            Ok(campaign)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
        self.session(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute("DELETE FROM campaign WHERE campaign_id = ?1", [campaign_id])?;
            tx.commit()?;

            Ok(changed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::{Database, SqliteDatabase};

    fn new_campaign(name: &str) -> NewCampaign {
        NewCampaign {
            name: name.to_string(),
            due_date: None,
            created_at: Utc::now(),
        }
    }

    async fn open(dir: &tempfile::TempDir) -> SqliteDatabase {
        let config = DatabaseConfig {
            path: dir.path().join("test.db").to_string_lossy().into_owned(),
            ..DatabaseConfig::default()
        };

        SqliteDatabase::initialize(&config).await.unwrap()
    }

    #[actix_web::test]
    async fn insert_then_fetch_round_trips_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let mut campaign = new_campaign("Summer Launch");
        campaign.due_date = Some(campaign.created_at + Duration::days(3));
        let inserted = db.campaigns().insert_campaign(campaign.clone()).await.unwrap();

        let fetched = db
            .campaigns()
            .fetch_campaign_by_id(inserted.campaign_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched, inserted);
        assert_eq!(fetched.due_date, campaign.due_date);
        assert_eq!(fetched.created_at, campaign.created_at);
    }

    #[actix_web::test]
    async fn fetch_campaigns_returns_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let inserted = db
            .campaigns()
            .insert_campaigns(vec![new_campaign("a"), new_campaign("b"), new_campaign("c")])
            .await
            .unwrap();
        let fetched = db.campaigns().fetch_campaigns().await.unwrap();

        assert_eq!(fetched, inserted);
        assert_eq!(db.campaigns().count_campaigns().await.unwrap(), 3);
    }

    #[actix_web::test]
    async fn update_leaves_id_and_created_at_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let original = db
            .campaigns()
            .insert_campaign(new_campaign("Old"))
            .await
            .unwrap();
        let due_date = Utc::now();
        let updated = db
            .campaigns()
            .update_campaign(original.campaign_id, "New".into(), Some(due_date))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.campaign_id, original.campaign_id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.name, "New");
        assert_eq!(updated.due_date, Some(due_date));
    }

    #[actix_web::test]
    async fn missing_rows_are_reported_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        let missing = CampaignId::from_raw(99999);

        assert_eq!(db.campaigns().fetch_campaign_by_id(missing).await.unwrap(), None);
        assert_eq!(
            db.campaigns()
                .update_campaign(missing, "New".into(), None)
                .await
                .unwrap(),
            None
        );
        assert!(!db.campaigns().delete_campaign(missing).await.unwrap());
    }

    #[actix_web::test]
    async fn deleted_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let first = db
            .campaigns()
            .insert_campaign(new_campaign("first"))
            .await
            .unwrap();
        assert!(db.campaigns().delete_campaign(first.campaign_id).await.unwrap());

        let second = db
            .campaigns()
            .insert_campaign(new_campaign("second"))
            .await
            .unwrap();

        assert_ne!(second.campaign_id, first.campaign_id);
        assert_eq!(db.campaigns().count_campaigns().await.unwrap(), 1);
    }
}
