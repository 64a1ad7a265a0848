use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

#[derive(Clone, Debug, PartialEq)]
pub struct Campaign {
    pub campaign_id: CampaignId,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A campaign that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCampaign {
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
        Ok(Campaign {
            campaign_id: row.get("campaign_id")?,
            name: row.get("name")?,
            due_date: row.get("due_date")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}
