use chrono::Utc;
use tracing::info;

use crate::campaign::NewCampaign;
use crate::database::Database;
use crate::error::Error;

const SEED_CAMPAIGNS: [&str; 2] = ["Summer Launch", "Jumat Sale"];

/// Fills an empty campaign table with the default campaigns. Does nothing if
/// any campaign already exists.
pub async fn seed(db: &dyn Database) -> Result<(), Error> {
    let existing = db.campaigns().count_campaigns().await?;
    if existing > 0 {
        info!(existing, "campaigns already present, skipping seed");
        return Ok(());
    }

    let now = Utc::now();
    let campaigns = SEED_CAMPAIGNS
        .iter()
        .map(|name| NewCampaign {
            name: name.to_string(),
            due_date: Some(now),
            created_at: now,
        })
        .collect();

    let seeded = db.campaigns().insert_campaigns(campaigns).await?;
    info!(count = seeded.len(), "seeded default campaigns");

    Ok(())
}
