use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::database::Database;
use crate::error::Error;

use super::{manager, Campaign, CampaignId};

/// Wraps every successful payload as `{"data": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Envelope<T> {
        Envelope { data }
    }
}

/// Accepted by both create and update; update replaces both fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignBody {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Reads a timestamp with an offset, or a bare date-time or date taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let naive = value
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            let date = value.parse::<NaiveDate>().ok()?;
            date.and_hms_opt(0, 0, 0)
        })?;

    Some(Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;

    value
        .map(|value| {
            parse_timestamp(&value).ok_or_else(|| {
                D::Error::custom(format!(
                    "invalid datetime `{}`, expected an ISO 8601 date or date-time",
                    value
                ))
            })
        })
        .transpose()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignBody {
    pub campaign_id: CampaignId,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign) -> CampaignBody {
        CampaignBody {
            campaign_id: campaign.campaign_id,
            name: campaign.name,
            due_date: campaign.due_date,
            created_at: campaign.created_at,
        }
    }
}

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Hellow world" }))
}

#[post("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn create_campaign(
    db: Data<Box<dyn Database>>,
    body: Json<CreateCampaignBody>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let campaign = manager::create_campaign(&***db, body.name, body.due_date).await?;

    Ok(HttpResponse::Created().json(Envelope::new(CampaignBody::render(campaign))))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaigns(
    db: Data<Box<dyn Database>>,
) -> Result<Json<Envelope<Vec<CampaignBody>>>, Error> {
    let campaigns = manager::get_campaigns(&***db).await?;

    let body = campaigns.into_iter().map(CampaignBody::render).collect();

    Ok(Json(Envelope::new(body)))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: Data<Box<dyn Database>>,
    params: Path<CampaignId>,
) -> Result<Json<Envelope<CampaignBody>>, Error> {
    let campaign_id = params.into_inner();
    let campaign = manager::get_campaign_by_id(&***db, campaign_id).await?;

    Ok(Json(Envelope::new(CampaignBody::render(campaign))))
}

#[put("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn update_campaign(
    db: Data<Box<dyn Database>>,
    params: Path<CampaignId>,
    body: Json<CreateCampaignBody>,
) -> Result<Json<Envelope<CampaignBody>>, Error> {
    let campaign_id = params.into_inner();
    let body = body.into_inner();
    let campaign =
        manager::update_campaign(&***db, campaign_id, body.name, body.due_date).await?;

    Ok(Json(Envelope::new(CampaignBody::render(campaign))))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn delete_campaign(
    db: Data<Box<dyn Database>>,
    params: Path<CampaignId>,
) -> Result<HttpResponse, Error> {
    let campaign_id = params.into_inner();
    manager::delete_campaign(&***db, campaign_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
