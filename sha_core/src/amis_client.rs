//! This client fetches availability images and hall information from the AMIS calendar widget.

use std::{fmt, time::Duration};

use reqwest::Response;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{
    config::Config,
    error::FetchError,
    weekday::{DateKey, HallId},
};

static ACTION_SCHEMA: &str = "objschema";
static ACTION_INFO: &str = "objinfo";
static PERIOD: &str = "0";

/// The object an image is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectId {
    Hall(HallId),
    Header,
    Footer,
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Hall(hall_id) => write!(f, "{hall_id}"),
            ObjectId::Header => f.write_str("header"),
            ObjectId::Footer => f.write_str("footer"),
        }
    }
}

/// Where images and hall pages come from.
#[allow(async_fn_in_trait)]
pub trait AvailabilitySource {
    /// Get the raw schema image for an object, for one date or undated.
    async fn fetch_schema(
        &self,
        object: ObjectId,
        date: Option<DateKey>,
    ) -> Result<Vec<u8>, FetchError>;

    /// Get the HTML info page of a hall.
    async fn fetch_hall_info(&self, hall_id: HallId) -> Result<String, FetchError>;
}

/// The HTTP client for the AMIS endpoint.
#[derive(Debug, Clone)]
pub struct AmisClient {
    client: reqwest::Client,
    base_url: String,
}

impl AmisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: String::from(base_url),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.base_url, config.request_timeout())
    }

    /// Send a GET request and turn transport errors and error statuses into a [`FetchError`].
    async fn get_response(
        &self,
        object: &ObjectId,
        query: &[(&str, String)],
    ) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                object: object.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                object: object.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl AvailabilitySource for AmisClient {
    async fn fetch_schema(
        &self,
        object: ObjectId,
        date: Option<DateKey>,
    ) -> Result<Vec<u8>, FetchError> {
        let query = [
            ("action", String::from(ACTION_SCHEMA)),
            ("obj_id", object.to_string()),
            ("date", date.map(|date| date.to_string()).unwrap_or_default()),
            ("period", String::from(PERIOD)),
        ];
        let response = self.get_response(&object, &query).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                object: object.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }

    async fn fetch_hall_info(&self, hall_id: HallId) -> Result<String, FetchError> {
        let object = ObjectId::Hall(hall_id);
        let query = [
            ("action", String::from(ACTION_INFO)),
            ("obj_id", object.to_string()),
        ];
        let response = self.get_response(&object, &query).await?;
        response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                object: object.to_string(),
                source,
            })
    }
}

/// Get the availability image of a hall for one date.
///
/// The body is returned as is, it is not checked to be an image.
pub async fn fetch<S: AvailabilitySource>(
    source: &S,
    hall_id: HallId,
    date: DateKey,
) -> Result<Vec<u8>, FetchError> {
    source.fetch_schema(ObjectId::Hall(hall_id), Some(date)).await
}

/// Get the display name of a hall, falling back to `Hall_{id}`.
pub async fn resolve_hall_name<S: AvailabilitySource>(source: &S, hall_id: HallId) -> String {
    match source.fetch_hall_info(hall_id).await {
        Ok(html) => parse_hall_name(&html).unwrap_or_else(|| {
            debug!(hall_id, "no hall name in info page");
            fallback_hall_name(hall_id)
        }),
        Err(err) => {
            debug!(hall_id, error = %err, "hall info request failed");
            fallback_hall_name(hall_id)
        }
    }
}

pub fn fallback_hall_name(hall_id: HallId) -> String {
    format!("Hall_{hall_id}")
}

/// Extract the emphasized text of the first `<address>` element.
fn parse_hall_name(html: &str) -> Option<String> {
    let dom = Html::parse_document(html);
    let address_selector = Selector::parse("address").ok()?;
    let strong_selector = Selector::parse("strong").ok()?;
    let address = dom.select(&address_selector).next()?;
    let strong = address.select(&strong_selector).next()?;
    let name = strong.text().collect::<String>();
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(String::from(name))
}
