use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::{PlannerError, PlannerResult};
use crate::model::{AuctionPage, AuctionRecord};

/// Anything that can hand back one page of the auction feed.
pub trait PageSource {
    fn fetch_page(&self, page: u32) -> PlannerResult<AuctionPage>;
}

pub struct HttpPageSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    delay: Duration,
}

impl HttpPageSource {
    pub fn new(base_url: &str, api_key: Option<String>, delay: Duration) -> PlannerResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("skyblock_planner/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(HttpPageSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            delay,
        })
    }

    fn url(&self) -> String {
        format!("{}/skyblock/auctions", self.base_url)
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, page: u32) -> PlannerResult<AuctionPage> {
        if page > 0 && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let mut req = self.client.get(self.url()).query(&[("page", page)]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let resp = req.send()?;
        let status = resp.status();
        debug!(page, %status, "auction page response");

        // Error pages still carry a JSON body with a `cause`.
        let body = resp.text()?;
        match serde_json::from_str::<AuctionPage>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(PlannerError::Api {
                page,
                cause: format!("HTTP {status}"),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Pulls every page of the feed and concatenates the listings in page order.
///
/// The page count comes from the first response.
pub fn download_snapshot(source: &dyn PageSource) -> PlannerResult<Vec<AuctionRecord>> {
    let first = checked(source.fetch_page(0)?, 0)?;
    let total_pages = first.total_pages.max(1);
    info!("got page 1 of {}", total_pages);

    let mut records = first.auctions;

    for page in 1..total_pages {
        let data = checked(source.fetch_page(page)?, page)?;
        info!("got page {} of {}", page + 1, total_pages);
        records.extend(data.auctions);
    }

    info!(auctions = records.len(), "finished downloading auction data");
    Ok(records)
}

fn checked(page: AuctionPage, number: u32) -> PlannerResult<AuctionPage> {
    if page.success {
        Ok(page)
    } else {
        Err(PlannerError::Api {
            page: number,
            cause: page.cause.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
