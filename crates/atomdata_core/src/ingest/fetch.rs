//! Page retrieval for text-table sources.
//!
//! # Responsibility
//! - Define the `PageFetcher` seam consumed once per `download`.
//! - Provide a blocking HTTP fetcher that returns the page's preformatted
//!   text block.
//!
//! # Invariants
//! - Returned text contains no non-breaking spaces or HTML tags.
//! - Retry/backoff is not done here; callers decide whether to re-run.

use log::{error, info};
use scraper::{Html, Selector};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("atomdata_core/", env!("CARGO_PKG_VERSION"));

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { url: String, status: u16 },
    MissingPreformatted { url: String },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "http request failed: {err}"),
            Self::Status { url, status } => write!(f, "`{url}` answered with status {status}"),
            Self::MissingPreformatted { url } => {
                write!(f, "`{url}` contains no preformatted text block")
            }
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Status { .. } | Self::MissingPreformatted { .. } => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Retrieves raw table text for a source.
pub trait PageFetcher {
    fn fetch(&self, url: &str, params: &[(String, String)]) -> FetchResult<String>;
}

/// Blocking HTTP fetcher returning the first `<pre>` block of the page.
pub struct HttpPageFetcher {
    http: reqwest::blocking::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str, params: &[(String, String)]) -> FetchResult<String> {
        let started_at = Instant::now();
        info!("event=page_fetch module=ingest status=start url={url}");

        let result = self
            .http
            .get(url)
            .query(params)
            .send()
            .map_err(FetchError::from)
            .and_then(|response| {
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Ok(response.text()?)
            })
            .and_then(|html| {
                extract_preformatted(&html).ok_or_else(|| FetchError::MissingPreformatted {
                    url: url.to_string(),
                })
            });

        match &result {
            Ok(text) => info!(
                "event=page_fetch module=ingest status=ok url={url} bytes={} duration_ms={}",
                text.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=page_fetch module=ingest status=error url={url} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Returns the text of the first `<pre>` element, or `None` when there is none.
///
/// Entities are decoded by the HTML parser; comments and inner tags do not
/// contribute text. Non-breaking spaces become plain spaces.
pub fn extract_preformatted(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("pre").expect("valid pre selector");
    let pre = document.select(&selector).next()?;
    Some(pre.text().collect::<String>().replace('\u{a0}', " "))
}
