//! Data API retrieval client

use std::io::BufRead;
use std::time::Duration;

use pagestream_core::{EndpointConfig, FetchError, PageClient, PagePair, PageService};
use serde::Deserialize;

use crate::stream::{fetch_error, open_gzip_body};

/// Wire delimiter for the volume id list in the request query
const WIRE_DELIMITER: &str = "|";

/// Production [`PageService`] over the content service's HTTP Data API
#[derive(Debug, Default)]
pub struct DataApiService;

impl DataApiService {
    pub fn new() -> Self {
        Self
    }
}

impl PageService for DataApiService {
    type Client = DataApiClient;

    fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Client, FetchError> {
        let mut builder = reqwest::Client::builder();
        if endpoint.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(endpoint.connect_timeout_ms));
        }
        if endpoint.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(|e| fetch_error(&e))?;

        if endpoint.auth_token.is_none() {
            log::debug!("no auth token configured; performing unauthenticated requests");
        }

        Ok(DataApiClient {
            http,
            endpoint: endpoint.clone(),
        })
    }
}

/// HTTP client bound to one endpoint for one work unit
#[derive(Debug)]
pub struct DataApiClient {
    http: reqwest::Client,
    endpoint: EndpointConfig,
}

impl DataApiClient {
    fn open(&self, resource: &str, ids: &[String]) -> Result<PageStream, FetchError> {
        let url = format!("{}{resource}", self.endpoint.address);
        let id_list = ids.join(WIRE_DELIMITER);
        log::debug!("GET {url} volumeIDs='{id_list}'");

        let mut request = self.http.get(&url).query(&[("volumeIDs", id_list)]);
        if let Some(token) = &self.endpoint.auth_token {
            request = request.bearer_auth(token);
        }

        let read_timeout = match self.endpoint.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let reader = open_gzip_body(request, read_timeout)?;
        Ok(PageStream::new(Box::new(reader)))
    }
}

impl PageClient for DataApiClient {
    type Pages = PageStream;

    fn fetch_pages(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError> {
        self.open("volumes/pages", ids)
    }

    fn fetch_volumes(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError> {
        self.open("volumes", ids)
    }

    fn close(self) -> Result<(), FetchError> {
        // Dropping the reqwest client tears down the connection pool
        Ok(())
    }
}

/// One JSON line of the response body
#[derive(Debug, Deserialize)]
struct PageRow {
    #[serde(default)]
    volume_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Lazy page sequence decoded from a JSON-lines body.
///
/// Unparsable lines are skipped with a diagnostic (a few bad rows must not
/// sink the request); only transport errors end the stream early.
pub struct PageStream {
    reader: Box<dyn BufRead + Send>,
    buf: String,
    done: bool,
    parse_errors: usize,
}

impl PageStream {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader,
            buf: String::with_capacity(4096),
            done: false,
            parse_errors: 0,
        }
    }
}

impl Iterator for PageStream {
    type Item = Result<PagePair, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(FetchError::Io(e)));
                }
            }

            let line = self.buf.trim_end();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<PageRow>(line) {
                Ok(row) => {
                    return Some(Ok(PagePair {
                        volume_id: row.volume_id,
                        text: row.text,
                    }));
                }
                Err(e) => {
                    if self.parse_errors < 5 {
                        let preview: String = line.chars().take(80).collect();
                        log::debug!("skipping unparsable page row: {e}  line: {preview}");
                    }
                    self.parse_errors += 1;
                }
            }
        }
        None
    }
}
