//! Retrieval client capability interface and the scripted test adapter

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::endpoint::EndpointConfig;

/// Raw record from the content service. Either side may be absent; the
/// emitter drops and logs such records without aborting the sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePair {
    pub volume_id: Option<String>,
    pub text: Option<String>,
}

impl PagePair {
    pub fn new(volume_id: &str, text: &str) -> Self {
        Self {
            volume_id: Some(volume_id.to_string()),
            text: Some(text.to_string()),
        }
    }
}

/// Error from the content service transport
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A connected retrieval client, scoped to one work unit.
///
/// The page sequence is lazy and grouped contiguously by volume id, but not
/// globally sorted. A whole-request failure surfaces as `Err` from the fetch
/// call; the driver treats it as zero results, not a fatal error.
pub trait PageClient {
    type Pages: Iterator<Item = Result<PagePair, FetchError>>;

    /// Fetch per-page text for the given volume ids
    fn fetch_pages(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError>;

    /// Fetch whole-volume text (one record per volume)
    fn fetch_volumes(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError>;

    /// Release the client. Errors here are reported to the driver's caller
    /// only after the unit's output has been emitted.
    fn close(self) -> Result<(), FetchError>;
}

/// Factory for per-endpoint retrieval clients
pub trait PageService {
    type Client: PageClient;

    fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Client, FetchError>;
}

// === Scripted adapter (tests and offline use) ===

/// One scripted response for a `fetch_pages`/`fetch_volumes` call
#[derive(Debug)]
pub enum ScriptedFetch {
    /// Full page sequence
    Pages(Vec<PagePair>),
    /// Whole-request failure signal
    Unavailable(FetchError),
    /// Pages followed by a mid-stream transport error
    Truncated(Vec<PagePair>, FetchError),
}

type RequestLog = Rc<RefCell<Vec<(String, Vec<String>)>>>;

/// Scripted [`PageService`] that replays canned responses in connect order.
///
/// Records every request it sees (endpoint address + ids) so tests can
/// assert on the partitioning the driver produced.
#[derive(Debug, Default)]
pub struct ScriptedService {
    fetches: RefCell<VecDeque<(ScriptedFetch, bool)>>,
    requests: RequestLog,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next connected client
    pub fn push(&self, fetch: ScriptedFetch) {
        self.fetches.borrow_mut().push_back((fetch, false));
    }

    /// Queue a response whose client then fails on `close`
    pub fn push_with_close_error(&self, fetch: ScriptedFetch) {
        self.fetches.borrow_mut().push_back((fetch, true));
    }

    /// Requests seen so far, as (endpoint address, ids)
    pub fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.requests.borrow().clone()
    }
}

impl PageService for ScriptedService {
    type Client = ScriptedClient;

    fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Client, FetchError> {
        let (fetch, close_error) = self
            .fetches
            .borrow_mut()
            .pop_front()
            .unwrap_or((ScriptedFetch::Pages(Vec::new()), false));
        Ok(ScriptedClient {
            address: endpoint.address.clone(),
            fetch: Some(fetch),
            close_error,
            requests: Rc::clone(&self.requests),
        })
    }
}

pub struct ScriptedClient {
    address: String,
    fetch: Option<ScriptedFetch>,
    close_error: bool,
    requests: RequestLog,
}

type ScriptedPages = std::vec::IntoIter<Result<PagePair, FetchError>>;

impl ScriptedClient {
    fn replay(&mut self, ids: &[String]) -> Result<ScriptedPages, FetchError> {
        self.requests
            .borrow_mut()
            .push((self.address.clone(), ids.to_vec()));

        let items: Vec<Result<PagePair, FetchError>> = match self.fetch.take() {
            Some(ScriptedFetch::Pages(pages)) => pages.into_iter().map(Ok).collect(),
            Some(ScriptedFetch::Unavailable(e)) => return Err(e),
            Some(ScriptedFetch::Truncated(pages, e)) => pages
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(e)))
                .collect(),
            None => Vec::new(),
        };
        Ok(items.into_iter())
    }
}

impl PageClient for ScriptedClient {
    type Pages = ScriptedPages;

    fn fetch_pages(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError> {
        self.replay(ids)
    }

    fn fetch_volumes(&mut self, ids: &[String]) -> Result<Self::Pages, FetchError> {
        self.replay(ids)
    }

    fn close(self) -> Result<(), FetchError> {
        if self.close_error {
            Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted close failure",
            )))
        } else {
            Ok(())
        }
    }
}
