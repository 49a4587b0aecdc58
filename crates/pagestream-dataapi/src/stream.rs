//! HTTP body streaming with gzip decompression and read timeout.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall
//! detection, but presents a sync reader to the page stream decoder.

use std::io::{self, BufReader, Read};
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::Context;
use std::time::Duration;

use flate2::read::GzDecoder;
use futures_util::StreamExt;
use pagestream_core::FetchError;
use tokio::io::{AsyncRead, ReadBuf};

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Buffer size for the gzip body reader (256KB)
const GZIP_BUF_SIZE: usize = 256 * 1024;

/// Buffered reader over a gzipped HTTP response body
pub type GzipReader = BufReader<GzDecoder<TimeoutReader>>;

/// Map a reqwest error to a [`FetchError`]
pub fn fetch_error(e: &reqwest::Error) -> FetchError {
    FetchError::Http {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Issue the request and wrap the response body: HTTP GET -> gunzip ->
/// buffered sync reader. `read_timeout` of `None` waits forever.
pub fn open_gzip_body(
    request: reqwest::RequestBuilder,
    read_timeout: Option<Duration>,
) -> Result<GzipReader, FetchError> {
    let reader = SHARED_RUNTIME.handle().block_on(async {
        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(&e))?;

        // Convert response body stream to AsyncRead
        let stream = response.bytes_stream();
        let async_reader =
            tokio_util::io::StreamReader::new(stream.map(|result| result.map_err(io::Error::other)));

        Ok::<_, FetchError>(TimeoutReader::new(Box::pin(async_reader), read_timeout))
    })?;

    let gz = GzDecoder::new(reader);
    Ok(BufReader::with_capacity(GZIP_BUF_SIZE, gz))
}

/// Async-to-sync bridge with optional read timeout.
///
/// Wraps an async reader and provides a sync Read interface. With a timeout
/// set, a read that sees no data within the window returns TimedOut.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    timeout: Option<Duration>,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>, timeout: Option<Duration>) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match self.timeout {
                None => read_future.await,
                Some(timeout) => match tokio::time::timeout(timeout, read_future).await {
                    Ok(result) => result,
                    Err(_) => Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "read timeout: no data from content service",
                    )),
                },
            }
        })
    }
}
