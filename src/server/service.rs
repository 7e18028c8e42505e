//! TCP service speaking the JSON-lines protocol.
//!
//! Every accepted connection gets its own task. Requests on one connection
//! are answered in order, each under its own timeout. A `stop` request is
//! answered with `"bye"`, closes that connection and ends the accept loop;
//! connections already open are left to finish on their own.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, warn};

use super::config::LimitsConfig;
use super::protocol::{Operation, Response, TIMEOUT_MESSAGE, non_negative, parse_request};
use crate::{Mediator, Result};

/// Serves a [`Mediator`] to line-oriented JSON clients.
pub struct HuginnService {
    mediator: Arc<Mediator>,
    limits: LimitsConfig,
    shutdown: Arc<Notify>,
}

impl HuginnService {
    /// Create a service with default limits.
    pub fn new(mediator: Arc<Mediator>) -> Self {
        Self {
            mediator,
            limits: LimitsConfig::default(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Override connection and timeout limits.
    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Handle that stops [`serve()`](Self::serve) when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Accept connections until a client sends `stop` or the shutdown
    /// handle is notified.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let clients = Arc::new(Semaphore::new(self.limits.max_concurrent_clients.max(1)));
        let default_timeout = Duration::from_secs(self.limits.request_timeout_secs);
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, max_clients = self.limits.max_concurrent_clients, "accepting connections");
        }

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let mediator = Arc::clone(&self.mediator);
                        let shutdown = Arc::clone(&self.shutdown);
                        let clients = Arc::clone(&clients);
                        tokio::spawn(async move {
                            // Excess clients queue here until a slot frees up.
                            let Ok(_slot) = clients.acquire_owned().await else {
                                return;
                            };
                            debug!(%peer, "client connected");
                            if let Err(e) =
                                serve_connection(stream, &mediator, &shutdown, default_timeout).await
                            {
                                debug!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                },
            }
        }
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    mediator: &Mediator,
    shutdown: &Notify,
    default_timeout: Duration,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (response, stop) = respond(mediator, &line, default_timeout).await;
        let mut out = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        if stop {
            writer.flush().await?;
            shutdown.notify_one();
            break;
        }
    }
    Ok(())
}

/// Answer one request line. The flag is set for `stop`.
pub async fn respond(mediator: &Mediator, line: &str, default_timeout: Duration) -> (Response, bool) {
    let request = match parse_request(line) {
        Ok(request) => request,
        Err((id, e)) => {
            return (Response::failed(id, format!("Error in parsing request: {e}")), false);
        }
    };
    let id = request.id;
    if request.operation == Operation::Stop {
        info!("stop requested by client");
        return (Response::success(id, "bye"), true);
    }

    let timeout = match request.timeout.map(|t| non_negative("timeout", t)).transpose() {
        Ok(secs) => secs.map_or(default_timeout, Duration::from_secs),
        Err(e) => return (Response::from_error(id, &e), false),
    };

    let name = request.operation.name();
    let response =
        match tokio::time::timeout(timeout, dispatch(mediator, request.operation, timeout)).await {
            Ok(Ok(value)) => Response::success(id, value),
            Ok(Err(e)) => {
                debug!(operation = name, error = %e, "request failed");
                Response::from_error(id, &e)
            }
            Err(_) => {
                warn!(operation = name, timeout_secs = timeout.as_secs(), "request timed out");
                Response::failed(id, TIMEOUT_MESSAGE)
            }
        };
    (response, false)
}

async fn dispatch(mediator: &Mediator, operation: Operation, deadline: Duration) -> Result<Value> {
    let value = match operation {
        Operation::Search { query, limit } => {
            Value::from(mediator.search(&query, count("limit", limit)?).await?)
        }
        Operation::GetPage { page_title } => Value::from(mediator.get_page(&page_title).await?),
        Operation::Zeitgeist { limit } => Value::from(mediator.zeitgeist(count("limit", limit)?)),
        Operation::Trending {
            time_limit_in_seconds,
            max_items,
        } => Value::from(mediator.trending(
            non_negative("timeLimitInSeconds", time_limit_in_seconds)?,
            count("maxItems", max_items)?,
        )),
        Operation::WindowedPeakLoad {
            time_window_in_seconds,
        } => {
            let window = time_window_in_seconds
                .map(|w| non_negative("timeWindowInSeconds", w))
                .transpose()?;
            Value::from(mediator.windowed_peak_load(window))
        }
        Operation::ShortestPath {
            page_title1,
            page_title2,
        } => Value::from(
            mediator
                .shortest_path(&page_title1, &page_title2, deadline)
                .await?,
        ),
        Operation::Stop => Value::from("bye"),
    };
    Ok(value)
}

fn count(name: &str, value: i64) -> Result<usize> {
    Ok(usize::try_from(non_negative(name, value)?).unwrap_or(usize::MAX))
}
