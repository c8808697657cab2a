//! Line-delimited transport for JSON-RPC messages.

use crate::error::Result;
use crate::protocol::types::{JsonRpcRequest, JsonRpcResponse, RequestId};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{debug, trace};

/// One decoded input line.
#[derive(Debug)]
pub enum Incoming {
    /// A well-formed request or notification.
    Request(JsonRpcRequest),
    /// Valid JSON that is not a request object. Carries the id when one
    /// could be recovered.
    Invalid {
        id: Option<RequestId>,
        reason: String,
    },
    /// Not JSON at all. No reply is possible.
    Malformed { reason: String },
}

/// Decode one line of input.
pub fn decode_line(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Incoming::Malformed {
                reason: e.to_string(),
            };
        }
    };

    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => Incoming::Request(request),
        Err(e) => Incoming::Invalid {
            id,
            reason: e.to_string(),
        },
    }
}

/// Reads newline-delimited messages and writes one response per line.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// Transport over the process's standard streams.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read and decode the next non-blank line. `None` at end of input.
    ///
    /// A line that is not valid UTF-8 is reported as [`Incoming::Malformed`];
    /// only I/O failures surface as errors.
    pub async fn read_message(&mut self) -> Result<Option<Incoming>> {
        loop {
            let mut buf = Vec::new();
            if self.reader.read_until(b'\n', &mut buf).await? == 0 {
                debug!("EOF on input");
                return Ok(None);
            }
            let line = match String::from_utf8(buf) {
                Ok(line) => line,
                Err(e) => {
                    return Ok(Some(Incoming::Malformed {
                        reason: format!("invalid UTF-8: {}", e.utf8_error()),
                    }));
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            trace!("Received line: {}", line);
            return Ok(Some(decode_line(line)));
        }
    }

    /// Write one response followed by a newline, then flush.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        trace!("Sending line: {}", json);
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
