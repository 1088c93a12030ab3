//! git's remote-helper line protocol.
//!
//! See `gitremote-helpers(7)`. Only `capabilities`, `list` and `fetch` are
//! supported; stdout carries nothing but protocol responses.

use crate::{FetchReport, Result};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, RefMap};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, info, warn};

/// Runs a batch of fetches for the bridge.
#[async_trait]
pub trait Fetcher: Send {
    /// Fetches `(object id, ref name)` pairs, returning when all are ingested.
    async fn fetch(&mut self, wanted: Vec<(ObjectId, String)>) -> Result<FetchReport>;
}

/// Where the conversation with git is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Waiting for the next command.
    AwaitingCommand,
    /// Answering `capabilities`.
    Capabilities,
    /// Answering `list`.
    Listing,
    /// Collecting `fetch` lines until a blank line.
    AccumulatingFetch,
    /// Done; the helper exits.
    Terminal,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingCommand => "awaiting command",
            Self::Capabilities => "capabilities",
            Self::Listing => "listing",
            Self::AccumulatingFetch => "accumulating fetch",
            Self::Terminal => "terminal",
        };
        f.write_str(s)
    }
}

/// How the conversation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeExit {
    /// A blank line or end of input with nothing to fetch.
    Done,
    /// A fetch batch ran to completion.
    Fetched(FetchReport),
}

/// Speaks the remote-helper protocol over `input` and `output`.
pub struct Bridge<R, W> {
    input: Lines<R>,
    output: W,
    refs: RefMap,
    wanted: Vec<(ObjectId, String)>,
    state: BridgeState,
}

impl<R, W> Bridge<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a bridge answering `list` with `refs`.
    pub fn new(input: R, output: W, refs: RefMap) -> Self {
        Self {
            input: input.lines(),
            output,
            refs,
            wanted: Vec::new(),
            state: BridgeState::AwaitingCommand,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Gives back the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads commands until the conversation ends.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails, or if `fetcher` does.
    pub async fn run<F>(&mut self, fetcher: &mut F) -> Result<BridgeExit>
    where
        F: Fetcher + ?Sized,
    {
        loop {
            let Some(line) = self.input.next_line().await? else {
                if !self.wanted.is_empty() {
                    warn!(dropped = self.wanted.len(), "Input ended inside a fetch batch");
                }
                self.state = BridgeState::Terminal;
                return Ok(BridgeExit::Done);
            };
            if let Some(exit) = self.command(line.trim_end(), fetcher).await? {
                self.state = BridgeState::Terminal;
                return Ok(exit);
            }
        }
    }

    async fn command<F>(&mut self, line: &str, fetcher: &mut F) -> Result<Option<BridgeExit>>
    where
        F: Fetcher + ?Sized,
    {
        debug!(command = %line, state = %self.state, "Received command");
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, Some(arg)),
            None => (line, None),
        };

        match (command, arg) {
            ("capabilities", None) => {
                self.state = BridgeState::Capabilities;
                self.respond("fetch\n\n").await?;
                self.state = BridgeState::AwaitingCommand;
            }
            ("list", None | Some("for-push")) => {
                self.state = BridgeState::Listing;
                let mut listing = String::new();
                for (name, id) in &self.refs {
                    listing.push_str(&format!("{id} {name}\n"));
                }
                listing.push('\n');
                self.respond(&listing).await?;
                self.state = BridgeState::AwaitingCommand;
            }
            ("fetch", Some(arg)) => match parse_fetch(arg) {
                Some(pair) => {
                    self.wanted.push(pair);
                    self.state = BridgeState::AccumulatingFetch;
                }
                None => warn!(command = %line, "Unhandled fetch line"),
            },
            ("", None) => {
                if self.wanted.is_empty() {
                    return Ok(Some(BridgeExit::Done));
                }
                let wanted = std::mem::take(&mut self.wanted);
                info!(objects = wanted.len(), "Fetching");
                let report = fetcher.fetch(wanted).await?;
                self.respond("\n").await?;
                return Ok(Some(BridgeExit::Fetched(report)));
            }
            _ => warn!(command = %line, "Unhandled command"),
        }
        Ok(None)
    }

    async fn respond(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }
}

/// Parses `<object-id> <ref-name>`.
fn parse_fetch(arg: &str) -> Option<(ObjectId, String)> {
    let (id, name) = arg.split_once(' ')?;
    let id = ObjectId::from_hex(id).ok()?;
    (!name.is_empty()).then(|| (id, name.to_string()))
}
