//!
//! Asynchronous utilities for querying Source engine game servers.
//!
//! The `sourcequery` crate walks the master server directory for server addresses,
//! then asks every server for its metadata and, when it has players, its player list.

pub mod dns;
pub mod errors;
pub mod models;
pub use models::*;
pub mod protocols;
pub mod transport;
pub mod util;

use crate::{
    errors::{Error, Result},
    protocols::{
        a2s::{ChallengeQuery, InfoQuery, InfoReply, PlayerQuery},
        master::{MasterRequest, INITIAL_CURSOR},
    },
    transport::{Transport, UdpTransport, DEFAULT_CHUNK_SIZE},
};

use {
    futures::{future, stream, Stream, StreamExt},
    serde::{Deserialize, Serialize},
    std::{
        net::{SocketAddr, SocketAddrV4},
        time::Duration,
    },
    tracing::{debug, info, warn},
};

pub const DEFAULT_MASTER: &str = "hl2master.steampowered.com:27011";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Master server as `host:port`.
    pub master: String,
    /// Deadline for a single request/response exchange.
    pub timeout_ms: u64,
    /// Transport read buffer size.
    pub chunk_size: usize,
    /// Whether to fetch player lists of populated servers.
    pub players: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            master: DEFAULT_MASTER.into(),
            timeout_ms: 1000,
            chunk_size: DEFAULT_CHUNK_SIZE,
            players: true,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Result of a master server walk.
#[derive(Debug)]
pub struct Discovery {
    pub servers: Vec<SocketAddrV4>,
    /// Set when a page failed and the walk stopped early. `servers` holds what came before.
    pub error: Option<Error>,
}

pub struct Client<T = UdpTransport> {
    transport: T,
    master: Host,
    fetch_players: bool,
}

impl Client<UdpTransport> {
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let transport = UdpTransport::new(
            dns::Resolver::new()?,
            config.timeout(),
            config.chunk_size,
        );

        Ok(Self::with_transport(transport, config.master.parse()?).fetch_players(config.players))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T, master: Host) -> Self {
        Self {
            transport,
            master,
            fetch_players: true,
        }
    }

    pub fn fetch_players(mut self, fetch_players: bool) -> Self {
        self.fetch_players = fetch_players;
        self
    }

    async fn exchange<P: Protocol>(&self, host: &Host, protocol: &P) -> Result<P::Output> {
        let packet = self
            .transport
            .exchange(host, &protocol.make_request())
            .await?;
        protocol.parse_response(&packet)
    }

    /// Walks every page of the master server listing.
    pub async fn discover(&self, query: &MasterQuery) -> Discovery {
        let filter = query.filter_string();
        let mut cursor = INITIAL_CURSOR;
        let mut servers = Vec::new();

        loop {
            let request = MasterRequest {
                region: query.region,
                cursor,
                filter: filter.clone(),
            };

            let page = match self.exchange(&self.master, &request).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Error querying master server {} after {} servers: {}",
                        self.master,
                        servers.len(),
                        e
                    );
                    return Discovery {
                        servers,
                        error: Some(e),
                    };
                }
            };

            let mut records = page.servers;
            if cursor != INITIAL_CURSOR && records.first() == Some(&cursor) {
                records.remove(0);
            }
            let next = records.last().copied();
            servers.extend(records);

            if page.last {
                break;
            }

            match next {
                Some(next) if next != cursor => {
                    debug!("Requesting next master page after {}", next);
                    cursor = next;
                }
                _ => {
                    warn!("Master server page after {} made no progress", cursor);
                    break;
                }
            }
        }

        info!("Master server returned {} servers", servers.len());

        Discovery {
            servers,
            error: None,
        }
    }

    /// Fetches server metadata, answering an info challenge if the server issues one.
    pub async fn query_info(&self, addr: SocketAddr) -> Result<Server> {
        let host = Host::A(addr);

        match self.exchange(&host, &InfoQuery::default()).await? {
            InfoReply::Info(srv) => Ok(srv),
            InfoReply::Challenge(challenge) => {
                debug!("{} issued info challenge {}", addr, challenge);
                let query = InfoQuery {
                    challenge: Some(challenge),
                };
                match self.exchange(&host, &query).await? {
                    InfoReply::Info(srv) => Ok(srv),
                    InfoReply::Challenge(_) => {
                        Err(Error::InvalidPacket("repeated info challenge".into()))
                    }
                }
            }
        }
    }

    /// Fetches the player list. A zero challenge means there is nothing to ask for.
    pub async fn query_players(&self, addr: SocketAddr) -> Result<Vec<Player>> {
        let host = Host::A(addr);

        let challenge = self.exchange(&host, &ChallengeQuery).await?;
        if challenge == 0 {
            debug!("{} returned zero challenge, skipping players", addr);
            return Ok(vec![]);
        }

        self.exchange(&host, &PlayerQuery { challenge }).await
    }

    /// Queries a single server. Unreachable and zero capacity servers yield `None`.
    pub async fn query_server(&self, addr: SocketAddr) -> Option<Server> {
        let mut srv = match self.query_info(addr).await {
            Ok(srv) => srv,
            Err(e) => {
                warn!("Error querying server info from {}: {}", addr, e);
                return None;
            }
        };

        if !srv.is_queryable() {
            info!("Ignoring {}", addr);
            return None;
        }

        if self.fetch_players && srv.num_players > 0 {
            match self.query_players(addr).await {
                Ok(players) => srv.players = players,
                Err(e) => warn!("Error querying players info from {}: {}", addr, e),
            }
        }

        Some(srv)
    }

    /// Discovers servers and yields each one that answers, in directory order.
    pub fn query_stream<'a>(&'a self, query: &'a MasterQuery) -> impl Stream<Item = Server> + 'a {
        stream::once(self.discover(query))
            .flat_map(|discovery| stream::iter(discovery.servers))
            .then(move |addr| self.query_server(SocketAddr::V4(addr)))
            .filter_map(future::ready)
    }

    pub async fn query(&self, query: &MasterQuery) -> Vec<Server> {
        self.query_stream(query).collect().await
    }
}
