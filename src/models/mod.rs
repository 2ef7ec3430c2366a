use crate::errors::{Error, Result};

use {
    derive_more::{Display, From},
    enum_primitive_derive::Primitive,
    num_traits::FromPrimitive,
    serde::{Deserialize, Serialize},
    std::{
        fmt::{self, Formatter},
        net::SocketAddr,
        str::FromStr,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{}:{}", host, port)]
pub struct StringAddr {
    pub host: String,
    pub port: u16,
}

/// Query target: either a literal socket address or a name to be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, From)]
pub enum Host {
    #[display(fmt = "{}", _0)]
    A(SocketAddr),
    #[display(fmt = "{}", _0)]
    S(StringAddr),
}

impl<S> From<(S, u16)> for Host
where
    S: ToString,
{
    fn from((host, port): (S, u16)) -> Self {
        Host::S(StringAddr {
            host: host.to_string(),
            port,
        })
    }
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Host::A(addr));
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::Parse(format!("missing port in address {:?}", s)))?;
        let port = port
            .parse()
            .map_err(|_| Error::Parse(format!("invalid port in address {:?}", s)))?;

        Ok((host, port).into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub addr: SocketAddr,
    pub data: Vec<u8>,
}

/// Protocol defines how a single request/response exchange is framed and decoded.
pub trait Protocol {
    type Output;

    /// Creates the request datagram.
    fn make_request(&self) -> Vec<u8>;
    /// Decodes the reassembled response.
    fn parse_response(&self, p: &Packet) -> Result<Self::Output>;
}

/// Master server region selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Primitive)]
pub enum Region {
    UsEast = 0x00,
    UsWest = 0x01,
    SouthAmerica = 0x02,
    Europe = 0x03,
    Asia = 0x04,
    Australia = 0x05,
    MiddleEast = 0x06,
    Africa = 0x07,
    #[default]
    All = 0xFF,
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use self::Region::*;

        Ok(match s.to_ascii_lowercase().as_str() {
            "us-east" => UsEast,
            "us-west" => UsWest,
            "south-america" => SouthAmerica,
            "europe" | "eu" => Europe,
            "asia" => Asia,
            "australia" => Australia,
            "middle-east" => MiddleEast,
            "africa" => Africa,
            "all" => All,
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Region::from_u8)
                .ok_or_else(|| Error::Parse(format!("unknown region {:?}", s)))?,
        })
    }
}

/// A single `\key\value` condition of a master server query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    AppId(u32),
    GameDir(String),
    Map(String),
    Dedicated,
    Secure,
    NotEmpty,
    NotFull,
    Linux,
    NoPassword,
    Raw(String, String),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use self::Filter::*;

        match self {
            AppId(id) => write!(f, "\\appid\\{}", id),
            GameDir(dir) => write!(f, "\\gamedir\\{}", dir),
            Map(map) => write!(f, "\\map\\{}", map),
            Dedicated => f.write_str("\\dedicated\\1"),
            Secure => f.write_str("\\secure\\1"),
            NotEmpty => f.write_str("\\empty\\1"),
            NotFull => f.write_str("\\full\\1"),
            Linux => f.write_str("\\linux\\1"),
            NoPassword => f.write_str("\\password\\0"),
            Raw(k, v) => write!(f, "\\{}\\{}", k, v),
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    /// Parses `key=value` pairs. Known keys map onto their typed variant.
    fn from_str(s: &str) -> Result<Self> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| Error::Parse(format!("filter must be key=value: {:?}", s)))?;

        Ok(match (k, v) {
            ("appid", id) => Filter::AppId(
                id.parse()
                    .map_err(|_| Error::Parse(format!("invalid appid {:?}", id)))?,
            ),
            ("gamedir", dir) => Filter::GameDir(dir.into()),
            ("map", map) => Filter::Map(map.into()),
            ("dedicated", "1") => Filter::Dedicated,
            ("secure", "1") => Filter::Secure,
            ("empty", "1") => Filter::NotEmpty,
            ("full", "1") => Filter::NotFull,
            ("linux", "1") => Filter::Linux,
            ("password", "0") => Filter::NoPassword,
            (k, v) => Filter::Raw(k.into(), v.into()),
        })
    }
}

/// Caller supplied master server filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterQuery {
    pub region: Region,
    pub filters: Vec<Filter>,
}

impl MasterQuery {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            filters: vec![],
        }
    }

    /// Restricts the query to one application. Zero means no restriction.
    pub fn app_id(mut self, app_id: u32) -> Self {
        if app_id > 0 {
            self.filters.push(Filter::AppId(app_id));
        }
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_string(&self) -> String {
        self.filters.iter().map(ToString::to_string).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerType {
    Dedicated,
    Listen,
    Proxy,
    Other(char),
}

impl From<char> for ServerType {
    fn from(c: char) -> Self {
        match c {
            'd' | 'D' => ServerType::Dedicated,
            'l' | 'L' => ServerType::Listen,
            'p' | 'P' => ServerType::Proxy,
            other => ServerType::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Linux,
    Windows,
    Mac,
    Other(char),
}

impl From<char> for Environment {
    fn from(c: char) -> Self {
        match c {
            'l' | 'L' => Environment::Linux,
            'w' | 'W' => Environment::Windows,
            'm' | 'o' => Environment::Mac,
            other => Environment::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl From<u8> for Visibility {
    fn from(v: u8) -> Self {
        match v {
            0 => Visibility::Public,
            _ => Visibility::Private,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: i32,
    /// Seconds the player has been connected.
    pub duration: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub addr: SocketAddr,
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: u16,
    pub num_players: i8,
    pub max_players: i8,
    pub num_bots: i8,
    pub server_type: ServerType,
    pub environment: Environment,
    pub visibility: Visibility,
    pub vac: bool,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default)]
    pub players: Vec<Player>,
}

impl Server {
    pub fn new(addr: SocketAddr) -> Server {
        Server {
            addr,
            protocol: Default::default(),
            name: Default::default(),
            map: Default::default(),
            folder: Default::default(),
            game: Default::default(),
            app_id: Default::default(),
            num_players: Default::default(),
            max_players: Default::default(),
            num_bots: Default::default(),
            server_type: ServerType::Dedicated,
            environment: Environment::Linux,
            visibility: Visibility::Public,
            vac: Default::default(),
            version: Default::default(),
            game_port: Default::default(),
            game_id: Default::default(),
            keywords: Default::default(),
            mode: Default::default(),
            country: Default::default(),
            players: Default::default(),
        }
    }

    /// Servers advertising no player slots cannot be joined and are not reported.
    pub fn is_queryable(&self) -> bool {
        self.max_players != 0
    }
}
