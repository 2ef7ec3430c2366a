//! A2S server queries: server info and the challenge protected player list.

use crate::{
    errors::Result,
    models::{Packet, Player, Protocol, Server},
    util::*,
};

use tracing::debug;

/// Connectionless packet preamble.
pub const PREFIX: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

pub const A2S_INFO: u8 = 0x54;
pub const A2S_PLAYER: u8 = 0x55;
pub const S2A_INFO: u8 = 0x49;
pub const S2A_PLAYER: u8 = 0x44;
pub const S2C_CHALLENGE: u8 = 0x41;

pub const INFO_PAYLOAD: &str = "Source Engine Query";

/// Challenge value asking the server to issue a fresh challenge.
pub const NO_CHALLENGE: i32 = -1;

fn header(kind: u8) -> [u8; 5] {
    [PREFIX[0], PREFIX[1], PREFIX[2], PREFIX[3], kind]
}

fn is_kind(buf: &[u8], kind: u8) -> bool {
    buf.starts_with(&header(kind))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExtraField {
    GamePort,
    SteamId,
    SourceTv,
    Keywords,
    GameId,
}

/// Extra data flag bits in wire order. Each present field shifts every field after it.
const EXTRA_DATA: [(u8, ExtraField); 5] = [
    (0x80, ExtraField::GamePort),
    (0x10, ExtraField::SteamId),
    (0x40, ExtraField::SourceTv),
    (0x20, ExtraField::Keywords),
    (0x01, ExtraField::GameId),
];

fn parse_extra_data(srv: &mut Server, buf: &[u8], mut cursor: usize, flags: u8) -> Result<()> {
    for (bit, field) in EXTRA_DATA.iter() {
        if flags & bit == 0 {
            continue;
        }

        match field {
            ExtraField::GamePort => {
                let port;
                (cursor, port) = decode_u16_le(buf, cursor)?;
                srv.game_port = Some(port);
            }
            ExtraField::SteamId => {
                cursor = skip(buf, cursor, 8)?;
            }
            ExtraField::SourceTv => {
                cursor = skip(buf, cursor, 2)?;
                (cursor, _) = decode_string(buf, cursor)?;
            }
            ExtraField::Keywords => {
                let keywords;
                (cursor, keywords) = decode_string(buf, cursor)?;
                srv.keywords = Some(keywords);
            }
            ExtraField::GameId => {
                let game_id;
                (cursor, game_id) = decode_u64_le(buf, cursor)?;
                srv.game_id = Some(game_id);
            }
        }
    }

    Ok(())
}

/// Keywords of the form `mode|country|...` carry the game mode and server country.
fn apply_keywords(srv: &mut Server) {
    if let Some(keywords) = srv.keywords.as_deref() {
        let tokens = keywords.split('|').collect::<Vec<_>>();
        if tokens.len() >= 2 {
            srv.mode = Some(tokens[0].to_string());
            srv.country = Some(tokens[1].to_string());
        }
    }
}

pub fn parse_info(p: &Packet) -> Result<Server> {
    let buf = p.data.as_slice();
    let mut srv = Server::new(p.addr);

    let mut cursor = expect_header(buf, &header(S2A_INFO))?;
    let (server_type, environment, visibility, vac);

    (cursor, srv.protocol) = decode_u8(buf, cursor)?;
    (cursor, srv.name) = decode_string(buf, cursor)?;
    (cursor, srv.map) = decode_string(buf, cursor)?;
    (cursor, srv.folder) = decode_string(buf, cursor)?;
    (cursor, srv.game) = decode_string(buf, cursor)?;
    (cursor, srv.app_id) = decode_u16_le(buf, cursor)?;
    (cursor, srv.num_players) = decode_i8(buf, cursor)?;
    (cursor, srv.max_players) = decode_i8(buf, cursor)?;
    (cursor, srv.num_bots) = decode_i8(buf, cursor)?;
    (cursor, server_type) = decode_char(buf, cursor)?;
    (cursor, environment) = decode_char(buf, cursor)?;
    (cursor, visibility) = decode_u8(buf, cursor)?;
    (cursor, vac) = decode_u8(buf, cursor)?;
    (cursor, srv.version) = decode_string(buf, cursor)?;

    srv.server_type = server_type.into();
    srv.environment = environment.into();
    srv.visibility = visibility.into();
    srv.vac = vac != 0;

    // Older servers stop right after the version string.
    if cursor < buf.len() {
        let flags;
        (cursor, flags) = decode_u8(buf, cursor)?;
        parse_extra_data(&mut srv, buf, cursor, flags)?;
    }

    apply_keywords(&mut srv);

    Ok(srv)
}

pub fn parse_challenge(buf: &[u8]) -> Result<i32> {
    let cursor = expect_header(buf, &header(S2C_CHALLENGE))?;
    decode_i32(buf, cursor).map(|(_, challenge)| challenge)
}

pub fn parse_players(buf: &[u8]) -> Result<Vec<Player>> {
    let mut cursor = expect_header(buf, &header(S2A_PLAYER))?;
    let count;
    (cursor, count) = decode_u8(buf, cursor)?;

    let mut players = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let mut player = Player::default();

        // Player index is not meaningful to clients.
        cursor = skip(buf, cursor, 1)?;
        (cursor, player.name) = decode_string(buf, cursor)?;
        (cursor, player.score) = decode_i32_le(buf, cursor)?;
        (cursor, player.duration) = decode_f32_le(buf, cursor)?;

        players.push(player);
    }

    Ok(players)
}

fn make_player_request(challenge: i32) -> Vec<u8> {
    let mut out = header(A2S_PLAYER).to_vec();
    out.extend_from_slice(&challenge.to_be_bytes());
    out
}

#[derive(Clone, Debug, PartialEq)]
pub enum InfoReply {
    Info(Server),
    /// The server wants the info request repeated with this challenge appended.
    Challenge(i32),
}

/// A2S_INFO request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InfoQuery {
    pub challenge: Option<i32>,
}

impl Protocol for InfoQuery {
    type Output = InfoReply;

    fn make_request(&self) -> Vec<u8> {
        let mut out = header(A2S_INFO).to_vec();
        out.extend_from_slice(INFO_PAYLOAD.as_bytes());
        out.push(0);
        if let Some(challenge) = self.challenge {
            out.extend_from_slice(&challenge.to_be_bytes());
        }
        out
    }

    fn parse_response(&self, p: &Packet) -> Result<InfoReply> {
        if is_kind(&p.data, S2C_CHALLENGE) {
            return parse_challenge(&p.data).map(InfoReply::Challenge);
        }

        parse_info(p).map(InfoReply::Info)
    }
}

/// A2S_PLAYER request for a challenge number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChallengeQuery;

impl Protocol for ChallengeQuery {
    type Output = i32;

    fn make_request(&self) -> Vec<u8> {
        make_player_request(NO_CHALLENGE)
    }

    /// Any reply other than a challenge leaves the challenge unset.
    fn parse_response(&self, p: &Packet) -> Result<i32> {
        if !is_kind(&p.data, S2C_CHALLENGE) {
            debug!("{} did not answer with a challenge", p.addr);
            return Ok(NO_CHALLENGE);
        }

        parse_challenge(&p.data)
    }
}

/// A2S_PLAYER request carrying the challenge issued by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerQuery {
    pub challenge: i32,
}

impl Protocol for PlayerQuery {
    type Output = Vec<Player>;

    fn make_request(&self) -> Vec<u8> {
        make_player_request(self.challenge)
    }

    fn parse_response(&self, p: &Packet) -> Result<Vec<Player>> {
        parse_players(&p.data)
    }
}
