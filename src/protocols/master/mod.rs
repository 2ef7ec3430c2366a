//! Master server directory listing.
//!
//! A listing arrives in pages. Each request carries the last address of the
//! previous page as a resume cursor; the final page ends with an all-zero
//! sentinel record.

use crate::{
    errors::{Error, Result},
    models::{Packet, Protocol, Region},
    util::expect_header,
};

use {
    nom::{
        number::complete::{be_u16, be_u8},
        sequence::tuple,
        IResult,
    },
    std::net::{Ipv4Addr, SocketAddrV4},
    tracing::trace,
};

pub const MASTER_REQUEST: u8 = 0x31;
pub const RESPONSE_HEADER: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];

const RECORD_LEN: usize = 6;

/// Cursor requesting the first page.
pub const INITIAL_CURSOR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterPage {
    pub servers: Vec<SocketAddrV4>,
    /// Set once the sentinel record has been seen.
    pub last: bool,
}

fn address(input: &[u8]) -> IResult<&[u8], SocketAddrV4> {
    let (input, (a, b, c, d, port)) = tuple((be_u8, be_u8, be_u8, be_u8, be_u16))(input)?;
    Ok((input, SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port)))
}

fn is_sentinel(addr: &SocketAddrV4) -> bool {
    matches!(addr.ip().octets(), [0, 0, 0, _])
}

pub fn parse_page(buf: &[u8]) -> Result<MasterPage> {
    let min_len = RESPONSE_HEADER.len() + RECORD_LEN;
    if buf.len() < min_len {
        return Err(Error::ShortBuffer {
            needed: min_len,
            remaining: buf.len(),
        });
    }

    let mut rest = &buf[expect_header(buf, &RESPONSE_HEADER)?..];
    let mut page = MasterPage::default();

    while !rest.is_empty() {
        let remaining = rest.len();
        let (next, addr) = address(rest).map_err(|_| Error::ShortBuffer {
            needed: RECORD_LEN,
            remaining,
        })?;
        rest = next;

        if is_sentinel(&addr) {
            page.last = true;
            break;
        }
        page.servers.push(addr);
    }

    Ok(page)
}

/// One page request of a directory walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterRequest {
    pub region: Region,
    pub cursor: SocketAddrV4,
    pub filter: String,
}

impl Protocol for MasterRequest {
    type Output = MasterPage;

    fn make_request(&self) -> Vec<u8> {
        let mut out = vec![MASTER_REQUEST, self.region as u8];
        out.extend_from_slice(self.cursor.to_string().as_bytes());
        out.push(0);
        out.extend_from_slice(self.filter.as_bytes());
        out.push(0);
        out
    }

    fn parse_response(&self, p: &Packet) -> Result<MasterPage> {
        let page = parse_page(&p.data)?;
        trace!(
            "Master page after {}: {} servers, last: {}",
            self.cursor,
            page.servers.len(),
            page.last
        );
        Ok(page)
    }
}
