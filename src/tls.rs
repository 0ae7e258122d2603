//! Minimal SSL/TLS handshake codec: just enough to send a ClientHello and
//! read which version and cipher suite the server picks.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time;
use uuid::Uuid;

use crate::suites::CipherSuite;
use crate::types::TlsVersion;

const CONTENT_CHANGE_CIPHER_SPEC: u8 = 20;
const CONTENT_ALERT: u8 = 21;
const CONTENT_HANDSHAKE: u8 = 22;
const CONTENT_APPLICATION_DATA: u8 = 23;

const HS_CLIENT_HELLO: u8 = 1;
const HS_SERVER_HELLO: u8 = 2;
const HS_SERVER_HELLO_DONE: u8 = 14;
const HS_CERTIFICATE_STATUS: u8 = 22;

const EXT_SERVER_NAME: u16 = 0x0000;
const EXT_STATUS_REQUEST: u16 = 0x0005;
const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
const EXT_EC_POINT_FORMATS: u16 = 0x000b;
const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
const EXT_SUPPORTED_VERSIONS: u16 = 0x002b;
const EXT_PSK_KEY_EXCHANGE_MODES: u16 = 0x002d;
const EXT_KEY_SHARE: u16 = 0x0033;

const EMPTY_RENEGOTIATION_INFO_SCSV: u16 = 0x00ff;
const GROUP_X25519: u16 = 0x001d;
const SUPPORTED_GROUPS: &[u16] = &[GROUP_X25519, 0x0017, 0x0018, 0x0019, 0x0100];
const SIGNATURE_ALGORITHMS: &[u16] = &[
    0x0403, 0x0503, 0x0603, 0x0804, 0x0805, 0x0806, 0x0401, 0x0501, 0x0601, 0x0201, 0x0203,
];

/// `ServerHello.random` of a HelloRetryRequest.
const HELLO_RETRY_RANDOM: [u8; 32] = [
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8, 0x91,
    0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8, 0x33, 0x9c,
];

/// Upper bound on handshake bytes buffered before giving up.
const MAX_HANDSHAKE_BYTES: usize = 256 * 1024;
const MAX_RECORD_LEN: usize = (1 << 14) + 2048;

const SSL2_MT_ERROR: u8 = 0;
const SSL2_MT_CLIENT_HELLO: u8 = 1;
const SSL2_MT_SERVER_HELLO: u8 = 4;

#[derive(Error, Debug)]
pub enum TlsProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for the server")]
    Timeout,

    #[error("connection closed by the server")]
    Closed,

    #[error("malformed server response: {0}")]
    Malformed(String),
}

/// First flight of a ClientHello-initiated handshake as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    Hello(ServerHello),
    Alert { level: u8, description: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// Negotiated version, taking `supported_versions` into account.
    pub version: u16,
    pub cipher_suite: u16,
    pub hello_retry: bool,
    /// The raw ServerHello handshake message.
    pub raw: Vec<u8>,
    pub ocsp_response: Option<Vec<u8>>,
}

/// SSL 2.0 server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ssl2Reply {
    Hello { cipher_kinds: Vec<u32>, raw: Vec<u8> },
    Error { code: u16 },
    /// The server answered with a TLS alert record.
    TlsAlert,
}

/// A ClientHello for SSL 3.0 up to TLS 1.3.
#[derive(Debug, Clone)]
pub struct ClientHello {
    pub min_version: TlsVersion,
    pub max_version: TlsVersion,
    pub cipher_suites: Vec<u16>,
    pub server_name: Option<String>,
    pub status_request: bool,
}

impl ClientHello {
    /// Hello pinned to one version, offering `suites`.
    pub fn for_version(version: TlsVersion, suites: &[CipherSuite], server_name: &str) -> Self {
        Self {
            min_version: version,
            max_version: version,
            cipher_suites: suite_ids(suites),
            server_name: sni_name(server_name),
            status_request: false,
        }
    }

    /// Hello offering TLS 1.0 through 1.3 and asking for a stapled OCSP response.
    pub fn connectivity(suites: &[CipherSuite], server_name: &str) -> Self {
        Self {
            min_version: TlsVersion::Tls1_0,
            max_version: TlsVersion::Tls1_3,
            cipher_suites: suite_ids(suites),
            server_name: sni_name(server_name),
            status_request: true,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let offers_tls13 = self.max_version == TlsVersion::Tls1_3;
        let legacy_version = self.max_version.min(TlsVersion::Tls1_2).wire();

        let mut body = Vec::with_capacity(512);
        put_u16(&mut body, legacy_version);
        body.extend_from_slice(&random_bytes());
        if offers_tls13 {
            body.push(32);
            body.extend_from_slice(&random_bytes());
        } else {
            body.push(0);
        }

        let mut suites = self.cipher_suites.clone();
        if self.min_version < TlsVersion::Tls1_3 {
            suites.push(EMPTY_RENEGOTIATION_INFO_SCSV);
        }
        put_u16(&mut body, (suites.len() * 2) as u16);
        for id in suites {
            put_u16(&mut body, id);
        }
        body.extend_from_slice(&[1, 0]);

        if self.max_version > TlsVersion::Ssl3_0 {
            let exts = self.extensions(offers_tls13);
            put_u16(&mut body, exts.len() as u16);
            body.extend_from_slice(&exts);
        }

        let mut handshake = Vec::with_capacity(body.len() + 4);
        handshake.push(HS_CLIENT_HELLO);
        put_u24(&mut handshake, body.len());
        handshake.extend_from_slice(&body);

        let record_version = if self.max_version == TlsVersion::Ssl3_0 {
            TlsVersion::Ssl3_0.wire()
        } else {
            TlsVersion::Tls1_0.wire()
        };
        let mut record = Vec::with_capacity(handshake.len() + 5);
        record.push(CONTENT_HANDSHAKE);
        put_u16(&mut record, record_version);
        put_u16(&mut record, handshake.len() as u16);
        record.extend_from_slice(&handshake);
        record
    }

    fn extensions(&self, offers_tls13: bool) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(name) = &self.server_name {
            let mut entry = Vec::with_capacity(name.len() + 5);
            put_u16(&mut entry, (name.len() + 3) as u16);
            entry.push(0);
            put_u16(&mut entry, name.len() as u16);
            entry.extend_from_slice(name.as_bytes());
            put_ext(&mut out, EXT_SERVER_NAME, &entry);
        }

        if self.status_request {
            put_ext(&mut out, EXT_STATUS_REQUEST, &[1, 0, 0, 0, 0]);
        }

        let mut groups = Vec::new();
        put_u16(&mut groups, (SUPPORTED_GROUPS.len() * 2) as u16);
        for g in SUPPORTED_GROUPS {
            put_u16(&mut groups, *g);
        }
        put_ext(&mut out, EXT_SUPPORTED_GROUPS, &groups);
        put_ext(&mut out, EXT_EC_POINT_FORMATS, &[1, 0]);

        if self.max_version >= TlsVersion::Tls1_2 {
            let mut algs = Vec::new();
            put_u16(&mut algs, (SIGNATURE_ALGORITHMS.len() * 2) as u16);
            for a in SIGNATURE_ALGORITHMS {
                put_u16(&mut algs, *a);
            }
            put_ext(&mut out, EXT_SIGNATURE_ALGORITHMS, &algs);
        }

        if offers_tls13 {
            let versions: Vec<u16> = [
                TlsVersion::Tls1_3,
                TlsVersion::Tls1_2,
                TlsVersion::Tls1_1,
                TlsVersion::Tls1_0,
            ]
            .into_iter()
            .filter(|v| *v >= self.min_version && *v <= self.max_version)
            .map(TlsVersion::wire)
            .collect();
            let mut sv = vec![(versions.len() * 2) as u8];
            for v in versions {
                put_u16(&mut sv, v);
            }
            put_ext(&mut out, EXT_SUPPORTED_VERSIONS, &sv);
            put_ext(&mut out, EXT_PSK_KEY_EXCHANGE_MODES, &[1, 1]);

            // Any 32 bytes are a usable x25519 public value for a hello.
            let mut share = Vec::with_capacity(38);
            put_u16(&mut share, 36);
            put_u16(&mut share, GROUP_X25519);
            put_u16(&mut share, 32);
            share.extend_from_slice(&random_bytes());
            put_ext(&mut out, EXT_KEY_SHARE, &share);
        }

        out
    }
}

/// Human-readable name of a TLS alert description.
pub fn alert_name(description: u8) -> &'static str {
    match description {
        0 => "close_notify",
        10 => "unexpected_message",
        20 => "bad_record_mac",
        40 => "handshake_failure",
        47 => "illegal_parameter",
        50 => "decode_error",
        70 => "protocol_version",
        71 => "insufficient_security",
        80 => "internal_error",
        86 => "inappropriate_fallback",
        109 => "missing_extension",
        112 => "unrecognized_name",
        _ => "unknown_alert",
    }
}

/// SSL 2.0 CLIENT-HELLO offering `kinds`.
pub fn ssl2_client_hello(kinds: &[CipherSuite]) -> Vec<u8> {
    let challenge = Uuid::new_v4().into_bytes();
    let mut msg = Vec::with_capacity(9 + kinds.len() * 3 + challenge.len());
    msg.push(SSL2_MT_CLIENT_HELLO);
    put_u16(&mut msg, TlsVersion::Ssl2_0.wire());
    put_u16(&mut msg, (kinds.len() * 3) as u16);
    put_u16(&mut msg, 0);
    put_u16(&mut msg, challenge.len() as u16);
    for k in kinds {
        msg.extend_from_slice(&k.id.to_be_bytes()[1..]);
    }
    msg.extend_from_slice(&challenge);

    let mut record = Vec::with_capacity(msg.len() + 2);
    put_u16(&mut record, 0x8000 | msg.len() as u16);
    record.extend_from_slice(&msg);
    record
}

/// Read records until the ServerHello (plus, when `want_ocsp`, any
/// CertificateStatus before ServerHelloDone) or an alert arrives.
pub async fn read_server_reply<R>(
    reader: &mut R,
    timeout: Duration,
    want_ocsp: bool,
) -> Result<ServerReply, TlsProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut handshake: Vec<u8> = Vec::new();
    let mut hello: Option<ServerHello> = None;

    loop {
        let (content_type, payload) = match read_record(reader, timeout).await {
            Ok(r) => r,
            Err(TlsProbeError::Closed) if hello.is_some() => break,
            Err(e) => return Err(e),
        };

        match content_type {
            CONTENT_ALERT => {
                if let Some(h) = hello {
                    return Ok(ServerReply::Hello(h));
                }
                if payload.len() < 2 {
                    return Err(TlsProbeError::Malformed("short alert".into()));
                }
                return Ok(ServerReply::Alert {
                    level: payload[0],
                    description: payload[1],
                });
            }
            CONTENT_HANDSHAKE => {
                handshake.extend_from_slice(&payload);
                if handshake.len() > MAX_HANDSHAKE_BYTES {
                    return Err(TlsProbeError::Malformed("handshake too large".into()));
                }
            }
            CONTENT_CHANGE_CIPHER_SPEC | CONTENT_APPLICATION_DATA if hello.is_some() => break,
            other => {
                return Err(TlsProbeError::Malformed(format!(
                    "unexpected record type {other}"
                )))
            }
        }

        while let Some((msg_type, msg)) = take_handshake_message(&mut handshake) {
            match (msg_type, hello.as_mut()) {
                (HS_SERVER_HELLO, None) => {
                    let parsed = parse_server_hello(&msg)?;
                    if !want_ocsp || parsed.hello_retry || parsed.version == TlsVersion::Tls1_3.wire() {
                        return Ok(ServerReply::Hello(parsed));
                    }
                    hello = Some(parsed);
                }
                (HS_CERTIFICATE_STATUS, Some(h)) => {
                    h.ocsp_response = parse_certificate_status(&msg[4..]);
                    return Ok(ServerReply::Hello(h.clone()));
                }
                (HS_SERVER_HELLO_DONE, Some(h)) => return Ok(ServerReply::Hello(h.clone())),
                (_, Some(_)) => {}
                (other, None) => {
                    return Err(TlsProbeError::Malformed(format!(
                        "handshake message {other} before ServerHello"
                    )))
                }
            }
        }
    }

    hello.map(ServerReply::Hello).ok_or(TlsProbeError::Closed)
}

/// Read the server's answer to an SSL 2.0 CLIENT-HELLO.
pub async fn read_ssl2_reply<R>(reader: &mut R, timeout: Duration) -> Result<Ssl2Reply, TlsProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    read_exact(reader, &mut header, timeout).await?;

    if header[0] == CONTENT_ALERT {
        return Ok(Ssl2Reply::TlsAlert);
    }

    let len = if header[0] & 0x80 != 0 {
        (usize::from(header[0] & 0x7f) << 8) | usize::from(header[1])
    } else {
        let mut padding = [0u8; 1];
        read_exact(reader, &mut padding, timeout).await?;
        (usize::from(header[0] & 0x3f) << 8) | usize::from(header[1])
    };
    let mut msg = vec![0u8; len];
    read_exact(reader, &mut msg, timeout).await?;
    parse_ssl2_message(msg)
}

fn parse_ssl2_message(msg: Vec<u8>) -> Result<Ssl2Reply, TlsProbeError> {
    match msg.first() {
        Some(&SSL2_MT_ERROR) if msg.len() >= 3 => Ok(Ssl2Reply::Error {
            code: u16::from_be_bytes([msg[1], msg[2]]),
        }),
        Some(&SSL2_MT_SERVER_HELLO) if msg.len() >= 11 => {
            let cert_len = usize::from(u16::from_be_bytes([msg[5], msg[6]]));
            let specs_len = usize::from(u16::from_be_bytes([msg[7], msg[8]]));
            let start = 11 + cert_len;
            let end = start + specs_len;
            if end > msg.len() || specs_len % 3 != 0 {
                return Err(TlsProbeError::Malformed("truncated SSLv2 SERVER-HELLO".into()));
            }
            let cipher_kinds = msg[start..end]
                .chunks_exact(3)
                .map(|c| u32::from_be_bytes([0, c[0], c[1], c[2]]))
                .collect();
            Ok(Ssl2Reply::Hello {
                cipher_kinds,
                raw: msg,
            })
        }
        _ => Err(TlsProbeError::Malformed("unexpected SSLv2 message".into())),
    }
}

async fn read_record<R>(reader: &mut R, timeout: Duration) -> Result<(u8, Vec<u8>), TlsProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 5];
    read_exact(reader, &mut header, timeout).await?;
    let content_type = header[0];
    if !(CONTENT_CHANGE_CIPHER_SPEC..=CONTENT_APPLICATION_DATA).contains(&content_type) {
        return Err(TlsProbeError::Malformed(format!(
            "not a TLS record (type {content_type})"
        )));
    }
    let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
    if len > MAX_RECORD_LEN {
        return Err(TlsProbeError::Malformed(format!("record too long ({len})")));
    }
    let mut payload = vec![0u8; len];
    read_exact(reader, &mut payload, timeout).await?;
    Ok((content_type, payload))
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8], timeout: Duration) -> Result<(), TlsProbeError>
where
    R: AsyncRead + Unpin,
{
    match time::timeout(timeout, reader.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(TlsProbeError::Closed),
        Ok(Err(e)) => Err(TlsProbeError::Io(e)),
        Err(_) => Err(TlsProbeError::Timeout),
    }
}

/// Split one complete handshake message (header included) off the buffer.
fn take_handshake_message(buf: &mut Vec<u8>) -> Option<(u8, Vec<u8>)> {
    if buf.len() < 4 {
        return None;
    }
    let len = (usize::from(buf[1]) << 16) | (usize::from(buf[2]) << 8) | usize::from(buf[3]);
    if buf.len() < 4 + len {
        return None;
    }
    let msg: Vec<u8> = buf.drain(..4 + len).collect();
    Some((msg[0], msg))
}

fn parse_server_hello(msg: &[u8]) -> Result<ServerHello, TlsProbeError> {
    let body = &msg[4..];
    let malformed = || TlsProbeError::Malformed("truncated ServerHello".into());

    let mut cur = Cursor::new(body);
    let mut version = cur.u16().ok_or_else(malformed)?;
    let random = cur.take(32).ok_or_else(malformed)?;
    let hello_retry = random == HELLO_RETRY_RANDOM;
    let sid_len = usize::from(cur.u8().ok_or_else(malformed)?);
    cur.take(sid_len).ok_or_else(malformed)?;
    let cipher_suite = cur.u16().ok_or_else(malformed)?;
    cur.u8().ok_or_else(malformed)?;

    if let Some(ext_len) = cur.u16() {
        let mut exts = Cursor::new(cur.take(usize::from(ext_len)).ok_or_else(malformed)?);
        while let (Some(kind), Some(len)) = (exts.u16(), exts.u16()) {
            let data = exts.take(usize::from(len)).ok_or_else(malformed)?;
            if kind == EXT_SUPPORTED_VERSIONS && data.len() == 2 {
                version = u16::from_be_bytes([data[0], data[1]]);
            }
        }
    }

    Ok(ServerHello {
        version,
        cipher_suite,
        hello_retry,
        raw: msg.to_vec(),
        ocsp_response: None,
    })
}

fn parse_certificate_status(body: &[u8]) -> Option<Vec<u8>> {
    let mut cur = Cursor::new(body);
    if cur.u8()? != 1 {
        return None;
    }
    let len = cur.u24()?;
    cur.take(len).map(<[u8]>::to_vec)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let out = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(out)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u24(&mut self) -> Option<usize> {
        self.take(3)
            .map(|b| (usize::from(b[0]) << 16) | (usize::from(b[1]) << 8) | usize::from(b[2]))
    }
}

fn suite_ids(suites: &[CipherSuite]) -> Vec<u16> {
    suites.iter().filter_map(|s| u16::try_from(s.id).ok()).collect()
}

/// SNI carries DNS names only.
fn sni_name(hostname: &str) -> Option<String> {
    if hostname.is_empty() || hostname.parse::<IpAddr>().is_ok() {
        None
    } else {
        Some(hostname.trim_end_matches('.').to_string())
    }
}

fn random_bytes() -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    out[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    out
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u24(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&(v as u32).to_be_bytes()[1..]);
}

fn put_ext(out: &mut Vec<u8>, kind: u16, body: &[u8]) {
    put_u16(out, kind);
    put_u16(out, body.len() as u16);
    out.extend_from_slice(body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::{suites_for, SSL2_CIPHER_KINDS};

    const T: Duration = Duration::from_secs(1);

    fn server_hello_record(version: u16, suite: u16, supported_version: Option<u16>) -> Vec<u8> {
        let mut body = Vec::new();
        put_u16(&mut body, version);
        body.extend_from_slice(&[7u8; 32]);
        body.push(0);
        put_u16(&mut body, suite);
        body.push(0);
        if let Some(sv) = supported_version {
            let mut ext = Vec::new();
            put_ext(&mut ext, EXT_SUPPORTED_VERSIONS, &sv.to_be_bytes());
            put_u16(&mut body, ext.len() as u16);
            body.extend_from_slice(&ext);
        }
        let mut hs = vec![HS_SERVER_HELLO];
        put_u24(&mut hs, body.len());
        hs.extend_from_slice(&body);
        let mut rec = vec![CONTENT_HANDSHAKE];
        put_u16(&mut rec, 0x0303);
        put_u16(&mut rec, hs.len() as u16);
        rec.extend_from_slice(&hs);
        rec
    }

    #[test]
    fn client_hello_lengths_are_consistent() {
        let hello = ClientHello::for_version(
            TlsVersion::Tls1_2,
            &suites_for(TlsVersion::Tls1_2),
            "example.com",
        )
        .encode();
        assert_eq!(hello[0], CONTENT_HANDSHAKE);
        let record_len = usize::from(u16::from_be_bytes([hello[3], hello[4]]));
        assert_eq!(record_len, hello.len() - 5);
        assert_eq!(hello[5], HS_CLIENT_HELLO);
        let hs_len = (usize::from(hello[6]) << 16) | (usize::from(hello[7]) << 8) | usize::from(hello[8]);
        assert_eq!(hs_len, record_len - 4);
        assert_eq!(u16::from_be_bytes([hello[9], hello[10]]), 0x0303);
    }

    #[test]
    fn ssl3_hello_has_no_extensions() {
        let suites = suites_for(TlsVersion::Ssl3_0);
        let hello = ClientHello::for_version(TlsVersion::Ssl3_0, &suites, "example.com").encode();
        // header(5) + hs header(4) + version(2) + random(32) + sid(1)
        // + suites len(2) + suites + scsv(2) + compression(2)
        assert_eq!(hello.len(), 5 + 4 + 2 + 32 + 1 + 2 + suites.len() * 2 + 2 + 2);
        assert_eq!(u16::from_be_bytes([hello[1], hello[2]]), 0x0300);
    }

    #[test]
    fn sni_skips_ip_literals() {
        assert_eq!(sni_name("10.0.0.1"), None);
        assert_eq!(sni_name("example.com."), Some("example.com".to_string()));
    }

    #[tokio::test]
    async fn reads_tls13_server_hello_from_supported_versions() {
        let data = server_hello_record(0x0303, 0x1302, Some(0x0304));
        let mut reader = data.as_slice();
        let reply = read_server_reply(&mut reader, T, false).await.unwrap();
        match reply {
            ServerReply::Hello(h) => {
                assert_eq!(h.version, 0x0304);
                assert_eq!(h.cipher_suite, 0x1302);
                assert!(!h.hello_retry);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn reads_alert() {
        let data = vec![CONTENT_ALERT, 0x03, 0x03, 0x00, 0x02, 2, 40];
        let mut reader = data.as_slice();
        let reply = read_server_reply(&mut reader, T, false).await.unwrap();
        assert_eq!(reply, ServerReply::Alert { level: 2, description: 40 });
    }

    #[tokio::test]
    async fn collects_stapled_ocsp_before_hello_done() {
        let mut data = server_hello_record(0x0303, 0xc02f, None);
        let ocsp = [0x30, 0x03, 0x0a, 0x01, 0x00];
        let mut status = vec![HS_CERTIFICATE_STATUS];
        put_u24(&mut status, 4 + ocsp.len());
        status.push(1);
        put_u24(&mut status, ocsp.len());
        status.extend_from_slice(&ocsp);
        status.extend_from_slice(&[HS_SERVER_HELLO_DONE, 0, 0, 0]);
        data.push(CONTENT_HANDSHAKE);
        put_u16(&mut data, 0x0303);
        put_u16(&mut data, status.len() as u16);
        data.extend_from_slice(&status);

        let mut reader = data.as_slice();
        match read_server_reply(&mut reader, T, true).await.unwrap() {
            ServerReply::Hello(h) => assert_eq!(h.ocsp_response.as_deref(), Some(&ocsp[..])),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_connection_before_hello_is_an_error() {
        let mut reader: &[u8] = &[];
        let err = read_server_reply(&mut reader, T, false).await.unwrap_err();
        assert!(matches!(err, TlsProbeError::Closed));
    }

    #[tokio::test]
    async fn parses_ssl2_server_hello() {
        let mut msg = vec![SSL2_MT_SERVER_HELLO, 0, 1];
        put_u16(&mut msg, 0x0002);
        put_u16(&mut msg, 2); // certificate
        put_u16(&mut msg, 6); // two cipher specs
        put_u16(&mut msg, 0);
        msg.extend_from_slice(&[0xaa, 0xbb]);
        msg.extend_from_slice(&[0x01, 0x00, 0x80, 0x07, 0x00, 0xc0]);
        let mut data = Vec::new();
        put_u16(&mut data, 0x8000 | msg.len() as u16);
        data.extend_from_slice(&msg);

        let mut reader = data.as_slice();
        match read_ssl2_reply(&mut reader, T).await.unwrap() {
            Ssl2Reply::Hello { cipher_kinds, .. } => {
                assert_eq!(cipher_kinds, vec![0x010080, 0x0700c0]);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn ssl2_hello_encodes_three_byte_kinds() {
        let hello = ssl2_client_hello(SSL2_CIPHER_KINDS);
        let len = usize::from(u16::from_be_bytes([hello[0], hello[1]]) & 0x7fff);
        assert_eq!(len, hello.len() - 2);
        assert_eq!(hello[2], SSL2_MT_CLIENT_HELLO);
        assert_eq!(&hello[11..14], &[0x01, 0x00, 0x80]);
    }
}
