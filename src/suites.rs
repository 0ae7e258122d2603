//! Cipher suite catalogue offered by the probes.

use crate::transcode::{Inspect, Node};
use crate::types::TlsVersion;

/// A cipher suite known to the scanner. SSL 2.0 kinds use their 3-byte id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite {
    pub id: u32,
    pub name: &'static str,
    pub openssl_name: &'static str,
    pub key_size: u16,
}

impl CipherSuite {
    const fn new(id: u32, name: &'static str, openssl_name: &'static str, key_size: u16) -> Self {
        Self {
            id,
            name,
            openssl_name,
            key_size,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.contains("_anon_")
    }
}

impl Inspect for CipherSuite {
    fn inspect(&self) -> Node {
        Node::object("CipherSuite")
            .field("name", self.name)
            .field("openssl_name", self.openssl_name)
            .field("is_anonymous", &self.is_anonymous())
            .field("key_size", &self.key_size)
            .node("_id", Node::UInt(u64::from(self.id)))
            .build()
    }
}

pub const SSL2_CIPHER_KINDS: &[CipherSuite] = &[
    CipherSuite::new(0x010080, "SSL_CK_RC4_128_WITH_MD5", "RC4-MD5", 128),
    CipherSuite::new(0x020080, "SSL_CK_RC4_128_EXPORT40_WITH_MD5", "EXP-RC4-MD5", 40),
    CipherSuite::new(0x030080, "SSL_CK_RC2_128_CBC_WITH_MD5", "RC2-CBC-MD5", 128),
    CipherSuite::new(0x040080, "SSL_CK_RC2_128_CBC_EXPORT40_WITH_MD5", "EXP-RC2-CBC-MD5", 40),
    CipherSuite::new(0x050080, "SSL_CK_IDEA_128_CBC_WITH_MD5", "IDEA-CBC-MD5", 128),
    CipherSuite::new(0x060040, "SSL_CK_DES_64_CBC_WITH_MD5", "DES-CBC-MD5", 56),
    CipherSuite::new(0x0700C0, "SSL_CK_DES_192_EDE3_CBC_WITH_MD5", "DES-CBC3-MD5", 168),
];

/// Suites valid from SSL 3.0 through TLS 1.2.
pub const LEGACY_SUITES: &[CipherSuite] = &[
    CipherSuite::new(0x0001, "TLS_RSA_WITH_NULL_MD5", "NULL-MD5", 0),
    CipherSuite::new(0x0002, "TLS_RSA_WITH_NULL_SHA", "NULL-SHA", 0),
    CipherSuite::new(0x0003, "TLS_RSA_EXPORT_WITH_RC4_40_MD5", "EXP-RC4-MD5", 40),
    CipherSuite::new(0x0004, "TLS_RSA_WITH_RC4_128_MD5", "RC4-MD5", 128),
    CipherSuite::new(0x0005, "TLS_RSA_WITH_RC4_128_SHA", "RC4-SHA", 128),
    CipherSuite::new(0x0008, "TLS_RSA_EXPORT_WITH_DES40_CBC_SHA", "EXP-DES-CBC-SHA", 40),
    CipherSuite::new(0x0009, "TLS_RSA_WITH_DES_CBC_SHA", "DES-CBC-SHA", 56),
    CipherSuite::new(0x000A, "TLS_RSA_WITH_3DES_EDE_CBC_SHA", "DES-CBC3-SHA", 168),
    CipherSuite::new(0x0016, "TLS_DHE_RSA_WITH_3DES_EDE_CBC_SHA", "EDH-RSA-DES-CBC3-SHA", 168),
    CipherSuite::new(0x0018, "TLS_DH_anon_WITH_RC4_128_MD5", "ADH-RC4-MD5", 128),
    CipherSuite::new(0x001B, "TLS_DH_anon_WITH_3DES_EDE_CBC_SHA", "ADH-DES-CBC3-SHA", 168),
    CipherSuite::new(0x002F, "TLS_RSA_WITH_AES_128_CBC_SHA", "AES128-SHA", 128),
    CipherSuite::new(0x0033, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA", "DHE-RSA-AES128-SHA", 128),
    CipherSuite::new(0x0034, "TLS_DH_anon_WITH_AES_128_CBC_SHA", "ADH-AES128-SHA", 128),
    CipherSuite::new(0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA", "AES256-SHA", 256),
    CipherSuite::new(0x0039, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA", "DHE-RSA-AES256-SHA", 256),
    CipherSuite::new(0x003A, "TLS_DH_anon_WITH_AES_256_CBC_SHA", "ADH-AES256-SHA", 256),
    CipherSuite::new(0x0041, "TLS_RSA_WITH_CAMELLIA_128_CBC_SHA", "CAMELLIA128-SHA", 128),
    CipherSuite::new(0x0084, "TLS_RSA_WITH_CAMELLIA_256_CBC_SHA", "CAMELLIA256-SHA", 256),
    CipherSuite::new(0x0096, "TLS_RSA_WITH_SEED_CBC_SHA", "SEED-SHA", 128),
    CipherSuite::new(0xC007, "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA", "ECDHE-ECDSA-RC4-SHA", 128),
    CipherSuite::new(0xC008, "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA", "ECDHE-ECDSA-DES-CBC3-SHA", 168),
    CipherSuite::new(0xC009, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", "ECDHE-ECDSA-AES128-SHA", 128),
    CipherSuite::new(0xC00A, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", "ECDHE-ECDSA-AES256-SHA", 256),
    CipherSuite::new(0xC011, "TLS_ECDHE_RSA_WITH_RC4_128_SHA", "ECDHE-RSA-RC4-SHA", 128),
    CipherSuite::new(0xC012, "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA", "ECDHE-RSA-DES-CBC3-SHA", 168),
    CipherSuite::new(0xC013, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", "ECDHE-RSA-AES128-SHA", 128),
    CipherSuite::new(0xC014, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", "ECDHE-RSA-AES256-SHA", 256),
    CipherSuite::new(0xC018, "TLS_ECDH_anon_WITH_AES_128_CBC_SHA", "AECDH-AES128-SHA", 128),
    CipherSuite::new(0xC019, "TLS_ECDH_anon_WITH_AES_256_CBC_SHA", "AECDH-AES256-SHA", 256),
];

/// Suites introduced by TLS 1.2.
pub const TLS12_SUITES: &[CipherSuite] = &[
    CipherSuite::new(0x003C, "TLS_RSA_WITH_AES_128_CBC_SHA256", "AES128-SHA256", 128),
    CipherSuite::new(0x003D, "TLS_RSA_WITH_AES_256_CBC_SHA256", "AES256-SHA256", 256),
    CipherSuite::new(0x0067, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256", "DHE-RSA-AES128-SHA256", 128),
    CipherSuite::new(0x006B, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256", "DHE-RSA-AES256-SHA256", 256),
    CipherSuite::new(0x009C, "TLS_RSA_WITH_AES_128_GCM_SHA256", "AES128-GCM-SHA256", 128),
    CipherSuite::new(0x009D, "TLS_RSA_WITH_AES_256_GCM_SHA384", "AES256-GCM-SHA384", 256),
    CipherSuite::new(0x009E, "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256", "DHE-RSA-AES128-GCM-SHA256", 128),
    CipherSuite::new(0x009F, "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384", "DHE-RSA-AES256-GCM-SHA384", 256),
    CipherSuite::new(0x00A6, "TLS_DH_anon_WITH_AES_128_GCM_SHA256", "ADH-AES128-GCM-SHA256", 128),
    CipherSuite::new(0xC023, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256", "ECDHE-ECDSA-AES128-SHA256", 128),
    CipherSuite::new(0xC024, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384", "ECDHE-ECDSA-AES256-SHA384", 256),
    CipherSuite::new(0xC027, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256", "ECDHE-RSA-AES128-SHA256", 128),
    CipherSuite::new(0xC028, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384", "ECDHE-RSA-AES256-SHA384", 256),
    CipherSuite::new(0xC02B, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", "ECDHE-ECDSA-AES128-GCM-SHA256", 128),
    CipherSuite::new(0xC02C, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", "ECDHE-ECDSA-AES256-GCM-SHA384", 256),
    CipherSuite::new(0xC02F, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", "ECDHE-RSA-AES128-GCM-SHA256", 128),
    CipherSuite::new(0xC030, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", "ECDHE-RSA-AES256-GCM-SHA384", 256),
    CipherSuite::new(0xCCA8, "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256", "ECDHE-RSA-CHACHA20-POLY1305", 256),
    CipherSuite::new(0xCCA9, "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256", "ECDHE-ECDSA-CHACHA20-POLY1305", 256),
    CipherSuite::new(0xCCAA, "TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256", "DHE-RSA-CHACHA20-POLY1305", 256),
];

pub const TLS13_SUITES: &[CipherSuite] = &[
    CipherSuite::new(0x1301, "TLS_AES_128_GCM_SHA256", "TLS_AES_128_GCM_SHA256", 128),
    CipherSuite::new(0x1302, "TLS_AES_256_GCM_SHA384", "TLS_AES_256_GCM_SHA384", 256),
    CipherSuite::new(0x1303, "TLS_CHACHA20_POLY1305_SHA256", "TLS_CHACHA20_POLY1305_SHA256", 256),
    CipherSuite::new(0x1304, "TLS_AES_128_CCM_SHA256", "TLS_AES_128_CCM_SHA256", 128),
    CipherSuite::new(0x1305, "TLS_AES_128_CCM_8_SHA256", "TLS_AES_128_CCM_8_SHA256", 128),
];

/// Every suite the scanner offers for `version`, in offer order.
pub fn suites_for(version: TlsVersion) -> Vec<CipherSuite> {
    match version {
        TlsVersion::Ssl2_0 => SSL2_CIPHER_KINDS.to_vec(),
        TlsVersion::Ssl3_0 | TlsVersion::Tls1_0 | TlsVersion::Tls1_1 => LEGACY_SUITES.to_vec(),
        TlsVersion::Tls1_2 => TLS12_SUITES.iter().chain(LEGACY_SUITES).copied().collect(),
        TlsVersion::Tls1_3 => TLS13_SUITES.to_vec(),
    }
}

/// Suites offered by the connectivity check: everything from TLS 1.3 down.
pub fn connectivity_suites() -> Vec<CipherSuite> {
    TLS13_SUITES
        .iter()
        .chain(TLS12_SUITES)
        .chain(LEGACY_SUITES)
        .copied()
        .collect()
}

pub fn find_by_id(id: u32) -> Option<CipherSuite> {
    TLS13_SUITES
        .iter()
        .chain(TLS12_SUITES)
        .chain(LEGACY_SUITES)
        .chain(SSL2_CIPHER_KINDS)
        .find(|s| s.id == id)
        .copied()
}
