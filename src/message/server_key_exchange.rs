use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::types::{NamedGroup, SignatureScheme};
use crate::Error;

/// ECCurveType.named_curve (RFC 8422 Section 5.4).
const NAMED_CURVE: u8 = 3;

/// ECDHE ServerKeyExchange (RFC 8422 Section 5.4).
///
/// ```text
/// struct {
///     ECParameters curve_params;   // named_curve(3) || NamedGroup
///     ECPoint      public;         // opaque point <1..2^8-1>
/// } ServerECDHParams;
///
/// struct {
///     ServerECDHParams params;
///     digitally-signed struct { ... } signed_params;
/// } ServerKeyExchange;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub group: NamedGroup,
    pub public: Vec<u8>,
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

impl ServerKeyExchange {
    /// The ServerECDHParams bytes covered by the signature.
    pub fn params(group: NamedGroup, public: &[u8]) -> Vec<u8> {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        w.put_u8(NAMED_CURVE);
        w.put_u16(group.as_u16());
        w.put_vec_u8(|w| w.put_bytes(public));
        buf.into_vec()
    }

    /// client_random || server_random || ServerECDHParams
    pub fn signed_message(
        client_random: &[u8; 32],
        server_random: &[u8; 32],
        group: NamedGroup,
        public: &[u8],
    ) -> Vec<u8> {
        let mut message = Vec::with_capacity(64 + 4 + public.len());
        message.extend_from_slice(client_random);
        message.extend_from_slice(server_random);
        message.extend_from_slice(&Self::params(group, public));
        message
    }

    pub fn parse(r: &mut Reader<'_>) -> Result<ServerKeyExchange, Error> {
        if r.read_u8()? != NAMED_CURVE {
            return Err(Error::IllegalParameter("curve type".into()));
        }
        let group = NamedGroup::from_u16(r.read_u16()?);
        let public = r.read_vec_u8()?.to_vec();
        let scheme = SignatureScheme::from_u16(r.read_u16()?);
        let signature = r.read_vec_u16()?.to_vec();
        r.expect_end("ServerKeyExchange")?;

        Ok(ServerKeyExchange {
            group,
            public,
            scheme,
            signature,
        })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_bytes(&Self::params(self.group, &self.public));
        w.put_u16(self.scheme.as_u16());
        w.put_vec_u16(|w| w.put_bytes(&self.signature));
    }
}
