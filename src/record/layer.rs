use std::fmt;
use std::ops::Range;

use log::trace;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

use crate::buffer::{Buf, TmpBuf};
use crate::config::MAX_FRAGMENT_LEN;
use crate::crypto::{Aad, CryptoProvider, HmacProvider, Nonce, RecordCipher, SecureRandom};
use crate::crypto::GCM_EXPLICIT_NONCE_LEN;
use crate::suites::{BulkCipher, CipherSuiteDescriptor};
use crate::types::{CipherSuite, ContentType, HashAlgorithm};
use crate::Error;

use super::{RawRecord, LEGACY_RECORD_VERSION};

/// How the per-record nonce or IV is formed.
enum NonceMode {
    /// RFC 5288: 4 byte salt, 8 byte explicit nonce on the wire.
    Tls12Gcm([u8; 4]),
    /// RFC 8446 / RFC 7905: iv XOR sequence number, nothing on the wire.
    Xor([u8; 12]),
    /// RFC 5246 block cipher: random IV on the wire, HMAC over the plaintext.
    Cbc(Buf),
}

/// Keys for one direction of one epoch.
pub struct Protection {
    descriptor: &'static CipherSuiteDescriptor,
    cipher: RecordCipher,
    mode: NonceMode,
    hmac: &'static dyn HmacProvider,
    random: &'static dyn SecureRandom,
}

impl Protection {
    /// TLS 1.2 protection from one direction's part of the key block.
    ///
    /// `iv` is the 4 byte GCM salt, the 12 byte ChaCha20 IV or empty for CBC.
    /// `mac_key` is only used by CBC suites.
    pub fn tls12(
        provider: &CryptoProvider,
        descriptor: &'static CipherSuiteDescriptor,
        key: &[u8],
        iv: &[u8],
        mac_key: &[u8],
    ) -> Result<Self, Error> {
        let mode = match descriptor.bulk {
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => {
                NonceMode::Tls12Gcm(iv.try_into().map_err(|_| bad_iv(iv))?)
            }
            BulkCipher::ChaCha20Poly1305 => NonceMode::Xor(iv.try_into().map_err(|_| bad_iv(iv))?),
            BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc => NonceMode::Cbc(Buf::from_slice(mac_key)),
        };
        Self::build(provider, descriptor, key, mode)
    }

    /// TLS 1.3 protection from a traffic key and IV.
    pub fn tls13(
        provider: &CryptoProvider,
        descriptor: &'static CipherSuiteDescriptor,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Self, Error> {
        let mode = NonceMode::Xor(iv.try_into().map_err(|_| bad_iv(iv))?);
        Self::build(provider, descriptor, key, mode)
    }

    fn build(
        provider: &CryptoProvider,
        descriptor: &'static CipherSuiteDescriptor,
        key: &[u8],
        mode: NonceMode,
    ) -> Result<Self, Error> {
        let factory = provider
            .find_cipher_suite(descriptor.suite)
            .ok_or(Error::UnsupportedCipherSuite)?;
        let cipher = factory.create_cipher(key).map_err(Error::CryptoError)?;

        Ok(Protection {
            descriptor,
            cipher,
            mode,
            hmac: provider.hmac_provider,
            random: provider.secure_random,
        })
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.descriptor.suite
    }

    fn is_tls13(&self) -> bool {
        self.descriptor.is_tls13()
    }

    /// Protect one fragment and append the finished record to `out`.
    fn seal(
        &mut self,
        seq: u64,
        content_type: ContentType,
        plaintext: &[u8],
        out: &mut Buf,
    ) -> Result<(), Error> {
        let tls13 = self.is_tls13();
        let tag_len = self.descriptor.tag_len;
        let suite = self.descriptor.suite;
        let Protection {
            cipher,
            mode,
            hmac,
            random,
            ..
        } = self;

        match (mode, cipher) {
            (NonceMode::Xor(iv), RecordCipher::Aead(c)) if tls13 => {
                // TLSInnerPlaintext: content || type, no padding.
                let mut data = Buf::with_capacity(plaintext.len() + 1 + tag_len);
                data.extend_from_slice(plaintext);
                data.push(content_type.as_u8());
                let aad = Aad::tls13((data.len() + tag_len) as u16);
                c.encrypt(&mut data, aad, Nonce::xor(iv, seq))
                    .map_err(Error::CryptoError)?;

                write_header(out, ContentType::ApplicationData, data.len());
                out.extend_from_slice(&data);
            }
            (NonceMode::Xor(iv), RecordCipher::Aead(c)) => {
                let aad = Aad::tls12(seq, content_type, plaintext.len() as u16);
                let mut data = Buf::with_capacity(plaintext.len() + tag_len);
                data.extend_from_slice(plaintext);
                c.encrypt(&mut data, aad, Nonce::xor(iv, seq))
                    .map_err(Error::CryptoError)?;

                write_header(out, content_type, data.len());
                out.extend_from_slice(&data);
            }
            (NonceMode::Tls12Gcm(salt), RecordCipher::Aead(c)) => {
                // The sequence number doubles as the explicit nonce.
                let explicit = seq.to_be_bytes();
                let aad = Aad::tls12(seq, content_type, plaintext.len() as u16);
                let mut data = Buf::with_capacity(plaintext.len() + tag_len);
                data.extend_from_slice(plaintext);
                c.encrypt(&mut data, aad, Nonce::tls12_gcm(salt, &explicit))
                    .map_err(Error::CryptoError)?;

                write_header(out, content_type, GCM_EXPLICIT_NONCE_LEN + data.len());
                out.extend_from_slice(&explicit);
                out.extend_from_slice(&data);
            }
            (NonceMode::Cbc(mac_key), RecordCipher::Block(c)) => {
                let block = c.block_len();
                let mut data = Buf::with_capacity(plaintext.len() + tag_len + block);
                data.extend_from_slice(plaintext);

                let mut mac = Buf::new();
                cbc_mac(*hmac, mac_key, seq, content_type, plaintext, &mut mac)?;
                data.extend_from_slice(&mac);

                let pad = (block - (data.len() + 1) % block) % block;
                for _ in 0..=pad {
                    data.push(pad as u8);
                }

                let mut iv = vec![0u8; block];
                random.fill(&mut iv).map_err(Error::CryptoError)?;
                c.encrypt(&iv, &mut data).map_err(Error::CryptoError)?;

                write_header(out, content_type, iv.len() + data.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&data);
            }
            _ => {
                return Err(Error::CryptoError(format!(
                    "cipher does not match suite {:?}",
                    suite
                )))
            }
        }

        Ok(())
    }

    /// Remove protection in place.
    ///
    /// Returns the real content type and where the plaintext sits in
    /// `payload`. Every authentication failure is [`Error::BadRecordMac`].
    fn open(
        &mut self,
        seq: u64,
        content_type: ContentType,
        payload: &mut [u8],
    ) -> Result<(ContentType, Range<usize>), Error> {
        let tls13 = self.is_tls13();
        let tag_len = self.descriptor.tag_len;
        let suite = self.descriptor.suite;
        let Protection {
            cipher, mode, hmac, ..
        } = self;

        match (mode, cipher) {
            (NonceMode::Xor(iv), RecordCipher::Aead(c)) if tls13 => {
                if content_type != ContentType::ApplicationData {
                    return Err(Error::UnexpectedMessage(format!(
                        "unprotected {:?} record after key change",
                        content_type
                    )));
                }
                if payload.len() < tag_len {
                    return Err(Error::BadRecordMac);
                }
                let aad = Aad::tls13(payload.len() as u16);
                let len = {
                    let mut buf = TmpBuf::new(payload);
                    c.decrypt(&mut buf, aad, Nonce::xor(iv, seq))
                        .map_err(|_| Error::BadRecordMac)?;
                    buf.len()
                };

                // Strip the zero padding; the last non-zero byte is the type.
                let inner = &payload[..len];
                let end = inner
                    .iter()
                    .rposition(|b| *b != 0)
                    .ok_or_else(|| Error::UnexpectedMessage("record without content type".into()))?;
                if end > MAX_FRAGMENT_LEN {
                    return Err(Error::RecordOverflow(end));
                }
                let inner_type = ContentType::from_u8(inner[end]);
                match inner_type {
                    ContentType::Handshake | ContentType::Alert | ContentType::ApplicationData => {}
                    other => {
                        return Err(Error::UnexpectedMessage(format!(
                            "protected {:?} record",
                            other
                        )))
                    }
                }
                Ok((inner_type, 0..end))
            }
            (NonceMode::Xor(iv), RecordCipher::Aead(c)) => {
                if payload.len() < tag_len {
                    return Err(Error::BadRecordMac);
                }
                let pt_len = payload.len() - tag_len;
                let aad = Aad::tls12(seq, content_type, pt_len as u16);
                let mut buf = TmpBuf::new(payload);
                c.decrypt(&mut buf, aad, Nonce::xor(iv, seq))
                    .map_err(|_| Error::BadRecordMac)?;
                Ok((content_type, 0..pt_len))
            }
            (NonceMode::Tls12Gcm(salt), RecordCipher::Aead(c)) => {
                if payload.len() < GCM_EXPLICIT_NONCE_LEN + tag_len {
                    return Err(Error::BadRecordMac);
                }
                let pt_len = payload.len() - GCM_EXPLICIT_NONCE_LEN - tag_len;
                let (explicit, body) = payload.split_at_mut(GCM_EXPLICIT_NONCE_LEN);
                let aad = Aad::tls12(seq, content_type, pt_len as u16);
                let nonce = Nonce::tls12_gcm(salt, explicit);
                let mut buf = TmpBuf::new(body);
                c.decrypt(&mut buf, aad, nonce)
                    .map_err(|_| Error::BadRecordMac)?;
                Ok((
                    content_type,
                    GCM_EXPLICIT_NONCE_LEN..GCM_EXPLICIT_NONCE_LEN + pt_len,
                ))
            }
            (NonceMode::Cbc(mac_key), RecordCipher::Block(c)) => {
                let block = c.block_len();
                let min = block + (tag_len + 1).div_ceil(block) * block;
                if payload.len() < min || (payload.len() - block) % block != 0 {
                    return Err(Error::BadRecordMac);
                }
                let (iv, data) = payload.split_at_mut(block);
                c.decrypt(iv, data).map_err(|_| Error::BadRecordMac)?;

                let pt_len = cbc_check(*hmac, mac_key, seq, content_type, data, tag_len)?;
                Ok((content_type, block..block + pt_len))
            }
            _ => Err(Error::CryptoError(format!(
                "cipher does not match suite {:?}",
                suite
            ))),
        }
    }
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protection")
            .field("suite", &self.descriptor.suite)
            .finish()
    }
}

impl Drop for Protection {
    fn drop(&mut self) {
        match &mut self.mode {
            NonceMode::Tls12Gcm(salt) => salt.fill(0),
            NonceMode::Xor(iv) => iv.fill(0),
            NonceMode::Cbc(mac_key) => mac_key.zeroize(),
        }
    }
}

fn bad_iv(iv: &[u8]) -> Error {
    Error::CryptoError(format!("unexpected IV length {}", iv.len()))
}

/// HMAC(mac_key, seq || type || version || length || plaintext)
fn cbc_mac(
    hmac: &dyn HmacProvider,
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    plaintext: &[u8],
    out: &mut Buf,
) -> Result<(), Error> {
    hmac.hmac(
        HashAlgorithm::SHA256,
        mac_key,
        &[
            &seq.to_be_bytes(),
            &[content_type.as_u8()],
            &LEGACY_RECORD_VERSION.to_be_bytes(),
            &(plaintext.len() as u16).to_be_bytes(),
            plaintext,
        ],
        out,
    )
    .map_err(Error::CryptoError)
}

/// Check padding and MAC of a decrypted CBC record.
///
/// The padding bytes and the MAC are always checked over the same amount of
/// data so a bad pad byte and a bad MAC take the same path. Returns the
/// plaintext length.
fn cbc_check(
    hmac: &dyn HmacProvider,
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    data: &[u8],
    mac_len: usize,
) -> Result<usize, Error> {
    let n = data.len();
    let pad = data[n - 1];

    let fits = Choice::from((pad as usize + 1 + mac_len <= n) as u8);
    let pad_len = u64::conditional_select(&0, &(pad as u64), fits);
    let mut good = fits;

    for i in 0..256.min(n) {
        let in_pad = !(i as u64).ct_gt(&pad_len);
        good &= !in_pad | data[n - 1 - i].ct_eq(&pad);
    }

    let pt_len = n - pad_len as usize - 1 - mac_len;
    let mut expected = Buf::new();
    cbc_mac(hmac, mac_key, seq, content_type, &data[..pt_len], &mut expected)?;
    good &= expected[..].ct_eq(&data[pt_len..pt_len + mac_len]);

    if bool::from(good) {
        Ok(pt_len)
    } else {
        Err(Error::BadRecordMac)
    }
}

fn write_header(out: &mut Buf, content_type: ContentType, len: usize) {
    out.push(content_type.as_u8());
    out.extend_from_slice(&LEGACY_RECORD_VERSION.to_be_bytes());
    out.extend_from_slice(&(len as u16).to_be_bytes());
}

/// Record protection state for both directions.
///
/// Starts out in plaintext. Installing a new protection for a direction
/// resets that direction's sequence number to zero.
#[derive(Default)]
pub struct RecordLayer {
    read: Option<Protection>,
    write: Option<Protection>,
    read_seq: u64,
    write_seq: u64,
}

impl RecordLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_protection(&mut self, protection: Protection) {
        trace!("Read protection now {:?}", protection.cipher_suite());
        self.read = Some(protection);
        self.read_seq = 0;
    }

    pub fn set_write_protection(&mut self, protection: Protection) {
        trace!("Write protection now {:?}", protection.cipher_suite());
        self.write = Some(protection);
        self.write_seq = 0;
    }

    pub fn is_read_protected(&self) -> bool {
        self.read.is_some()
    }

    pub fn is_write_protected(&self) -> bool {
        self.write.is_some()
    }

    pub fn read_seq(&self) -> u64 {
        self.read_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Seal `data` as one or more records of at most `max_fragment` bytes.
    ///
    /// Empty data still produces one (empty) record.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        data: &[u8],
        max_fragment: usize,
        out: &mut Buf,
    ) -> Result<(), Error> {
        let max_fragment = max_fragment.clamp(1, MAX_FRAGMENT_LEN);
        if data.is_empty() {
            return self.seal_one(content_type, data, out);
        }
        for fragment in data.chunks(max_fragment) {
            self.seal_one(content_type, fragment, out)?;
        }
        Ok(())
    }

    /// Write a record in the clear regardless of the current protection.
    ///
    /// Used for the TLS 1.3 middlebox compatibility ChangeCipherSpec.
    pub fn seal_plain(&mut self, content_type: ContentType, data: &[u8], out: &mut Buf) {
        write_header(out, content_type, data.len());
        out.extend_from_slice(data);
    }

    fn seal_one(
        &mut self,
        content_type: ContentType,
        fragment: &[u8],
        out: &mut Buf,
    ) -> Result<(), Error> {
        let Some(protection) = self.write.as_mut() else {
            self.seal_plain(content_type, fragment, out);
            return Ok(());
        };
        if self.write_seq == u64::MAX {
            return Err(Error::CryptoError("write sequence number exhausted".into()));
        }
        protection.seal(self.write_seq, content_type, fragment, out)?;
        self.write_seq += 1;
        Ok(())
    }

    /// Remove protection from one record.
    ///
    /// Returns the real content type and the plaintext.
    pub fn open(&mut self, record: RawRecord) -> Result<(ContentType, Vec<u8>), Error> {
        let RawRecord {
            content_type,
            mut payload,
            ..
        } = record;

        let Some(protection) = self.read.as_mut() else {
            if payload.len() > MAX_FRAGMENT_LEN {
                return Err(Error::RecordOverflow(payload.len()));
            }
            return Ok((content_type, payload));
        };

        // Middlebox compatibility ChangeCipherSpec is never protected.
        if protection.is_tls13() && content_type == ContentType::ChangeCipherSpec {
            return Ok((content_type, payload));
        }

        if self.read_seq == u64::MAX {
            return Err(Error::CryptoError("read sequence number exhausted".into()));
        }
        let (real_type, range) = protection.open(self.read_seq, content_type, &mut payload)?;
        self.read_seq += 1;

        payload.truncate(range.end);
        payload.drain(..range.start);
        if payload.len() > MAX_FRAGMENT_LEN {
            return Err(Error::RecordOverflow(payload.len()));
        }

        Ok((real_type, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto;
    use crate::record::Deframer;
    use crate::suites::CIPHER_SUITES;

    fn protection(p: &CryptoProvider, d: &'static CipherSuiteDescriptor) -> Protection {
        let key = vec![0x11; d.key_len];
        let iv = vec![0x22; d.fixed_iv_len];
        if d.is_tls13() {
            Protection::tls13(p, d, &key, &iv).unwrap()
        } else {
            let mac_key = vec![0x33; d.mac_key_len];
            Protection::tls12(p, d, &key, &iv, &mac_key).unwrap()
        }
    }

    /// A sending and a receiving layer sharing the same keys.
    fn pair(suite: CipherSuite) -> (RecordLayer, RecordLayer) {
        let p = rust_crypto::default_provider();
        let d = suite.descriptor().unwrap();
        let mut tx = RecordLayer::new();
        tx.set_write_protection(protection(&p, d));
        let mut rx = RecordLayer::new();
        rx.set_read_protection(protection(&p, d));
        (tx, rx)
    }

    fn records(bytes: &[u8]) -> Vec<RawRecord> {
        let mut d = Deframer::new();
        d.push(bytes);
        let mut out = Vec::new();
        while let Some(r) = d.next_record().unwrap() {
            out.push(r);
        }
        out
    }

    #[test]
    fn every_suite_protects_and_counts() {
        for d in CIPHER_SUITES {
            let (mut tx, mut rx) = pair(d.suite);
            let mut wire = Buf::new();
            tx.seal(ContentType::ApplicationData, b"hello", MAX_FRAGMENT_LEN, &mut wire)
                .unwrap();
            tx.seal(ContentType::Handshake, b"world!", MAX_FRAGMENT_LEN, &mut wire)
                .unwrap();
            assert_eq!(tx.write_seq(), 2);

            let recs = records(&wire);
            assert_eq!(recs.len(), 2, "{:?}", d.suite);
            if d.is_tls13() {
                assert_eq!(recs[1].content_type, ContentType::ApplicationData);
            } else {
                assert_eq!(recs[1].content_type, ContentType::Handshake);
            }

            let mut it = recs.into_iter();
            let (ct, pt) = rx.open(it.next().unwrap()).unwrap();
            assert_eq!((ct, &pt[..]), (ContentType::ApplicationData, &b"hello"[..]));
            let (ct, pt) = rx.open(it.next().unwrap()).unwrap();
            assert_eq!((ct, &pt[..]), (ContentType::Handshake, &b"world!"[..]));
            assert_eq!(rx.read_seq(), 2);
            assert_eq!(tx.read_seq(), 0);
        }
    }

    #[test]
    fn tampering_is_bad_record_mac() {
        for suite in [
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
            CipherSuite::RSA_AES128_CBC_SHA256,
        ] {
            let (mut tx, _) = pair(suite);
            let mut wire = Buf::new();
            tx.seal(ContentType::ApplicationData, b"attack at dawn", 100, &mut wire)
                .unwrap();
            let record = records(&wire).remove(0);

            for i in 0..record.payload.len() {
                let (_, mut rx) = pair(suite);
                let mut bad = record.clone();
                bad.payload[i] ^= 0x01;
                let err = rx.open(bad).unwrap_err();
                assert!(matches!(err, Error::BadRecordMac), "{:?} byte {}", suite, i);
            }
        }
    }

    #[test]
    fn truncated_tag_is_bad_record_mac() {
        let (mut tx, mut rx) = pair(CipherSuite::TLS13_AES_128_GCM_SHA256);
        let mut wire = Buf::new();
        tx.seal(ContentType::ApplicationData, b"data", 100, &mut wire)
            .unwrap();
        let mut record = records(&wire).remove(0);
        record.payload.pop();
        assert!(matches!(rx.open(record), Err(Error::BadRecordMac)));

        let (_, mut rx) = pair(CipherSuite::ECDHE_RSA_AES128_GCM_SHA256);
        let short = RawRecord {
            content_type: ContentType::ApplicationData,
            version: 0x0303,
            payload: vec![0; 10],
        };
        assert!(matches!(rx.open(short), Err(Error::BadRecordMac)));
    }

    #[test]
    fn cbc_bad_padding_is_bad_record_mac() {
        let p = rust_crypto::default_provider();
        let d = CipherSuite::RSA_AES128_CBC_SHA256.descriptor().unwrap();
        let (_, mut rx) = pair(d.suite);

        // Valid MAC, padding bytes disagree with the pad length.
        let mut data = b"abc".to_vec();
        let mut mac = Buf::new();
        cbc_mac(p.hmac_provider, &[0x33; 32], 0, ContentType::ApplicationData, b"abc", &mut mac)
            .unwrap();
        data.extend_from_slice(&mac);
        let mut padding = [12u8; 13];
        padding[5] = 11;
        data.extend_from_slice(&padding);
        assert_eq!(data.len() % 16, 0);

        let iv = [0x44u8; 16];
        let RecordCipher::Block(mut c) = p
            .find_cipher_suite(d.suite)
            .unwrap()
            .create_cipher(&[0x11; 16])
            .unwrap()
        else {
            panic!("expected a block cipher");
        };
        c.encrypt(&iv, &mut data).unwrap();

        let mut payload = iv.to_vec();
        payload.extend_from_slice(&data);
        let record = RawRecord {
            content_type: ContentType::ApplicationData,
            version: 0x0303,
            payload,
        };
        assert!(matches!(rx.open(record), Err(Error::BadRecordMac)));
    }

    #[test]
    fn tls13_padding_is_stripped() {
        let p = rust_crypto::default_provider();
        let d = CipherSuite::TLS13_AES_128_GCM_SHA256.descriptor().unwrap();
        let (_, mut rx) = pair(d.suite);

        let RecordCipher::Aead(mut c) = p
            .find_cipher_suite(d.suite)
            .unwrap()
            .create_cipher(&[0x11; 16])
            .unwrap()
        else {
            panic!("expected an AEAD");
        };
        let mut data = Buf::from_slice(b"hi\x17\x00\x00\x00");
        c.encrypt(&mut data, Aad::tls13(6 + 16), Nonce::xor(&[0x22; 12], 0))
            .unwrap();

        let record = RawRecord {
            content_type: ContentType::ApplicationData,
            version: 0x0303,
            payload: data.into_vec(),
        };
        let (ct, pt) = rx.open(record).unwrap();
        assert_eq!(ct, ContentType::ApplicationData);
        assert_eq!(pt, b"hi");
    }

    #[test]
    fn fragments_at_max_len() {
        let (mut tx, mut rx) = pair(CipherSuite::TLS13_AES_128_GCM_SHA256);
        let mut wire = Buf::new();
        tx.seal(ContentType::ApplicationData, &[7u8; 250], 100, &mut wire)
            .unwrap();
        let recs = records(&wire);
        assert_eq!(recs.len(), 3);

        let mut total = Vec::new();
        for r in recs {
            total.extend(rx.open(r).unwrap().1);
        }
        assert_eq!(total, vec![7u8; 250]);
    }

    #[test]
    fn tls13_passes_change_cipher_spec_through() {
        let (_, mut rx) = pair(CipherSuite::TLS13_AES_128_GCM_SHA256);
        let ccs = RawRecord {
            content_type: ContentType::ChangeCipherSpec,
            version: 0x0303,
            payload: vec![1],
        };
        assert_eq!(
            rx.open(ccs).unwrap(),
            (ContentType::ChangeCipherSpec, vec![1])
        );
        assert_eq!(rx.read_seq(), 0);

        let handshake = RawRecord {
            content_type: ContentType::Handshake,
            version: 0x0303,
            payload: vec![0; 40],
        };
        assert!(matches!(
            rx.open(handshake),
            Err(Error::UnexpectedMessage(_))
        ));
    }
}
