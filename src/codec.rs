//! Wire codec: a forward-only reader and an append-only writer.
//!
//! All TLS integers are big-endian. Variable-length vectors carry a 1, 2 or 3
//! byte length prefix. A read that runs past the end fails with
//! [`Error::TruncatedInput`] and leaves the cursor at the end of the buffer.

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u24, be_u32, be_u64, be_u8};
use nom::IResult;

use crate::buffer::Buf;
use crate::Error;

/// Cursor over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn run<T>(&mut self, parser: impl FnOnce(&'a [u8]) -> IResult<&'a [u8], T>) -> Result<T, Error> {
        match parser(self.rest()) {
            Ok((rest, value)) => {
                self.pos = self.buf.len() - rest.len();
                Ok(value)
            }
            Err(_) => {
                self.pos = self.buf.len();
                Err(Error::TruncatedInput)
            }
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.run(be_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.run(be_u16)
    }

    pub fn read_u24(&mut self) -> Result<u32, Error> {
        self.run(be_u24)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.run(be_u32)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.run(be_u64)
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        self.run(|i| take(len)(i))
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// `opaque x<0..2^8-1>`
    pub fn read_vec_u8(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// `opaque x<0..2^16-1>`
    pub fn read_vec_u16(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// `opaque x<0..2^24-1>`
    pub fn read_vec_u24(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u24()? as usize;
        self.read_bytes(len)
    }

    /// Fail with `MalformedMessage` unless every byte was consumed.
    pub fn expect_end(&self, what: &str) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::MalformedMessage(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                what
            )))
        }
    }
}

/// Append-only writer into a [`Buf`].
pub struct Writer<'b> {
    out: &'b mut Buf,
}

impl<'b> Writer<'b> {
    pub fn new(out: &'b mut Buf) -> Self {
        Writer { out }
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.out.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u24(&mut self, v: u32) {
        debug_assert!(v < 1 << 24);
        self.out.extend_from_slice(&v.to_be_bytes()[1..]);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    /// Write a body with a 1-byte length prefix.
    pub fn put_vec_u8(&mut self, body: impl FnOnce(&mut Writer<'_>)) {
        self.put_prefixed(1, body);
    }

    /// Write a body with a 2-byte length prefix.
    pub fn put_vec_u16(&mut self, body: impl FnOnce(&mut Writer<'_>)) {
        self.put_prefixed(2, body);
    }

    /// Write a body with a 3-byte length prefix.
    pub fn put_vec_u24(&mut self, body: impl FnOnce(&mut Writer<'_>)) {
        self.put_prefixed(3, body);
    }

    fn put_prefixed(&mut self, width: usize, body: impl FnOnce(&mut Writer<'_>)) {
        let at = self.out.len();
        self.out.resize(at + width, 0);
        {
            let mut inner = Writer::new(&mut *self.out);
            body(&mut inner);
        }
        let len = self.out.len() - at - width;
        debug_assert!(len < 1 << (8 * width), "length does not fit prefix");
        let be = (len as u32).to_be_bytes();
        self.out[at..at + width].copy_from_slice(&be[4 - width..]);
    }
}
