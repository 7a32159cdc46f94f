//! Schema registry wire framing.
//!
//! Every framed message is `[magic: u8][schema id: u32 big-endian][avro payload]`.

use crate::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Leading byte of every framed message.
pub const MAGIC_BYTE: u8 = 0;

/// Magic byte plus schema id.
pub const HEADER_LEN: usize = 5;

/// A framed message split into its schema id and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub schema_id: u32,
    pub payload: &'a [u8],
}

pub fn encode_frame(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf.put_slice(payload);
    buf.to_vec()
}

pub fn decode_frame(bytes: &[u8]) -> Result<Frame<'_>> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Framing(format!(
            "message of {} bytes is shorter than the {} byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let (mut header, payload) = bytes.split_at(HEADER_LEN);
    let magic = header.get_u8();
    if magic != MAGIC_BYTE {
        return Err(Error::Framing(format!(
            "unknown magic byte {:#04x}, expected {:#04x}",
            magic, MAGIC_BYTE
        )));
    }

    Ok(Frame {
        schema_id: header.get_u32(),
        payload,
    })
}
