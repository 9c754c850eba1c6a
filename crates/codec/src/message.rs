//! STUN message header framing: encoding a Binding request and decoding a
//! Binding response.
//!
//! Wire format (RFC 5389 section 6):
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0 0|     STUN Message Type     |         Message Length       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Magic Cookie                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! |                     Transaction ID (96 bits)                 |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::{attribute::AttributeType, pad_len, Error, TransactionId, MAGIC_COOKIE};

use bytes::{BufMut, BytesMut};

const HEADER_LEN: usize = 20;

/// STUN message type, restricted to the Binding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    BindingRequest,
    BindingSuccess,
    BindingError,
    /// Any other 14-bit type this toolkit does not produce or act on.
    Other(u16),
}

const TYPE_BINDING_REQUEST: u16 = 0x0001;
const TYPE_BINDING_SUCCESS: u16 = 0x0101;
const TYPE_BINDING_ERROR: u16 = 0x0111;

impl From<u16> for MessageType {
    fn from(value: u16) -> Self {
        match value {
            TYPE_BINDING_REQUEST => Self::BindingRequest,
            TYPE_BINDING_SUCCESS => Self::BindingSuccess,
            TYPE_BINDING_ERROR => Self::BindingError,
            other => Self::Other(other),
        }
    }
}

impl From<MessageType> for u16 {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::BindingRequest => TYPE_BINDING_REQUEST,
            MessageType::BindingSuccess => TYPE_BINDING_SUCCESS,
            MessageType::BindingError => TYPE_BINDING_ERROR,
            MessageType::Other(v) => v,
        }
    }
}

/// Encodes a bare Binding request: a 20-byte header with no attributes.
pub fn encode_binding_request(transaction_id: &TransactionId) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN);
    buf.put_u16(TYPE_BINDING_REQUEST);
    buf.put_u16(0);
    buf.put_u32(MAGIC_COOKIE);
    buf.put_slice(transaction_id);
    buf
}

/// A decoded message: its type, transaction id, and the list of attributes
/// found, each as `(type, value bytes)`. Unknown attributes are preserved
/// untouched in their original order.
pub struct Message<'a> {
    pub message_type: MessageType,
    pub transaction_id: TransactionId,
    attributes: Vec<(AttributeType, &'a [u8])>,
}

impl<'a> Message<'a> {
    /// Looks up the first occurrence of `kind` among the decoded attributes.
    pub fn get(&self, kind: AttributeType) -> Option<&'a [u8]> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (AttributeType, &'a [u8])> + '_ {
        self.attributes.iter().copied()
    }
}

/// Decodes a STUN message from `bytes`.
///
/// Fails with [`Error::BadMagic`] if the cookie does not match,
/// [`Error::Truncated`] if the declared body length exceeds the available
/// bytes or an attribute header/value runs past the end of the buffer.
/// Padding bytes are skipped but not validated.
pub fn decode(bytes: &[u8]) -> Result<Message<'_>, Error> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Truncated);
    }

    let message_type = MessageType::from(u16::from_be_bytes([bytes[0], bytes[1]]));
    let body_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    let magic = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    if magic != MAGIC_COOKIE {
        return Err(Error::BadMagic);
    }

    let transaction_id: TransactionId = bytes[8..20].try_into().unwrap();

    if bytes.len() - HEADER_LEN < body_len {
        return Err(Error::Truncated);
    }

    let body = &bytes[HEADER_LEN..HEADER_LEN + body_len];
    let attributes = decode_attributes(body)?;

    Ok(Message {
        message_type,
        transaction_id,
        attributes,
    })
}

fn decode_attributes(mut body: &[u8]) -> Result<Vec<(AttributeType, &[u8])>, Error> {
    let mut attributes = Vec::with_capacity(8);

    while !body.is_empty() {
        if body.len() < 4 {
            return Err(Error::Truncated);
        }

        let kind = AttributeType::from(u16::from_be_bytes([body[0], body[1]]));
        let len = u16::from_be_bytes([body[2], body[3]]) as usize;

        if body.len() - 4 < len {
            return Err(Error::Truncated);
        }

        let value = &body[4..4 + len];
        attributes.push((kind, value));

        let padded = len + pad_len(len);
        if body.len() - 4 < padded {
            return Err(Error::Truncated);
        }

        body = &body[4 + padded..];
    }

    Ok(attributes)
}
