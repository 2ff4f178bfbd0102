use std::{borrow::Cow, io};

use crate::{Container, Deserialize, ProtocolDecodeErr, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_H: Header = 0;
const REQUEST_H: Header = 1;
const RESPONSE_H: Header = 2;

/// Marker carried by push acknowledgments and finish requests.
pub const ACK_SENTINEL: i32 = 1234;

/// Identifies a node in the cluster, servers are numbered from `0`.
pub type NodeId = u32;

/// The node that acknowledges worker termination, the lowest-numbered server.
pub const COORDINATOR: NodeId = 0;

/// Selects the handler a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageClass {
    WorkerPullRequest = 1,
    WorkerPushRequest = 2,
    WorkerFinishWork = 3,
}

impl TryFrom<u32> for MessageClass {
    type Error = ProtocolDecodeErr;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::WorkerPullRequest),
            2 => Ok(Self::WorkerPushRequest),
            3 => Ok(Self::WorkerFinishWork),
            other => Err(ProtocolDecodeErr::UnknownMessageClass(other)),
        }
    }
}

/// An inbound or outbound call, consumed once by its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub class: MessageClass,
    pub sender: NodeId,
    /// Assigned by the sending transport, echoed back by the response.
    pub id: u64,
    pub payload: Container,
}

impl Request {
    /// Creates a new `Request` with an unassigned id.
    pub fn new(class: MessageClass, sender: NodeId, payload: Container) -> Self {
        Self {
            class,
            sender,
            id: 0,
            payload,
        }
    }

    /// Creates an empty `Response` paired with this request.
    pub fn response(&self) -> Response {
        Response {
            id: self.id,
            payload: Container::new(),
        }
    }
}

/// The answer to exactly one `Request`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u64,
    pub payload: Container,
}

/// The frame exchanged between workers and servers.
#[derive(Debug)]
pub enum Msg<'a> {
    Request(Request),
    Response(Response),
    /// The server rejected request `id`, the caller's completion must still fire.
    Err { id: u64, reason: Cow<'a, str> },
}

impl Msg<'_> {
    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {needed} bytes"),
        ))
    }
}

fn split_u32(buf: &[u8]) -> (u32, &[u8]) {
    let (head, rest) = buf.split_at(size_of::<u32>());
    let mut bytes = [0; size_of::<u32>()];
    bytes.copy_from_slice(head);
    (u32::from_be_bytes(bytes), rest)
}

fn split_u64(buf: &[u8]) -> (u64, &[u8]) {
    let (head, rest) = buf.split_at(size_of::<u64>());
    let mut bytes = [0; size_of::<u64>()];
    bytes.copy_from_slice(head);
    (u64::from_be_bytes(bytes), rest)
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err { id, reason } => {
                buf.extend_from_slice(&ERR_H.to_be_bytes());
                buf.extend_from_slice(&id.to_be_bytes());
                Some(reason.as_bytes())
            }
            Msg::Request(req) => {
                buf.extend_from_slice(&REQUEST_H.to_be_bytes());
                buf.extend_from_slice(&(req.class as u32).to_be_bytes());
                buf.extend_from_slice(&req.sender.to_be_bytes());
                buf.extend_from_slice(&req.id.to_be_bytes());
                Some(req.payload.as_bytes())
            }
            Msg::Response(rsp) => {
                buf.extend_from_slice(&RESPONSE_H.to_be_bytes());
                buf.extend_from_slice(&rsp.id.to_be_bytes());
                Some(rsp.payload.as_bytes())
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len(), HEADER_SIZE);
        }

        let (kind, rest) = split_u32(buf);

        match kind {
            ERR_H => {
                if rest.len() < size_of::<u64>() {
                    return Self::buf_is_too_small(buf.len(), HEADER_SIZE + size_of::<u64>());
                }

                let (id, rest) = split_u64(rest);
                let reason = std::str::from_utf8(rest).map_err(|_| ProtocolDecodeErr::InvalidUtf8)?;

                Ok(Self::Err {
                    id,
                    reason: Cow::Borrowed(reason),
                })
            }
            REQUEST_H => {
                const FIXED: usize = 2 * size_of::<u32>() + size_of::<u64>();

                if rest.len() < FIXED {
                    return Self::buf_is_too_small(buf.len(), HEADER_SIZE + FIXED);
                }

                let (class, rest) = split_u32(rest);
                let (sender, rest) = split_u32(rest);
                let (id, rest) = split_u64(rest);

                Ok(Self::Request(Request {
                    class: MessageClass::try_from(class)?,
                    sender,
                    id,
                    payload: Container::from_bytes(rest),
                }))
            }
            RESPONSE_H => {
                if rest.len() < size_of::<u64>() {
                    return Self::buf_is_too_small(buf.len(), HEADER_SIZE + size_of::<u64>());
                }

                let (id, rest) = split_u64(rest);

                Ok(Self::Response(Response {
                    id,
                    payload: Container::from_bytes(rest),
                }))
            }
            other => Err(ProtocolDecodeErr::UnknownFrameKind(other).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(msg: &Msg<'_>) -> Vec<u8> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf).map(<[u8]>::to_vec);
        buf.extend(tail.unwrap_or_default());
        buf
    }

    #[test]
    fn test_request_frame_layout() {
        let mut payload = Container::new();
        payload.push(&ACK_SENTINEL);

        let mut req = Request::new(MessageClass::WorkerFinishWork, 3, payload);
        req.id = 42;

        let bytes = frame(&Msg::Request(req.clone()));
        assert_eq!(&bytes[..4], &REQUEST_H.to_be_bytes());

        let Msg::Request(decoded) = Msg::deserialize(&bytes).unwrap() else {
            panic!("expected a request frame");
        };
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_err_frame_keeps_request_id() {
        let msg = Msg::Err {
            id: 7,
            reason: Cow::Borrowed("bad payload"),
        };

        let bytes = frame(&msg);
        let Msg::Err { id, reason } = Msg::deserialize(&bytes).unwrap() else {
            panic!("expected an error frame");
        };

        assert_eq!(id, 7);
        assert_eq!(reason, "bad payload");
    }

    #[test]
    fn test_unknown_message_class() {
        let mut bytes = REQUEST_H.to_be_bytes().to_vec();
        bytes.extend_from_slice(&99u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());

        let err = Msg::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_short_response_frame() {
        let mut bytes = RESPONSE_H.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0; 3]);
        assert!(Msg::deserialize(&bytes).is_err());
    }
}
