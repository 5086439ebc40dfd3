//! Framing and messages spoken between [`EvaluatorClient`](super::client::EvaluatorClient) and
//! [`EvaluatorServer`](super::server::EvaluatorServer) over TCP.
//!
//! Every connection carries exactly one request frame and one response frame. A frame is a
//! 4-byte big-endian payload length followed by a JSON payload.

use super::forcefield::ForceFieldSource;
use super::options::RequestOptions;
use super::results::RequestSnapshot;
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::ids::RequestId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    #[error("Received an empty frame")]
    EmptyFrame,

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: expected {expected}")]
    UnexpectedResponse { expected: &'static str },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Submit {
        dataset: PhysicalPropertyDataSet,
        force_field: ForceFieldSource,
        options: RequestOptions,
    },
    Query {
        request_id: RequestId,
    },
    Release {
        request_id: RequestId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Submitted { request_id: RequestId },
    Snapshot { snapshot: RequestSnapshot },
    Released { request_id: RequestId },
    UnknownRequest { request_id: RequestId },
    Error { message: String },
}

pub fn write_frame<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(serde_json::from_slice(&payload)?)
}
