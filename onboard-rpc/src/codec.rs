//! Length-prefixed JSON framing.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! JSON.

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{RpcError, RpcResult};

/// Maximum frame body size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Reads one frame. Returns `None` if the peer closed the connection
/// cleanly before a new frame started.
///
/// A body that does not decode is consumed in full, so the stream stays
/// aligned on frame boundaries after a [`RpcError::Serialization`].
pub async fn read_frame<R, T>(io: &mut R) -> RpcResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    // Read 4-byte length prefix
    let mut len_bytes = [0u8; 4];
    match io.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).await?;

    Ok(Some(serde_json::from_slice(&buf)?))
}

/// Writes one frame and flushes it.
pub async fn write_frame<W, T>(io: &mut W, message: &T) -> RpcResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec(message)?;
    if data.len() > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge(data.len()));
    }

    io.write_all(&(data.len() as u32).to_be_bytes()).await?;
    io.write_all(&data).await?;
    io.flush().await?;
    Ok(())
}
