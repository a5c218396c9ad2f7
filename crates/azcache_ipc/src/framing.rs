use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_MSG_SIZE: usize = 16 * 1024 * 1024;

/// Write `msg` as one line of JSON.
pub async fn send_msg<W, T>(writer: &mut W, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(msg).map_err(io::Error::other)?;

    if bytes.len() > MAX_MSG_SIZE {
        return Err(io::Error::other("message too large"));
    }

    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// Read the next JSON line, skipping blank lines.
///
/// Returns `Ok(None)` at end of input. A line that is not valid JSON for `T`,
/// or longer than the size cap, fails with [`io::ErrorKind::InvalidData`] and
/// leaves the reader positioned after it.
pub async fn recv_msg<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    recv_msg_with_limit(reader, MAX_MSG_SIZE).await
}

async fn recv_msg_with_limit<R, T>(reader: &mut R, limit: usize) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();

    loop {
        line.clear();

        // One byte past the cap marks an oversized line.
        let read = (&mut *reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = line.last() == Some(&b'\n');
        let body = if terminated {
            &line[..line.len() - 1]
        } else {
            &line[..]
        };

        if body.len() > limit {
            if !terminated {
                discard_line(reader).await?;
            }
            return Err(io::Error::new(io::ErrorKind::InvalidData, "message too large"));
        }

        let text = std::str::from_utf8(body)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        return serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    }
}

/// Skip the rest of the current line, newline included.
async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }

        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
