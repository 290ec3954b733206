//! Bounded capture of a child's output stream

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

const CHUNK: usize = 8 * 1024;

#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub data: Vec<u8>,
    pub truncated: bool,
    /// Bytes seen, including those dropped past the cap
    pub total: u64,
}

/// Read `reader` to EOF, keeping at most `limit` bytes
///
/// Past the cap the stream is still drained so the child never blocks on a
/// full pipe. Returns early (marked truncated) when `stop` flips to true.
pub(crate) async fn read_bounded<R>(
    mut reader: R,
    limit: usize,
    mut stop: watch::Receiver<bool>,
) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut buf = vec![0u8; CHUNK];

    loop {
        let n = tokio::select! {
            read = reader.read(&mut buf) => read?,
            _ = stop.changed() => {
                captured.truncated = true;
                break;
            }
        };
        if n == 0 {
            break;
        }

        captured.total += n as u64;
        let room = limit.saturating_sub(captured.data.len());
        if n > room {
            captured.data.extend_from_slice(&buf[..room]);
            captured.truncated = true;
        } else {
            captured.data.extend_from_slice(&buf[..n]);
        }
    }

    Ok(captured)
}
