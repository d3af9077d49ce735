//! Adapter from a chunked byte stream to a stream of frames.

use super::reader::{Frame, FrameReader};
use tokio_stream::{Stream, StreamExt};

/// Read frames out of a transport body such as `reqwest::Response::bytes_stream`.
///
/// The returned stream ends at `data: [DONE]`, at the end of the body, or right
/// after yielding the first transport error.
pub fn frames<S, B, E>(body: S) -> impl Stream<Item = Result<Frame, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut reader = FrameReader::new();
        tokio::pin!(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in reader.push(bytes.as_ref()) {
                        yield Ok(frame);
                    }
                    if reader.is_done() {
                        return;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for frame in reader.finish() {
            yield Ok(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_stop_at_done() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(&b"event: step_start\nda"[..]),
            Ok(&b"ta: {\"step_id\":\"a\"}\n"[..]),
            Ok(&b"data: [DONE]\n"[..]),
            Err("never polled".to_string()),
        ];

        let collected: Vec<_> = frames(tokio_stream::iter(chunks)).collect().await;

        assert_eq!(collected.len(), 1);
        let frame = collected[0].as_ref().unwrap();
        assert_eq!(frame.event, "step_start");
        assert_eq!(frame.data["step_id"], "a");
    }

    #[tokio::test]
    async fn test_frames_surface_transport_error() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"event: step_start\ndata: {}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"event: step_done\ndata: {}\n".to_vec()),
        ];

        let collected: Vec<_> = frames(tokio_stream::iter(chunks)).collect().await;

        assert_eq!(collected.len(), 2);
        assert!(collected[0].is_ok());
        assert_eq!(collected[1].as_ref().unwrap_err(), "connection reset");
    }
}
