use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{pin_mut, Stream, StreamExt};
use thiserror::Error;

use crate::sse::{EventStreamParser, StreamParseError};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("upstream transport failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Parse(#[from] StreamParseError),
}

pub type DeltaStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Pull-based byte stream of content deltas over an upstream chunk stream.
///
/// Chunks are only pulled as the consumer drains, so a slow consumer pauses
/// upstream reads instead of buffering them; dropping the stream drops the
/// upstream body and releases the connection. A finish reason closes the
/// stream cleanly, as does the upstream body ending without one. Parse and
/// transport failures surface as one error item and end the stream.
pub fn delta_stream<S, E>(upstream: S) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut parser = EventStreamParser::new();
        pin_mut!(upstream);

        while let Some(next) = upstream.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(error) => {
                    yield Err(StreamError::Transport(error.to_string()));
                    return;
                }
            };

            match parser.feed(&chunk) {
                Ok(outcome) => {
                    for delta in outcome.deltas {
                        yield Ok(Bytes::from(delta));
                    }
                    if outcome.finished {
                        return;
                    }
                }
                Err(error) => {
                    yield Err(StreamError::Parse(error));
                    return;
                }
            }
        }
    };

    stream.boxed()
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use bytes::Bytes;
    use futures_util::{stream, StreamExt};

    use super::{delta_stream, StreamError};

    fn ok_chunks(parts: &[&str]) -> Vec<Result<Bytes, Infallible>> {
        parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect()
    }

    async fn collect(items: Vec<Result<Bytes, Infallible>>) -> Vec<Result<Bytes, StreamError>> {
        delta_stream(stream::iter(items)).collect().await
    }

    #[tokio::test]
    async fn reconstructs_content_across_arbitrary_chunk_boundaries() {
        let event =
            "data: {\"choices\":[{\"delta\":{\"content\":\"héllo wörld\"},\"finish_reason\":null}]}\n\n";
        let finish = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";
        let combined = format!("{event}{finish}");
        // Split inside the multi-byte é.
        let split = combined.find('é').expect("é present") + 1;
        let bytes = combined.as_bytes();

        let items = vec![
            Ok::<_, Infallible>(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let collected = collect(items).await;

        let text: String = collected
            .into_iter()
            .map(|item| item.expect("clean stream"))
            .map(|bytes| String::from_utf8(bytes.to_vec()).expect("utf-8 deltas"))
            .collect();
        assert_eq!(text, "héllo wörld");
    }

    #[tokio::test]
    async fn finish_reason_ends_the_stream_before_later_chunks() {
        let items = ok_chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"},\"finish_reason\":null}]}\n\n",
        ]);
        let collected = collect(items).await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].as_ref().expect("delta"), "a");
    }

    #[tokio::test]
    async fn upstream_end_without_finish_reason_closes_cleanly() {
        let items = ok_chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"},\"finish_reason\":null}]}\n\n",
            "data: [DONE]\n\n",
        ]);
        let collected = collect(items).await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].as_ref().expect("delta"), "tail");
    }

    #[tokio::test]
    async fn malformed_payload_surfaces_one_error_and_stops() {
        let items = ok_chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":null}]}\n\n",
            "data: {broken\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"},\"finish_reason\":null}]}\n\n",
        ]);
        let collected = collect(items).await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_ref().expect("first delta"), "a");
        assert!(matches!(collected[1], Err(StreamError::Parse(_))));
    }

    #[tokio::test]
    async fn transport_error_surfaces_and_stops() {
        let items: Vec<Result<Bytes, &str>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":null}]}\n\n",
            )),
            Err("connection reset"),
        ];
        let collected: Vec<_> = delta_stream(stream::iter(items)).collect().await;
        assert_eq!(collected.len(), 2);
        assert!(matches!(
            &collected[1],
            Err(StreamError::Transport(message)) if message.contains("connection reset")
        ));
    }
}
