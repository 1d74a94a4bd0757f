use std::num::NonZeroUsize;
use std::path::Path;

use bytes::Bytes;
use docqa_stream::StreamSource;
use futures::stream;
use tokio::io::AsyncReadExt as _;

pub type ReplayStream = stream::Iter<std::vec::IntoIter<Result<Bytes, std::io::Error>>>;

/// Reads a captured response body from `path`, or stdin for `None` / `-`.
pub async fn read_capture(path: Option<&Path>) -> std::io::Result<Bytes> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            Ok(Bytes::from(buf))
        }
    }
}

/// Splits `body` into fixed-size chunks, as a slow network would deliver it.
pub fn chunked_source(body: Bytes, chunk_size: NonZeroUsize) -> StreamSource<ReplayStream> {
    let size = chunk_size.get();
    let chunks: Vec<Result<Bytes, std::io::Error>> = (0..body.len())
        .step_by(size)
        .map(|start| Ok(body.slice(start..(start + size).min(body.len()))))
        .collect();
    StreamSource::new(stream::iter(chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_stream::ByteSource as _;
    use std::io::Write as _;

    #[tokio::test]
    async fn chunks_cover_the_body_in_order() {
        let mut source = chunked_source(Bytes::from_static(b"abcdefg"), NonZeroUsize::new(3).expect("nonzero"));
        let mut seen = Vec::new();
        while let Some(chunk) = source.next_chunk().await.expect("chunk") {
            seen.push(chunk);
        }
        assert_eq!(seen, vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def"), Bytes::from_static(b"g")]);
    }

    #[tokio::test]
    async fn reads_capture_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"{\"type\":\"done\"}\n").expect("write");
        let body = read_capture(Some(file.path())).await.expect("read");
        assert_eq!(body, Bytes::from_static(b"{\"type\":\"done\"}\n"));
    }
}
