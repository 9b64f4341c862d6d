//! Remote directory listing retrieval

use crate::error::{PipelineError, Result};
use crate::net::{Transport, TransportError};
use crate::types::{CandidateEntry, CandidateSet, ListingEntry};
use std::io::{ErrorKind, Read};

/// Fetch the listing at `url` and filter it down to candidate images.
///
/// The body is accumulated until the connection closes or the transport's
/// read timeout fires. A body that ends before any byte arrived is
/// `EmptyResponse`; anything else is handed to the JSON parser.
pub fn fetch_listing(transport: &dyn Transport, url: &str) -> Result<CandidateSet> {
    let mut reader = transport.get(url).map_err(|e| match e {
        TransportError::Connect(msg) => PipelineError::Network(msg),
        TransportError::Status(code) => PipelineError::Network(format!("HTTP {}", code)),
    })?;
    let body = read_body(&mut reader);
    drop(reader);
    let body = body?;

    if body.is_empty() {
        return Err(PipelineError::EmptyResponse);
    }

    let set = parse_listing(&body)?;
    if set.is_empty() {
        return Err(PipelineError::EmptyDirectory);
    }
    Ok(set)
}

fn read_body<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                break
            }
            Err(e) if body.is_empty() => return Err(PipelineError::Network(e.to_string())),
            // peer went away mid-body; keep what arrived
            Err(_) => break,
        }
    }
    Ok(body)
}

/// Parse a JSON array of `{name, type, ..}` objects
pub fn parse_listing(body: &[u8]) -> Result<CandidateSet> {
    let entries: Vec<ListingEntry> = serde_json::from_slice(body)?;
    Ok(CandidateSet::new(
        entries.into_iter().map(CandidateEntry::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::fake::{FakeResponse, FakeTransport};
    use crate::net::HttpTransport;
    use crate::types::FailureClass;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    const URL: &str = "https://api.example.test/contents/images";

    fn listing(json: &str) -> FakeTransport {
        FakeTransport::new().route(URL, FakeResponse::Body(json.as_bytes().to_vec()))
    }

    #[test]
    fn filters_to_png_files() {
        let transport = listing(
            r#"[
                {"name": "a.png", "type": "file", "size": 120},
                {"name": "readme.txt", "type": "file"},
                {"name": "B.PNG", "type": "file"}
            ]"#,
        );
        let set = fetch_listing(&transport, URL).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.listing_len(), 3);
    }

    #[test]
    fn directories_are_not_candidates() {
        let transport = listing(
            r#"[{"name": "nested.png", "type": "dir"}, {"name": "ok.png", "type": "file"}]"#,
        );
        let set = fetch_listing(&transport, URL).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.nth(0).unwrap().name, "ok.png");
    }

    #[test]
    fn empty_array_is_empty_directory() {
        let err = fetch_listing(&listing("[]"), URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::EmptyDirectory);
    }

    #[test]
    fn no_matching_files_is_empty_directory() {
        let err = fetch_listing(&listing(r#"[{"name":"a.jpg","type":"file"}]"#), URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::EmptyDirectory);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = fetch_listing(&listing(r#"{"message": "Not Found""#), URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::Parse);
        let err = fetch_listing(&listing(r#"[{"name": "a.png"}]"#), URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::Parse);
    }

    #[test]
    fn timeout_before_any_byte_is_empty_response() {
        let transport = FakeTransport::new().route(URL, FakeResponse::Stall(Vec::new()));
        let err = fetch_listing(&transport, URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::EmptyResponse);
    }

    #[test]
    fn timeout_after_complete_body_keeps_body() {
        let body = br#"[{"name":"a.png","type":"file"}]"#.to_vec();
        let transport = FakeTransport::new().route(URL, FakeResponse::Stall(body));
        assert_eq!(fetch_listing(&transport, URL).unwrap().len(), 1);
    }

    /// Serves one request: headers announcing `declared` body bytes, then
    /// `sent`, then holds the connection open without finishing.
    fn stalling_server(sent: &'static [u8], declared: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                declared
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(sent).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_secs(3));
        });
        format!("http://{}/contents/images", addr)
    }

    #[test]
    fn http_headers_then_silence_is_empty_response() {
        let url = stalling_server(b"", 64);
        let transport = HttpTransport::new(Duration::from_millis(500), false).unwrap();
        let err = fetch_listing(&transport, &url).unwrap_err();
        assert_eq!(err.class(), FailureClass::EmptyResponse, "{}", err);
    }

    #[test]
    fn http_stall_after_body_keeps_what_arrived() {
        let body: &'static [u8] = br#"[{"name":"a.png","type":"file"}]"#;
        let url = stalling_server(body, body.len() + 16);
        let transport = HttpTransport::new(Duration::from_millis(500), false).unwrap();
        assert_eq!(fetch_listing(&transport, &url).unwrap().len(), 1);
    }

    #[test]
    fn connection_failure_is_network_error() {
        let transport = FakeTransport::new().route(URL, FakeResponse::Refused);
        let err = fetch_listing(&transport, URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::Network);

        let transport = FakeTransport::new().route(URL, FakeResponse::Status(403));
        let err = fetch_listing(&transport, URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::Network);
    }

    #[test]
    fn reset_before_any_byte_is_network_error() {
        let transport = FakeTransport::new().route(URL, FakeResponse::Broken(Vec::new()));
        let err = fetch_listing(&transport, URL).unwrap_err();
        assert_eq!(err.class(), FailureClass::Network);
    }
}
