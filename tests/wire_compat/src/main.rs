fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use ramstash_protocol::{
        DEFAULT_MAX_HEADER_SIZE, DownloadResponse, Frame, FrameDecoder, Request, SENTINEL,
        encode_frame,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (key order is irrelevant).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    /// Frames the fixture exactly as a peer would (compact JSON + sentinel)
    /// and pushes it through the decoder together with `payload`.
    fn decode_framed<T>(name: &str, payload: &[u8]) -> Frame<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut bytes = serde_json::to_vec(&load_fixture(name)).unwrap();
        bytes.extend_from_slice(SENTINEL);
        bytes.extend_from_slice(payload);

        FrameDecoder::new(DEFAULT_MAX_HEADER_SIZE)
            .feed(&bytes)
            .unwrap_or_else(|e| panic!("failed to decode framed {name}: {e}"))
            .unwrap_or_else(|| panic!("no frame decoded from {name}"))
    }

    // --- Request headers ---

    #[test]
    fn fixture_upload_request() {
        let req: Request = roundtrip_test("upload_request.json");
        let Request::Upload(upload) = req else {
            panic!("expected UPLOAD, got {req:?}");
        };
        assert_eq!(upload.file_name, "report.pdf");
        assert_eq!(upload.file_size, 1_048_576);
        assert_eq!(upload.file_hash.len(), 64);
    }

    #[test]
    fn fixture_upload_request_without_hash() {
        // Peers that omit the hash are still accepted.
        let fixture = load_fixture("upload_request_no_hash.json");
        let req: Request = serde_json::from_value(fixture).unwrap();
        match req {
            Request::Upload(upload) => {
                assert_eq!(upload.file_name, "empty.bin");
                assert_eq!(upload.file_size, 0);
                assert!(upload.file_hash.is_empty());
            }
            other => panic!("expected UPLOAD, got {other:?}"),
        }
    }

    #[test]
    fn fixture_download_request() {
        let req: Request = roundtrip_test("download_request.json");
        assert_eq!(req.operation(), "DOWNLOAD");
    }

    #[test]
    fn fixture_list_request() {
        let req: Request = roundtrip_test("list_request.json");
        assert_eq!(req, Request::List);
    }

    // --- Response headers ---

    #[test]
    fn fixture_download_response() {
        let resp: DownloadResponse = roundtrip_test("download_response.json");
        assert_eq!(resp.file_size, 1_048_576);
    }

    #[test]
    fn fixture_list_response() {
        let names: Vec<String> = roundtrip_test("list_response.json");
        assert_eq!(names, ["archive.zip", "notes.txt", "report.pdf"]);
    }

    // --- Framing ---

    #[test]
    fn framed_upload_keeps_payload() {
        let frame: Frame<Request> = decode_framed("upload_request_no_hash.json", b"");
        assert!(matches!(frame.header, Request::Upload(_)));
        assert!(frame.payload.is_empty());

        let frame: Frame<DownloadResponse> = decode_framed("download_response.json", b"\x00\x01");
        assert_eq!(frame.payload, [0x00, 0x01]);
    }

    #[test]
    fn encoded_list_request_matches_peer_bytes() {
        assert_eq!(
            encode_frame(&Request::List).unwrap(),
            b"{\"operation\":\"LIST\"}\r\n\r\n"
        );
    }
}
