use datapackage_stream::{DataSource, DataStream, StreamError, StreamVariant};
use serde_json::json;
use std::sync::Arc;
use tiny_http::{Response, Server, StatusCode};

fn serve(body: &'static str, status: u16) -> String {
    let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
    let port = server.server_addr().to_ip().unwrap().port();
    std::thread::spawn(move || {
        for req in server.incoming_requests() {
            let _ = req.respond(Response::from_string(body).with_status_code(StatusCode(status)));
        }
    });
    format!("http://127.0.0.1:{port}/data.csv")
}

#[test]
fn remote_default_stream_yields_lines() {
    let url = serve("first\nsecond\n", 200);
    let source = DataSource::from_path(&url, Some(std::path::Path::new("/ignored")));
    assert_eq!(source, DataSource::Remote(url.clone()));

    let rows: Vec<_> = DataStream::open_default(source)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(rows, vec![json!("first\n"), json!("second\n")]);
}

#[test]
fn remote_tabular_stream_is_typed() {
    let url = serve("id,score\n1,2.5\n2,3\n", 200);
    let schema = json!({"fields": [
        {"name": "id", "type": "integer"},
        {"name": "score", "type": "number"}
    ]});
    let stream = DataStream::open_tabular(DataSource::Remote(url), &schema, None).unwrap();
    assert_eq!(stream.variant(), StreamVariant::Tabular);
    let rows: Vec<_> = stream.map(Result::unwrap).collect();
    assert_eq!(rows, vec![json!({"id": 1, "score": 2.5}), json!({"id": 2, "score": 3})]);
}

#[test]
fn remote_not_found_fails_to_open() {
    let url = serve("missing", 404);
    let err = DataStream::open_default(DataSource::Remote(url.clone())).unwrap_err();
    match err {
        StreamError::Open { data_source, reason } => {
            assert_eq!(data_source, url);
            assert!(reason.contains("HTTP 404"), "{reason}");
        }
        other => panic!("expected open error, got {other}"),
    }
}

#[test]
fn remote_save_copies_body() {
    let url = serve("a,b\n1,2\n", 200);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("copy.csv");
    DataStream::open_default(DataSource::Remote(url))
        .unwrap()
        .save(&target)
        .unwrap();
    assert_eq!(std::fs::read_to_string(target).unwrap(), "a,b\n1,2\n");
}
