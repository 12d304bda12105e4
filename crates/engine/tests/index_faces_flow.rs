use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rekog_api::{Transport, TransportError};
use rekog_engine::{EngineError, Invoker, OperationRunner, Outcome, PageEvent, RunOptions};
use rekog_types::{OperationRequest, OperationSpec, ParamValue, PayloadLedger, RequestValue};
use serde_json::{Value, json};

const INDEX_FACES: &str = r#"{
    "name": "IndexFaces",
    "command": "index-faces",
    "summary": "Detect faces in an image and add them to a collection",
    "mutating": true,
    "response_fields": ["FaceRecords", "OrientationCorrection", "FaceModelVersion", "UnindexedFaces"],
    "params": [
        {"name": "CollectionId", "member": "CollectionId", "type": "string", "required": true, "from_pipeline": true},
        {"name": "ImageContent", "member": "Image.Bytes", "type": "bytes"},
        {"name": "ImageBucket", "member": "Image.S3Object.Bucket", "type": "string"},
        {"name": "ImageName", "member": "Image.S3Object.Name", "type": "string"},
        {"name": "ImageVersion", "member": "Image.S3Object.Version", "type": "string"},
        {"name": "MaxFace", "member": "MaxFaces", "type": "int32", "aliases": ["MaxFaces"]}
    ]
}"#;

fn index_faces() -> OperationSpec {
    serde_json::from_str(INDEX_FACES).expect("IndexFaces descriptor")
}

fn bindings() -> Vec<(String, Option<ParamValue>)> {
    vec![
        ("CollectionId".into(), Some(ParamValue::String("c1".into()))),
        ("ImageContent".into(), Some(ParamValue::Bytes(vec![0x89, 0x50, 0x4e, 0x47]))),
        ("MaxFaces".into(), Some(ParamValue::Int32(5))),
    ]
}

/// Echoes the request back, recording what the payload looked like in flight.
#[derive(Default)]
struct RecordingEcho {
    calls: AtomicUsize,
    payload_bytes: std::sync::Mutex<Vec<u8>>,
}

#[async_trait]
impl Transport for RecordingEcho {
    fn endpoint(&self) -> &str {
        "http://localhost:4566"
    }

    async fn call(&self, request: &OperationRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stream) = request.member("Image.Bytes").and_then(RequestValue::as_blob)
            && let Ok(mut recorded) = self.payload_bytes.lock()
        {
            recorded.extend_from_slice(stream.as_bytes());
        }
        assert!(request.member("Image.S3Object").is_none(), "S3Object must be absent");
        Ok(request.to_wire_json())
    }
}

struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    fn endpoint(&self) -> &str {
        "https://rekognition.nowhere-1.amazonaws.com"
    }

    async fn call(&self, _request: &OperationRequest) -> Result<Value, TransportError> {
        let cause: rekog_api::BoxError = "error sending request: dns error: failed to lookup address information".into();
        Err(TransportError::service("RequestFailed", "the request could not be sent", None).with_cause(cause))
    }
}

#[tokio::test]
async fn index_faces_round_trip_through_echo_transport() {
    let transport = Arc::new(RecordingEcho::default());
    let ledger = PayloadLedger::new();
    let runner = OperationRunner::new(Invoker::new(transport.clone())).with_ledger(ledger.clone());
    let operation = index_faces();
    let options = RunOptions {
        force: true,
        ..RunOptions::default()
    };

    let mut pages = Vec::new();
    let report = runner
        .run(&operation, bindings(), options, |event| pages.push(event))
        .await
        .expect("index faces");

    assert_eq!(report.outcome, Outcome::Completed);
    assert!(report.warnings.is_empty());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.payload_bytes.lock().map(|bytes| bytes.clone()).unwrap_or_default(),
        vec![0x89, 0x50, 0x4e, 0x47]
    );
    assert_eq!(
        pages,
        vec![PageEvent::Page(json!({
            "CollectionId": "c1",
            "Image": {"Bytes": "iVBORw=="},
            "MaxFaces": 5
        }))]
    );
    assert_eq!(ledger.opened(), 1);
    assert_eq!(ledger.live(), 0, "payload stream must be released after the call");
}

#[tokio::test]
async fn unreachable_endpoint_is_reported_and_payload_released() {
    let ledger = PayloadLedger::new();
    let runner = OperationRunner::new(Invoker::new(Arc::new(Unreachable))).with_ledger(ledger.clone());
    let operation = index_faces();
    let options = RunOptions {
        force: true,
        ..RunOptions::default()
    };

    let error = runner
        .run(&operation, bindings(), options, |_| {})
        .await
        .expect_err("unreachable endpoint");
    let message = error.to_string();
    assert!(matches!(error, EngineError::Transport(_)));
    assert!(message.contains("rekognition.nowhere-1.amazonaws.com"), "message: {message}");
    assert_eq!(ledger.opened(), 1);
    assert_eq!(ledger.live(), 0);
}
