//! Operation fixtures and stub transports shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rekog_api::{Transport, TransportError};
use rekog_types::{OperationRequest, OperationSpec, PaginationSpec, ParamSpec, ParamType, RequestValue};
use serde_json::{Value, json};

const STUB_ENDPOINT: &str = "https://stub.invalid";

fn param(name: &str, member: &str, r#type: ParamType) -> ParamSpec {
    ParamSpec {
        name: name.into(),
        member: member.into(),
        r#type,
        required: false,
        aliases: Vec::new(),
        from_pipeline: false,
        description: None,
    }
}

fn image_params() -> Vec<ParamSpec> {
    vec![
        param("ImageContent", "Image.Bytes", ParamType::Bytes),
        param("ImageBucket", "Image.S3Object.Bucket", ParamType::String),
        param("ImageName", "Image.S3Object.Name", ParamType::String),
        param("ImageVersion", "Image.S3Object.Version", ParamType::String),
    ]
}

fn collection_id() -> ParamSpec {
    ParamSpec {
        required: true,
        from_pipeline: true,
        ..param("CollectionId", "CollectionId", ParamType::String)
    }
}

pub(crate) fn index_faces() -> OperationSpec {
    let mut params = vec![collection_id()];
    params.extend(image_params());
    params.push(param("DetectionAttribute", "DetectionAttributes", ParamType::StringList));
    params.push(param("ExternalImageId", "ExternalImageId", ParamType::String));
    params.push(ParamSpec {
        aliases: vec!["MaxFaces".into()],
        ..param("MaxFace", "MaxFaces", ParamType::Int32)
    });
    OperationSpec {
        name: "IndexFaces".into(),
        command: "index-faces".into(),
        summary: "Detect faces in an image and add them to a collection".into(),
        params,
        response_fields: vec![
            "FaceRecords".into(),
            "OrientationCorrection".into(),
            "FaceModelVersion".into(),
            "UnindexedFaces".into(),
        ],
        default_select: "*".into(),
        pagination: None,
        mutating: true,
    }
}

pub(crate) fn detect_labels() -> OperationSpec {
    let mut params = image_params();
    params.push(param("MinConfidence", "MinConfidence", ParamType::Float));
    params.push(param("Feature", "Features", ParamType::StringList));
    params.push(param(
        "GeneralLabels_LabelInclusionFilter",
        "Settings.GeneralLabels.LabelInclusionFilters",
        ParamType::StringList,
    ));
    params.push(param(
        "ImageProperties_MaxDominantColor",
        "Settings.ImageProperties.MaxDominantColors",
        ParamType::Int32,
    ));
    OperationSpec {
        name: "DetectLabels".into(),
        command: "detect-labels".into(),
        summary: "Detect labels in an image".into(),
        params,
        response_fields: vec!["Labels".into(), "LabelModelVersion".into()],
        default_select: "*".into(),
        pagination: None,
        mutating: false,
    }
}

pub(crate) fn list_faces() -> OperationSpec {
    OperationSpec {
        name: "ListFaces".into(),
        command: "list-faces".into(),
        summary: "List the faces in a collection".into(),
        params: vec![
            collection_id(),
            ParamSpec {
                aliases: vec!["MaxItems".into()],
                ..param("MaxResult", "MaxResults", ParamType::Int32)
            },
            param("NextToken", "NextToken", ParamType::String),
        ],
        response_fields: vec!["Faces".into(), "NextToken".into(), "FaceModelVersion".into()],
        default_select: "Faces".into(),
        pagination: Some(PaginationSpec {
            input_token: "NextToken".into(),
            output_token: "NextToken".into(),
            limit_param: Some("MaxResult".into()),
        }),
        mutating: false,
    }
}

/// Answers every call with the request body it received.
#[derive(Default)]
pub(crate) struct EchoTransport {
    calls: AtomicUsize,
}

impl EchoTransport {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for EchoTransport {
    fn endpoint(&self) -> &str {
        STUB_ENDPOINT
    }

    async fn call(&self, request: &OperationRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.to_wire_json())
    }
}

/// Fails every call with the error built by `make_error`.
pub(crate) struct FailingTransport<F> {
    make_error: F,
}

impl<F> FailingTransport<F>
where
    F: Fn() -> TransportError + Send + Sync,
{
    pub(crate) fn new(make_error: F) -> Self {
        Self { make_error }
    }
}

#[async_trait]
impl<F> Transport for FailingTransport<F>
where
    F: Fn() -> TransportError + Send + Sync,
{
    fn endpoint(&self) -> &str {
        STUB_ENDPOINT
    }

    async fn call(&self, _request: &OperationRequest) -> Result<Value, TransportError> {
        Err((self.make_error)())
    }
}

type ErrorFactory = Box<dyn Fn() -> TransportError + Send + Sync>;

/// Serves `total` pages of faces. Page `n` carries token `tn`; the last page
/// carries an empty token.
pub(crate) struct PagedTransport {
    total: usize,
    failure: Option<(usize, ErrorFactory)>,
    seen: Mutex<Vec<Option<String>>>,
}

impl PagedTransport {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            failure: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fail the call for page `page` (1-based).
    pub(crate) fn failing_on<F>(mut self, page: usize, make_error: F) -> Self
    where
        F: Fn() -> TransportError + Send + Sync + 'static,
    {
        self.failure = Some((page, Box::new(make_error)));
        self
    }

    pub(crate) fn seen_tokens(&self) -> Vec<Option<String>> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen_tokens().len()
    }
}

#[async_trait]
impl Transport for PagedTransport {
    fn endpoint(&self) -> &str {
        STUB_ENDPOINT
    }

    async fn call(&self, request: &OperationRequest) -> Result<Value, TransportError> {
        let token = request
            .member("NextToken")
            .and_then(RequestValue::as_scalar)
            .and_then(Value::as_str)
            .map(str::to_string);
        let page = match &token {
            Some(token) => token.trim_start_matches('t').parse::<usize>().unwrap_or(0) + 1,
            None => 1,
        };
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(token);
        }
        if let Some((failing_page, make_error)) = &self.failure
            && *failing_page == page
        {
            return Err(make_error());
        }
        let next = if page < self.total { format!("t{page}") } else { String::new() };
        Ok(json!({
            "Faces": [{"FaceId": format!("face-{page}")}],
            "NextToken": next,
            "FaceModelVersion": "7.0",
        }))
    }
}

/// Accepts every call and never answers within a test's lifetime.
#[derive(Default)]
pub(crate) struct StalledTransport {
    calls: AtomicUsize,
}

impl StalledTransport {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StalledTransport {
    fn endpoint(&self) -> &str {
        STUB_ENDPOINT
    }

    async fn call(&self, _request: &OperationRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(TransportError::Other("stalled call finished".into()))
    }
}

/// Cancels `token` once `transport` has received a call.
pub(crate) async fn cancel_when_called(transport: &StalledTransport, token: &tokio_util::sync::CancellationToken) {
    while transport.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    token.cancel();
}
