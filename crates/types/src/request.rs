//! Request objects assembled from bound parameters.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::PayloadStream;

/// A member of a request: a JSON scalar or collection, a payload stream, or a
/// nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestValue {
    Scalar(Value),
    Blob(PayloadStream),
    Group(RequestGroup),
}

impl RequestValue {
    fn render(&self, blob: &dyn Fn(&PayloadStream) -> Value) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Blob(stream) => blob(stream),
            Self::Group(group) => group.render(blob),
        }
    }

    pub fn as_group(&self) -> Option<&RequestGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&PayloadStream> {
        match self {
            Self::Blob(stream) => Some(stream),
            _ => None,
        }
    }
}

/// Ordered set of named request members.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestGroup {
    members: IndexMap<String, RequestValue>,
}

impl RequestGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: RequestValue) {
        self.members.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&RequestValue> {
        self.members.get(name)
    }

    /// Resolve a dotted member path such as `Image.S3Object.Bucket`.
    pub fn get_path(&self, path: &str) -> Option<&RequestValue> {
        let mut segments = path.split('.');
        let mut current = self.members.get(segments.next()?)?;
        for segment in segments {
            current = current.as_group()?.get(segment)?;
        }
        Some(current)
    }

    /// Set the member at a dotted path, creating intermediate groups.
    ///
    /// A non-group member standing where a group is needed is replaced.
    pub fn set_path(&mut self, path: &str, value: RequestValue) {
        match path.split_once('.') {
            None => self.insert(path, value),
            Some((head, rest)) => {
                let entry = self
                    .members
                    .entry(head.to_string())
                    .or_insert_with(|| RequestValue::Group(RequestGroup::new()));
                if !matches!(entry, RequestValue::Group(_)) {
                    *entry = RequestValue::Group(RequestGroup::new());
                }
                if let RequestValue::Group(group) = entry {
                    group.set_path(rest, value);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestValue)> {
        self.members.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of payload streams held anywhere below this group.
    pub fn payload_count(&self) -> usize {
        self.members
            .values()
            .map(|value| match value {
                RequestValue::Blob(_) => 1,
                RequestValue::Group(group) => group.payload_count(),
                RequestValue::Scalar(_) => 0,
            })
            .sum()
    }

    fn render(&self, blob: &dyn Fn(&PayloadStream) -> Value) -> Value {
        let map: Map<String, Value> = self
            .members
            .iter()
            .map(|(name, value)| (name.clone(), value.render(blob)))
            .collect();
        Value::Object(map)
    }
}

/// A fully assembled request for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    operation: String,
    members: RequestGroup,
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>, members: RequestGroup) -> Self {
        Self {
            operation: operation.into(),
            members,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn members(&self) -> &RequestGroup {
        &self.members
    }

    pub fn member(&self, path: &str) -> Option<&RequestValue> {
        self.members.get_path(path)
    }

    /// A copy of this request with one member replaced.
    pub fn with_member(&self, path: &str, value: RequestValue) -> Self {
        let mut members = self.members.clone();
        members.set_path(path, value);
        Self {
            operation: self.operation.clone(),
            members,
        }
    }

    pub fn payload_count(&self) -> usize {
        self.members.payload_count()
    }

    /// JSON body as sent on the wire; payload streams become base64 text.
    pub fn to_wire_json(&self) -> Value {
        self.members.render(&|stream| Value::String(stream.to_base64()))
    }

    /// JSON body for display; payload streams are summarized by size.
    pub fn to_preview_json(&self) -> Value {
        self.members
            .render(&|stream| Value::String(format!("<{} bytes>", stream.len())))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::PayloadLedger;

    fn sample_request(ledger: &PayloadLedger) -> OperationRequest {
        let mut members = RequestGroup::new();
        members.insert("CollectionId", RequestValue::Scalar(json!("c1")));
        members.set_path("Image.Bytes", RequestValue::Blob(ledger.open(vec![1, 2, 3, 4])));
        OperationRequest::new("IndexFaces", members)
    }

    #[test]
    fn set_path_creates_nested_groups() {
        let mut group = RequestGroup::new();
        group.set_path("Settings.GeneralLabels.LabelInclusionFilters", RequestValue::Scalar(json!(["Car"])));

        let leaf = group
            .get_path("Settings.GeneralLabels.LabelInclusionFilters")
            .and_then(RequestValue::as_scalar);
        assert_eq!(leaf, Some(&json!(["Car"])));
        assert!(group.get_path("Settings.Missing").is_none());
    }

    #[test]
    fn wire_and_preview_rendering_differ_only_for_blobs() {
        let ledger = PayloadLedger::new();
        let request = sample_request(&ledger);

        assert_eq!(request.to_wire_json(), json!({"CollectionId": "c1", "Image": {"Bytes": "AQIDBA=="}}));
        assert_eq!(request.to_preview_json(), json!({"CollectionId": "c1", "Image": {"Bytes": "<4 bytes>"}}));
        assert_eq!(request.payload_count(), 1);
    }

    #[test]
    fn with_member_leaves_original_untouched() {
        let ledger = PayloadLedger::new();
        let request = sample_request(&ledger);
        let next = request.with_member("NextToken", RequestValue::Scalar(json!("t1")));

        assert!(request.member("NextToken").is_none());
        assert_eq!(next.member("NextToken").and_then(RequestValue::as_scalar), Some(&json!("t1")));
        assert_eq!(ledger.live(), 2);

        drop(next);
        drop(request);
        assert_eq!(ledger.live(), 0);
    }
}
