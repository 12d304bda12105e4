//! Request assembly.
//!
//! The parameter member paths of an operation describe a tree of request
//! groups. Assembly walks that tree once per call: a leaf yields a value when
//! its parameter is bound to something other than null, and a group exists
//! only when at least one of its children does. Empty groups collapse to
//! absent all the way up.

use indexmap::IndexMap;
use rekog_types::{OperationRequest, OperationSpec, ParamSpec, ParamValue, PayloadLedger, RequestGroup, RequestValue};
use tracing::debug;

use crate::context::InvocationContext;

/// Shape of the request members declared by an operation.
#[derive(Debug)]
enum MemberNode<'a> {
    Leaf(&'a ParamSpec),
    Group(IndexMap<&'a str, MemberNode<'a>>),
}

/// Build the request for the context's operation.
///
/// Byte buffers are opened as payload streams on `ledger`; they are released
/// when the returned request is dropped.
pub fn assemble(context: &InvocationContext<'_>, ledger: &PayloadLedger) -> OperationRequest {
    let operation = context.operation();
    let shape = member_shape(operation);
    let members = assemble_group(&shape, context, ledger).unwrap_or_default();
    debug!(
        operation = %operation.name,
        members = members.len(),
        payloads = members.payload_count(),
        "request assembled"
    );
    OperationRequest::new(operation.name.clone(), members)
}

fn member_shape(operation: &OperationSpec) -> IndexMap<&str, MemberNode<'_>> {
    let mut root = IndexMap::new();
    'params: for param in &operation.params {
        let segments: Vec<&str> = param.member_path().collect();
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };
        let mut level = &mut root;
        for segment in parents {
            let node = level.entry(*segment).or_insert_with(|| MemberNode::Group(IndexMap::new()));
            match node {
                MemberNode::Group(children) => level = children,
                MemberNode::Leaf(_) => continue 'params,
            }
        }
        level.entry(*leaf).or_insert(MemberNode::Leaf(param));
    }
    root
}

fn assemble_group(
    children: &IndexMap<&str, MemberNode<'_>>,
    context: &InvocationContext<'_>,
    ledger: &PayloadLedger,
) -> Option<RequestGroup> {
    let mut group = RequestGroup::new();
    for (name, node) in children {
        if let Some(value) = assemble_node(node, context, ledger) {
            group.insert(*name, value);
        }
    }
    (!group.is_empty()).then_some(group)
}

fn assemble_node(node: &MemberNode<'_>, context: &InvocationContext<'_>, ledger: &PayloadLedger) -> Option<RequestValue> {
    match node {
        MemberNode::Leaf(param) => context.value(&param.name).map(|value| leaf_value(value, ledger)),
        MemberNode::Group(children) => assemble_group(children, context, ledger).map(RequestValue::Group),
    }
}

/// Collections count as present once bound, even when empty.
fn leaf_value(value: &ParamValue, ledger: &PayloadLedger) -> RequestValue {
    match value {
        ParamValue::Bytes(bytes) => RequestValue::Blob(ledger.open(bytes.clone())),
        other => RequestValue::Scalar(other.to_json()),
    }
}
