//! Shared type definitions for the Rekog CLI.
//!
//! The crate describes the static shape of Rekognition operations
//! ([`OperationSpec`], [`ParamSpec`]), the typed values bound to their
//! parameters ([`ParamValue`]) and the request objects assembled from those
//! values ([`OperationRequest`]). Byte buffers travel inside requests as
//! [`PayloadStream`]s whose lifetime is tracked by a [`PayloadLedger`].

pub mod operation;
pub mod payload;
pub mod request;
pub mod value;

pub use operation::{OperationSpec, PaginationSpec, ParamSpec, ParamType};
pub use payload::{PayloadLedger, PayloadStream};
pub use request::{OperationRequest, RequestGroup, RequestValue};
pub use value::{ParamValue, ParseValueError};
