//! CSW dispatch core: request envelopes, typed parameters, distributed search policy.

pub mod distributed;
pub mod envelope;
pub mod exception;
pub mod params;
pub mod schema;
pub mod types;

pub use distributed::{DistributedSearchPolicy, FanOutPlan};
pub use envelope::{
    GeneralRequestInfo, MalformedRequest, RawRequest, RequestEnvelope, XmlElement, MAX_ELEMENT_DEPTH,
};
pub use exception::{ExceptionCode, ExceptionReport};
pub use params::{operation_names, GetCapabilitiesParameters, GetRecordByIdParameters, Parameters};
pub use schema::{SchemaSettings, CSW_202_NAMESPACE, OWS_NAMESPACE};
pub use types::{Encoding, HttpVerb, Record, UnsupportedVerb};
