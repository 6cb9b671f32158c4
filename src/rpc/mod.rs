//! Wire protocol for the vendor's batched RPC transport.

pub mod envelope;
pub mod extract;
pub mod framing;
pub mod ids;

pub use envelope::{
    CallEnvelope, Endpoint, EnvelopeKind, REQUEST_SEQUENCE_STEP, RequestSequence, RpcRequest,
    decode_body_params,
};
pub use extract::{extract_result, unwrap_list};
pub use framing::{ResponseFrame, XSSI_PREFIX, decode_chunks, parse_frames, strip_xssi_prefix};
