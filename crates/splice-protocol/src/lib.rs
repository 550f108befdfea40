// Splice wire protocol - shared vocabulary between server and client core
//
// A hybrid exchange is an ordinary HTTP request/response pair tagged with the
// `x-splice` marker header. The server answers either with a JSON visit
// payload, a file download, an external-navigation instruction, or a plain
// (non-hybrid) document. Everything in this crate is protocol surface only;
// applying a payload to a running page is the `splice` crate's job.

pub mod classify;
pub mod headers;
pub mod partial;
pub mod payload;

pub use classify::{classify, ResponseKind};
pub use partial::{decode_paths, encode_paths, PartialFields};
pub use payload::{DialogPayload, Properties, ViewPayload, VisitPayload};
