//! GitHub webhook handling: signature verification, typed events, parsing,
//! and delivery-id deduplication.

pub mod dedupe;
pub mod events;
pub mod parser;
pub mod signature;

pub use dedupe::DeliveryDedupe;
pub use events::RepoEvent;
pub use parser::{ParseError, parse_webhook};
pub use signature::{compute_signature, format_signature_header, verify_signature};
