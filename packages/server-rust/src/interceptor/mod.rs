//! Call interceptors carrying ambient context across actor calls.
//!
//! One outgoing/incoming pair exists per context kind, built from the same
//! generic layers:
//!
//! - [`OutgoingContextLayer`] snapshots the resolver before dispatch and
//!   writes (or clears) the kind's keys in the call envelope.
//! - [`IncomingContextLayer`] observes the value restored for the turn. The
//!   restore itself is done by [`AmbientRestoreLayer`](crate::actor::AmbientRestoreLayer).

pub mod incoming;
pub mod outgoing;
pub mod pipeline;

pub use incoming::IncomingContextLayer;
pub use outgoing::OutgoingContextLayer;
pub use pipeline::{build_inbound_pipeline, build_outbound_pipeline};
