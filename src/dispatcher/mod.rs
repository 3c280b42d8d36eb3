//! Worker boundary: computation requests in, tagged responses out.
pub mod actor;
pub mod errors;
pub mod messages;
pub mod registry;

pub use actor::{ComputationActor, ComputationDispatcher};
pub use errors::{ComputationError, DispatchError};
pub use messages::{ComputationRequest, ComputationResponse, DispatcherStats, DispatcherTell, GetStats, RequestId};
pub use registry::{
    Computation, ComputationRegistry, TpoComputation, VolumeProfileComputation, TPO_TYPE, VOLUME_PROFILE_TYPE,
};
