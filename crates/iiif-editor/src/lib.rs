pub mod bus;
pub mod draw;
pub mod form;
pub mod gateway;
pub mod local;
pub mod mode;
pub mod repository;
pub mod scroll;
pub mod session;
pub mod store;
pub mod transport;
pub mod viewer;

pub use bus::{AlertKind, Dispatcher, Message};
pub use form::{AnnotationForm, RegionField};
pub use gateway::{MutationKind, PersistenceGateway, Route};
pub use mode::{DeleteGate, GateOutcome, ModeKind, ModeMachine};
pub use repository::{AnnotationCollection, AnnotationFilter, AnnotationRepository, FetchPlan};
pub use store::{ListEntry, Snapshot, Store};
pub use transport::{HttpResponse, Transport};
pub use viewer::{FollowUp, OverlayFrame, Submission, Viewer};
