//! keygate-server — the request pipeline, the access-control table, and
//! the application facade that wires services and stores into one
//! operation surface.

pub mod acl;
pub mod app;
pub mod context;
pub mod mailer;
pub mod metadata;
pub mod pipeline;

pub use acl::{AccessControlTable, OPERATIONS, PermissionEntry};
pub use app::App;
pub use context::CallContext;
pub use metadata::Metadata;
pub use pipeline::{OwnedResponse, Pipeline, TargetsUser};
