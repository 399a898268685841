//! Domain core for deskbot: configuration, the error taxonomy and the small
//! stateful protocols the Slack flows build on.

pub mod config;
pub mod counter;
pub mod errors;
pub mod issue;
pub mod state;
pub mod worklog;

pub use counter::NotACounter;
pub use errors::{ApplicationError, InterfaceError};
pub use issue::{Issue, IssueKey, IssueTracker, TrackerError};
pub use state::{ChannelContext, MalformedToken};
pub use worklog::{WorkAllocationRequest, WorkPlan, WorkShare};
