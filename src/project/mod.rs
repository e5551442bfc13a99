//! Project records and the rules that constrain them

mod types;
mod validation;

pub use types::{
    InstanceHandle, NewProject, Project, ProjectId, ProjectKind, ProjectStatus, ProjectUpdate,
    SourceOrigin,
};
pub use validation::{validate_hostname_prefix, validate_name, ValidationError, MAX_NAME_LEN};
