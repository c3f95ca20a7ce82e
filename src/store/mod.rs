//! Account Directory — record types, port, and libSQL backend.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlDirectory;
pub use model::{
    AccountRecord, AccountRole, OrgAdminLink, OrganizationProfile, VolunteerProfile,
};
pub use traits::AccountDirectory;
