//! Tenant bootstrap model.
//!
//! A tenant is an organization together with its first administrator.
//! Both are created in a single atomic write, so an organization never
//! exists without an admin.

use serde::{Deserialize, Serialize};

use crate::models::organization::{CreateOrganization, Organization};
use crate::models::user::{CreateUser, User};

/// Input for atomic tenant creation.
///
/// `admin.organization_id` is ignored; the repository binds the admin to
/// the organization it creates.
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub organization: CreateOrganization,
    pub admin: CreateUser,
}

/// The organization and admin user written by a tenant bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    pub organization: Organization,
    pub admin: User,
}
