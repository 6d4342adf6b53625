pub mod headers;
pub mod metrics;
pub mod rbac;
pub mod session;
