//! gRPC server implementation for the Sekai identity service.

pub mod identity_svc;


pub use identity_svc::IdentityServiceImpl;
