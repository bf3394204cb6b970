pub mod core;
pub mod permissions;
pub mod policy;
pub mod session;
pub mod navigation;

// Optional components
pub mod cli;
pub mod logging;
