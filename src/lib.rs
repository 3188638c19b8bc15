//! Netbrot exhibit tools
//!
//! Converts matrices stored in MATLAB / NumPy containers into the JSON
//! exhibit files rendered by `netbrot`, and checks the connectivity of the
//! graphs those matrices describe.

pub mod config;
pub mod connectivity;
pub mod exhibit;
pub mod pipeline;
