//! Installation-domain identifiers, scope lists, grants, and lookup models.

pub mod id;
pub mod installation;
pub mod query;
pub mod scope;
pub mod token;

pub use id::*;
pub use installation::*;
pub use query::*;
pub use scope::*;
pub use token::{grant::*, secret::*};
