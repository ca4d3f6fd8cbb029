// Search module for the search gateway
// Query construction, chosung detection, backend access and suggestions

mod backend;
mod chosung;
mod memory;
mod query;
mod service;

pub use backend::*;
pub use chosung::*;
pub use memory::*;
pub use query::*;
pub use service::*;
