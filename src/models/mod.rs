pub mod agent;
pub mod api_key;
pub mod owner;

pub use agent::*;
pub use api_key::*;
pub use owner::*;
