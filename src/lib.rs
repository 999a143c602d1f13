pub mod api;
pub mod errors;
pub mod interpolate;
pub mod matcher;
pub mod sync;
pub mod vars;

pub use api::{run, Options, SynterpError};
