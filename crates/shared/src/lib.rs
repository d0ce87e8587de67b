mod filter;
mod template;
mod types;

pub use filter::*;
pub use template::*;
pub use types::*;
