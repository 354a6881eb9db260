mod conditions;
mod record;

pub use conditions::*;
pub use record::*;
