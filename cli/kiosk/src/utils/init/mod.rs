mod clients;
mod logger;

pub use clients::*;
pub use logger::*;
