mod adapter;
mod error;
mod format;
mod model;
mod process;
mod time;
mod util;

pub use adapter::*;
pub use error::*;
pub use format::*;
pub use model::config::*;
pub use model::pitch::*;
pub use model::project::*;
pub use process::*;
pub use time::*;
pub use util::*;
