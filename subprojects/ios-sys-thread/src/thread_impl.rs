//! Thread Implementation

mod activity;
mod create;
mod info;
mod run;
mod tls;

pub use activity::*;
pub use create::*;
pub use info::*;
pub use run::*;
pub use tls::*;
