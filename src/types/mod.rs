pub mod artifact;
pub mod report;
pub mod target;
pub mod workspace;

pub use artifact::*;
pub use report::*;
pub use target::*;
pub use workspace::*;
