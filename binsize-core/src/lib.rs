pub mod binary;
pub mod error;
pub mod format;
pub mod header;
pub mod sections;
pub mod source;

pub use binary::*;
pub use error::*;
pub use format::*;
pub use sections::*;
pub use source::*;
