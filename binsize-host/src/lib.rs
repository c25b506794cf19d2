pub mod events;
pub mod hostinfo;
pub mod ramfs;

pub use events::*;
pub use hostinfo::*;
pub use ramfs::*;
