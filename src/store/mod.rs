pub mod compound;
pub mod directory;
pub mod file_switch;
pub mod io;
pub mod lock;

pub use directory::{Directory, FsDirectory, RamDirectory};
pub use io::{IndexInput, IndexOutput};
pub use lock::Lock;
