pub mod atomic_file;
pub mod filesystem;

pub use atomic_file::write_atomic;
