pub mod arguments;
pub mod assembler;
pub mod classpath;

pub use assembler::{LaunchCommand, RuntimeAssembler, RuntimeEnvironment};
pub use classpath::{build_classpath, extract_natives, get_classpath_separator};
