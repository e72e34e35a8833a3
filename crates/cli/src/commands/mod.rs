pub mod disassemble;
pub mod report;
pub mod status;
pub mod util;

pub use disassemble::*;
pub use report::*;
pub use status::*;
pub use util::*;
