//! Stack map driven bytecode verification for CLDC virtual machines

pub mod jvm;
pub mod script;
pub mod util;
