//! Bytecode verification utilities
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other words:
//! although the values on the stack and in the locals may obviously be different, the types and
//! order of the stack and local variables cannot. The types used in verification (represented
//! using [`VerificationType`]) are slightly augmented to take into account initialization, null,
//! and the two slots taken up by `long` and `double`.
//!
//! A bytecode walker simulates each instruction against a [`VerifierFrame`] (eg. `iadd` pops two
//! `int`s and pushes one). Since [CLDC][0] does not infer anything at control flow joins, every
//! jump target must be annotated with a [`StackMapEntry`] in the method's [`StackMapTable`]. At a
//! join, the walker either checks that the live frame fits the declared entry, or adopts the
//! declared entry as the new live frame (see [`MergeMode`]). This makes verification a single
//! linear pass.
//!
//! [0]: https://docs.oracle.com/javame/config/cldc/ref-impl/cldc1.1/jsr139/index.html

mod frame;
mod invoke;
mod merge;
mod method;
mod settings;
mod stack_map;
mod types;

pub use frame::*;
pub use merge::*;
pub use method::*;
pub use settings::*;
pub use stack_map::*;
pub use types::*;
