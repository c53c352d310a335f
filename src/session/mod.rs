//! Participant session helpers owned by the presentation layer.

pub mod forms;
pub mod prompt;
pub mod timer;

pub use forms::*;
pub use prompt::*;
pub use timer::*;
