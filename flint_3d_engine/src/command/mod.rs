/// Command recording - primary buffer sets, parallel secondary recording,
/// and the draw/compute data recorded into them

pub mod command_buffer_set;
pub mod draw;
pub mod secondary_recorder;

pub use command_buffer_set::*;
pub use draw::*;
pub use secondary_recorder::*;
