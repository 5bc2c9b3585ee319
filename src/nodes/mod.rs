pub mod process;
pub mod state;

pub use process::BlockProcess;
pub use state::EmitState;
