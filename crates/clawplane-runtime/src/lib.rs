pub mod command;
pub mod exec;
pub mod interpret;
pub mod retry;
pub mod runner;
pub mod stream;
pub mod target;

pub use command::*;
pub use exec::*;
pub use interpret::*;
pub use retry::*;
pub use runner::*;
pub use stream::*;
pub use target::*;
