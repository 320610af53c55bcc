pub mod compose;
pub mod init;
pub mod libraries;
pub mod serve;

pub use compose::{compose, ComposeArgs};
pub use init::{init, InitArgs};
pub use libraries::{libraries, LibrariesArgs};
pub use serve::{serve, ServeArgs};
