pub mod domain;
pub mod fetch;
pub mod init;
pub mod resave;
pub mod scripts;

pub use domain::{domain, DomainArgs};
pub use fetch::{fetch, FetchArgs};
pub use init::{init, InitArgs};
pub use resave::{resave, ResaveArgs};
pub use scripts::{scripts, ScriptsArgs};
