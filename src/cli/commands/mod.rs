//! One module per subcommand.  Each exposes an `execute` function that
//! `main` dispatches to.

pub mod completions;
pub mod create;
pub mod decrypt;
pub mod delete;
pub mod encrypt;
pub mod export;
pub mod get;
pub mod history;
pub mod keygen;
pub mod list;
pub mod merge;
pub mod update;
