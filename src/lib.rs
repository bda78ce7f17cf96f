pub mod config;
pub mod diagnostics;
pub mod extract;
pub mod output;
pub mod process;
pub mod run;
