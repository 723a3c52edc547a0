pub mod cliclack;
#[allow(clippy::module_inception)]
pub mod prompt;
