pub mod args;
pub mod logging;
pub mod recipe;
pub mod run;
