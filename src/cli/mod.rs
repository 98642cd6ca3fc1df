pub mod dashboard;
pub mod logs;
pub mod run;
pub mod setup;
pub mod ui;
