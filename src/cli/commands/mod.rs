//! CLI command implementations.

mod doctor;
mod init;
mod list;
mod run;
mod show;

pub use doctor::run_doctor;
pub use init::run_init;
pub use list::run_list;
pub use run::run_pipeline;
pub use show::run_show;
