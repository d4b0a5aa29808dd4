mod check;
mod install;
mod plan;

pub use check::cmd_check;
pub use install::cmd_install;
pub use plan::cmd_plan;
