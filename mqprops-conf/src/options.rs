use structopt::StructOpt;

use crate::logging::Level;

#[derive(StructOpt, Debug, Clone, Default)]
pub struct Options {
    /// Config filename
    #[structopt(name = "config", short = "f", long)]
    pub cfg_name: Option<String>,

    /// Log level, overrides `log.level`
    #[structopt(name = "log-level", long)]
    pub log_level: Option<Level>,
}
