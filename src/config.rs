use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "coursebook-server")]
#[command(about = "Course enrollment, progress and feedback records over HTTP", long_about = None)]
#[command(version)]
pub struct Config {
    /// Directory holding the courses, enrollments and feedback records
    #[arg(long, env = "COURSEBOOK_DATA_DIR", default_value = "coursebook")]
    pub data_dir: PathBuf,

    /// Address the HTTP server listens on
    #[arg(long, env = "COURSEBOOK_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,
}
