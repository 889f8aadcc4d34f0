use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(about, version)]
pub struct Cli {
    #[arg(short, long, value_name = "BOARD FILE",
	  help = "Board description to route, as a JSON dump of the board model")]
    pub board: PathBuf,
    #[arg(short, long, value_name = "SETTINGS FILE",
	  help = "Router settings in JSON. Settings derived from the board are used by default")]
    pub settings: Option<PathBuf>,
    #[arg(short, long, value_name = "OUTPUT FILE",
	  help = "Where to write the routed board. The board file name is used by default, with the extension changed to .routed.json")]
    pub output: Option<PathBuf>,
    #[arg(short, long, value_name = "N", help = "Run at most N passes")]
    pub max_passes: Option<usize>,
    #[arg(long, help = "Optimize the routes once routing is done")]
    pub optimize: bool,
}
