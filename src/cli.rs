use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Esc / q                : Quit
  t / l / Right / Space  : Next image
  n / h / Left / Bksp    : Previous image
  r                      : Reload current image
  Enter                  : Print current filename
";

#[derive(Parser, Debug)]
#[command(name = "lazyview", version, about = "A minimal image viewer", after_help = HELP_KEYS)]
pub struct Cli {
    /// Image files to cycle through, in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Append committed filenames to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value = "720")]
    pub height: u32,
}

/// Destination for the commit key: stdout, or a file opened for append.
pub fn commit_sink(output: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
