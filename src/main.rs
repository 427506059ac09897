use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use winit::dpi::LogicalSize;
use winit::event_loop::EventLoop;

use lazyview::cli::{Cli, commit_sink};
use lazyview::ui::App;
use lazyview::{CodecRegistry, Exit, NavigationRing, Viewer, ViewerError};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(exit) => {
            log::debug!("Exiting: {:?}", exit);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Exit, ViewerError> {
    let ring = NavigationRing::build(cli.files)?;
    let commit_out = commit_sink(cli.output.as_deref())?;
    let registry = CodecRegistry::with_defaults();
    log::info!(
        "{} files, codecs: {}",
        ring.len(),
        registry.names().collect::<Vec<_>>().join(", ")
    );

    let viewer = Viewer::new(ring, registry, commit_out);
    let event_loop = EventLoop::new()?;
    let mut app = App::new(viewer, LogicalSize::new(cli.width, cli.height));
    event_loop.run_app(&mut app)?;
    app.into_outcome()
}
