mod app;

use std::env;
use std::process;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 800;

/// Exit status for a bad command line.
const USAGE_EXIT_CODE: i32 = 2;

/// `RUST_LOG` wins when set, info level otherwise.
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let params = match app::Params::from_args(env::args().skip(1), WIDTH, HEIGHT) {
        Ok(params) => params,
        Err(error) => {
            eprintln!("error: {:#}\n\n{}", error, app::USAGE);
            process::exit(USAGE_EXIT_CODE);
        }
    };

    let frame = app::run(&params)?;

    if params.show {
        // Window event loop needs the main thread, the process exits once the window task ends.
        show_image::run_context(move || {
            if let Err(error) = app::show(&frame) {
                log::error!("{:#}", error);
            }
        });
    }

    return Ok(());
}
