//! Binary entry point. All setup, event handling, and rendering is managed
//! by the `app` module; the exit code distinguishes a clean quit from a
//! fatal startup or frame error.

use std::process::ExitCode;

fn main() -> ExitCode {
    pointflow::app::run()
}
