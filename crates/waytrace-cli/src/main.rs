//! waytrace binary
//!
//! Connects to the compositor, keeps a small checkerboard window mapped and
//! logs every event the server sends it, subject to `-f`/`-F` filters.

mod app;
mod buffer;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use waytrace_core::FilterRule;

#[derive(Parser, Debug)]
#[command(name = "waytrace")]
#[command(about = "Log Wayland events arriving at a diagnostic window")]
pub(crate) struct Args {
    /// Only show events matching INTERFACE[:EVENT] (repeatable)
    #[arg(short = 'f', value_name = "INTERFACE[:EVENT]")]
    pub(crate) filter: Vec<FilterRule>,

    /// Hide events matching INTERFACE[:EVENT] (repeatable)
    #[arg(short = 'F', value_name = "INTERFACE[:EVENT]")]
    pub(crate) inverse_filter: Vec<FilterRule>,

    /// Also log registry global announcements
    #[arg(short = 'g')]
    pub(crate) globals: bool,

    /// Write the raw keymap bytes to this file
    #[arg(short = 'M', value_name = "PATH")]
    pub(crate) dump_map: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Usage errors exit with 1 (clap's default would be 2); -h stays 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = u8::from(err.use_stderr());
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_parse() {
        let args = Args::try_parse_from([
            "waytrace", "-f", "wl_seat", "-f", "wl_pointer:motion", "-F", "wl_seat:name", "-g",
        ])
        .unwrap();
        assert_eq!(args.filter.len(), 2);
        assert_eq!(args.filter[1].interface, "wl_pointer");
        assert_eq!(args.filter[1].event.as_deref(), Some("motion"));
        assert_eq!(args.inverse_filter.len(), 1);
        assert!(args.globals);
        assert!(args.dump_map.is_none());
    }

    #[test]
    fn test_positional_arguments_rejected() {
        assert!(Args::try_parse_from(["waytrace", "extra"]).is_err());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["waytrace", "-x"]).is_err());
    }
}
