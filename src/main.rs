//! fpembed CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

fn main() {
    if let Err(e) = fpembed::run() {
        eprintln!("error: {}", fpembed::error_chain(&e));
        std::process::exit(1);
    }
}
