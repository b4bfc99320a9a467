//! Binary entry point for `deplink`.

use std::process;

fn main() {
    if let Err(e) = deplink::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
