use std::ffi::OsString;

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = gtdo_core::run(args) {
        eprintln!("error: {err:#}");
        eprintln!("re-run the command to retry");
        std::process::exit(1);
    }
}
