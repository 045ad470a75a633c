use std::process::ExitCode;

fn main() -> ExitCode {
    match spadicd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("spadicd: {error}");
            ExitCode::FAILURE
        }
    }
}
