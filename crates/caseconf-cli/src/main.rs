use std::process::ExitCode;

fn main() -> ExitCode {
    caseconf_cli::run()
}
