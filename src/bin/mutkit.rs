use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    mutkit_rs::cli::do_main()
}
