use clap::Parser;

fn main() {
    let cli = autopressctl::Cli::parse();
    if let Err(err) = autopressctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
