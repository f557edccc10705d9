use clap::Parser;
use tagcheck::cli::ExistsArgs;
use tagcheck::commands::exists;

fn main() {
    let args = ExistsArgs::parse();
    let code = exists::execute(args, |key| std::env::var(key).ok());
    std::process::exit(code);
}
