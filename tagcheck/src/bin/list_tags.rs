use clap::Parser;
use tagcheck::cli::TagsArgs;
use tagcheck::commands::tags;

fn main() {
    let args = TagsArgs::parse();
    let code = tags::execute(args, |key| std::env::var(key).ok());
    std::process::exit(code);
}
