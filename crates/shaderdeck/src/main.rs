mod cli;
mod config;
mod fonts;
mod paths;
mod run;

use anyhow::Result;

use cli::Command;

fn main() -> Result<()> {
    let args = cli::parse();
    run::initialise_tracing();

    match args.command {
        Command::List(list) => run::list(list),
        Command::Check(check) => run::check(check),
        Command::Preview(preview) => run::preview(&run::Environment::discover()?, preview),
        Command::Export(export) => run::export(&run::Environment::discover()?, export),
        Command::Init(init) => run::init(&run::Environment::discover()?, init),
        Command::Where => {
            run::describe_paths(&run::Environment::discover()?);
            Ok(())
        }
    }
}
