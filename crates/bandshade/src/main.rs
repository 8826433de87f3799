mod cli;
mod program;
mod run;
mod scene;

use anyhow::Result;

use crate::cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Render(args) => run::render(args),
        Command::Animate(args) => run::animate(args),
        Command::Inspect(args) => run::inspect(args),
        Command::Scene(args) => scene::run_scene(args),
        Command::Presets => {
            run::list_presets();
            Ok(())
        }
    }
}
