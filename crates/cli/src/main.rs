use anyhow::Result;

use solstice_cli::config::Config;
use solstice_cli::context::AppContext;
use solstice_cli::repl;

fn main() -> Result<()> {
    solstice_observability::init();

    let config = Config::from_env()?;
    let ctx = AppContext::open(&config)?;

    println!("Solstice CRM — type 'help' for commands");
    repl::run(&ctx)
}
