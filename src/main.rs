use clap::Parser;
use emakhua::cli::commands::{backup, completions, convert, db, init, stats, watch, word};
use emakhua::cli::{Cli, Commands};
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Terminate quietly on a closed pipe (`emakhua search | head`).
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let default_filter = if global.verbose {
        "emakhua=debug"
    } else {
        "emakhua=warn"
    };
    let filter = EnvFilter::try_from_env("EMAKHUA_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Convert(args) => convert::run(args, &global),
        Commands::Init(args) => init::run(args, &global),
        Commands::Add(args) => word::run_add(args, &global),
        Commands::Search(args) => word::run_search(args, &global),
        Commands::Show(args) => word::run_show(args, &global),
        Commands::Update(args) => word::run_update(args, &global),
        Commands::Remove(args) => word::run_remove(args, &global),
        Commands::Stats(args) => stats::run(args, &global),
        Commands::Backup(cmd) => backup::run_backup(cmd, &global),
        Commands::Portable(cmd) => backup::run_portable(cmd, &global),
        Commands::Watch(args) => watch::run(args, &global),
        Commands::Db(cmd) => db::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}
