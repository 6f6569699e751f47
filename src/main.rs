use clap::Parser;
use cockpit::cli::{Cli, Commands};
use cockpit::core::Config;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
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
    let config = Config::load();
    let global = cli.global.with_default_format(config.default_format.as_deref());

    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init(args) => cockpit::cli::commands::init::run(args),
        Commands::Template(args) => cockpit::cli::commands::template::run(args),
        Commands::Import(args) => cockpit::cli::commands::import::run(args, &global),
        Commands::Project(cmd) => cockpit::cli::commands::project::run(cmd, &global),
        Commands::Completions(args) => cockpit::cli::commands::completions::run(args),
    }
}
