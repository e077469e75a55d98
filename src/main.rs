use clap::Parser;
use glob_changed_files::cli::Cli;
use glob_changed_files::context::{self, Context, Credentials};
use glob_changed_files::git::GitCli;
use glob_changed_files::github::{GitHubApi, HostApi};
use glob_changed_files::output;
use glob_changed_files::runner::{self, Deps};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Reset SIGPIPE handler to default (terminate) so piping to head/tail works correctly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    let cli = Cli::parse();

    let use_color = !cli.no_color && atty::is(atty::Stream::Stderr);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(use_color)
        .with_target(false)
        .init();

    let context = Context::from_env()?;
    let token = context::resolve_token(cli.token.clone());
    let credentials = token.as_deref().map(Credentials::from_token);
    let api = match token.as_deref() {
        Some(token) => Some(GitHubApi::new(&context.api_url, &context.repo, token)?),
        None => None,
    };

    let git = GitCli::new(&context);
    let deps = Deps {
        git: &git,
        api: api.as_ref().map(|api| api as &dyn HostApi),
        credentials: credentials.as_ref(),
    };

    let outputs = runner::run(&cli.inputs(), &context.event, &deps)?;
    output::write_outputs(&outputs.paths, context.github_output.as_deref(), cli.format)?;
    Ok(())
}
