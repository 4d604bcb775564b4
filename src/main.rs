mod api;
mod commands;
mod config;
mod dates;
mod history;
mod message;
mod options;
mod output;
mod pagination;
mod table;
#[cfg(test)]
mod testing;
mod users;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::api::ApiClient;
use crate::commands::{Command, Session};
use crate::config::Config;
use crate::options::Options;

const USAGE: &str = "Usage: slack-web-api <command> [--key value ...]";
const LOG_ENV: &str = "SLACK_WEB_API_LOG";

#[derive(Parser)]
#[command(
    name = "slack-web-api",
    version,
    about = "Slack Web API CLI",
    after_help = "Commands:\n  list_channels     List conversations (--types, --limit, --all)\n  post              Post a message (--channel, --text/--text_file, --blocks_json/--blocks_file, --attachments_json/--attachments_file)\n  post_table        Post an ASCII table (--channel, --headers_json/--headers_file, --rows_json/--rows_file, --title, --max_rows, --max_col_width, --include_index)\n  delete            Delete a message (--channel, --ts)\n  search            Search messages (--query, --count, --sort, --sort_dir)\n  channel_history   Read channel history (--channel, --limit, --all, --oldest, --latest, --include_threads, --resolve_users)\n  thread            Read thread replies (--channel, --ts, --limit, --all, --resolve_users)\n  reactions_add     Add a reaction (--channel, --ts, --name)\n  reactions_remove  Remove a reaction (--channel, --ts, --name)\n\nExamples:\n  slack-web-api list_channels --all\n  slack-web-api post --channel C123 --text \"hello\"\n  slack-web-api post_table --channel C123 --headers_json '[\"a\",\"b\"]' --rows_json '[[1,2]]'\n  slack-web-api channel_history --channel C123 --oldest \"2d ago\" --resolve_users\n\nGlobal flags (-v, -h, -V) go before the command; anything after it is a command option.\nRequires SLACK_TOKEN in the environment."
)]
struct Cli {
    #[arg(short, long, help = "Log API calls to stderr (only before COMMAND)")]
    verbose: bool,

    // Everything after the command name is passed through untouched, `--help` included.
    #[arg(
        value_name = "COMMAND [OPTIONS]",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Command to run, then its options as --key value pairs"
    )]
    invocation: Vec<String>,
}

impl Cli {
    fn split_command(self) -> (Option<String>, Vec<String>) {
        let mut invocation = self.invocation.into_iter();
        (invocation.next(), invocation.collect())
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            std::process::exit(if error.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(cli.verbose);

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("slack_web_api=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (name, args) = cli.split_command();
    let name = name.ok_or(USAGE)?;
    let command = Command::from_name(&name).ok_or_else(|| format!("Unknown command: {name}"))?;
    let options = Options::parse(args)?;
    let config = Config::load()?;

    let api = ApiClient::new(config.api_base_url, config.token);
    let result = Session::new(&api, &options).run(command).await?;
    output::print_json(&result)?;
    Ok(())
}
