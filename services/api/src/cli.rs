use crate::server;
use application_intake::config::AppConfig;
use application_intake::error::AppError;
use application_intake::workflows::submission::ModusignClient;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Application Intake",
    about = "Receive applicant submissions, archive them to Drive, and request signatures",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the signing template's details as JSON
    Template(TemplateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct TemplateArgs {
    /// Template to look up; defaults to the configured TEMPLATE_ID
    #[arg(long)]
    pub(crate) template_id: Option<String>,
    /// API key to authenticate with instead of MODUSIGN_API_KEY
    #[arg(long)]
    pub(crate) api_key: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Template(args) => print_template(args).await,
    }
}

async fn print_template(args: TemplateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let client = ModusignClient::new(&config.signing)?;
    let client = match args.api_key {
        Some(api_key) => client.with_api_key(api_key),
        None => client,
    };
    let template_id = args.template_id.unwrap_or(config.signing.template_id);

    let template = client.template(&template_id).await?;
    println!("{template:#}");
    Ok(())
}
