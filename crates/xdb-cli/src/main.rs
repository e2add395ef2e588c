//! XDB CLI - Command-line interface for the XML document store

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xdb_codec::{json_str_to_xml, xml_to_json_with_charset, Method, XmlOptions};
use xdb_core::{Credentials, DocumentService, User, XdbConfig};

#[derive(Parser)]
#[command(name = "xdb")]
#[command(about = "XDB - Multi-tenant XML document store")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "xdb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the store and create the root account
    Init,
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Read and write documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Convert between XML and JSON without touching the store
    Convert {
        #[command(subcommand)]
        command: ConvertCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add { login: String, password: String },
    /// Remove a user
    Rm { login: String },
}

#[derive(Subcommand)]
enum OrgCommands {
    /// Create organizations, one per name
    Create {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show organization metadata
    Info { org_id: String },
    /// Add a member
    AddUser { org_id: String, login: String },
    /// Remove a member
    RmUser { org_id: String, login: String },
}

#[derive(clap::Args)]
struct Auth {
    /// Login of the acting user
    #[arg(short, long, default_value = "root")]
    login: String,

    /// Password of the acting user
    #[arg(short, long, env = "XDB_PASSWORD")]
    password: String,
}

#[derive(Subcommand)]
enum DocCommands {
    /// Upload an XML document (reads stdin when no file is given)
    Put {
        org_id: String,
        file: Option<PathBuf>,
        /// Declared charset of the document
        #[arg(long)]
        charset: Option<String>,
        #[command(flatten)]
        auth: Auth,
    },
    /// Print a document as XML
    Get {
        org_id: String,
        doc_id: u64,
        #[command(flatten)]
        auth: Auth,
    },
    /// Delete a document
    Rm {
        org_id: String,
        doc_id: u64,
        #[command(flatten)]
        auth: Auth,
    },
}

#[derive(Subcommand)]
enum ConvertCommands {
    /// XML to BadgerFish JSON
    ToJson {
        file: Option<PathBuf>,
        #[arg(long)]
        charset: Option<String>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// BadgerFish JSON to XML
    ToXml {
        file: Option<PathBuf>,
        /// Output method: xml, html, text or c14n
        #[arg(long, default_value = "xml")]
        method: Method,
        #[arg(long, default_value = "utf-8")]
        encoding: String,
        /// Root element name for trees without a single root
        #[arg(long, default_value = "root")]
        root: String,
        /// Disable indentation
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Convert { command } => convert(command),
        command => {
            let config = load_config(&cli.config)?;
            let service = DocumentService::open(config).context("failed to open document store")?;
            run(&service, command)?;
            service.storage().flush().context("failed to flush store")?;
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<XdbConfig> {
    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        return Ok(XdbConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

fn run(service: &DocumentService, command: Commands) -> anyhow::Result<()> {
    let repo = service.repository();
    match command {
        Commands::Init => {
            println!("Store ready, {} user(s)", service.storage().user_count());
        }
        Commands::User { command } => match command {
            UserCommands::Add { login, password } => {
                let user = User::new(&login, &password)?;
                if repo.user_add(&user)? {
                    println!("Added user {}", user);
                } else {
                    bail!("user {} already exists", user);
                }
            }
            UserCommands::Rm { login } => {
                if !repo.user_remove(&login)? {
                    bail!("no user {}", login);
                }
                println!("Removed user {}", login);
            }
        },
        Commands::Org { command } => match command {
            OrgCommands::Create { names } => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                for org in repo.org_create_many(&names)? {
                    println!("{}\t{}", org.org_id(), org.org_name());
                }
            }
            OrgCommands::Info { org_id } => match service.org_info(&org_id)? {
                Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                None => bail!("no organization {}", org_id),
            },
            OrgCommands::AddUser { org_id, login } => {
                let user = stored_user(service, &login)?;
                let outcome = repo.org_add_user(&org_id, &user)?;
                println!("{:?}", outcome);
            }
            OrgCommands::RmUser { org_id, login } => {
                let user = stored_user(service, &login)?;
                let outcome = repo.org_remove_user(&org_id, &user)?;
                println!("{:?}", outcome);
            }
        },
        Commands::Doc { command } => match command {
            DocCommands::Put {
                org_id,
                file,
                charset,
                auth,
            } => {
                let user = authenticate(service, &auth)?;
                let body = read_input(file.as_deref())?;
                let result = service.add_document(&user, &org_id, &body, charset.as_deref())?;
                println!("{}", serde_json::to_string(&result)?);
            }
            DocCommands::Get { org_id, doc_id, auth } => {
                let user = authenticate(service, &auth)?;
                match service.get_document(&user, &org_id, doc_id)? {
                    Some(doc) => {
                        debug!("content type {}", doc.content_type());
                        let mut stdout = io::stdout().lock();
                        stdout.write_all(&doc.body)?;
                        stdout.write_all(b"\n")?;
                    }
                    None => bail!("document not found"),
                }
            }
            DocCommands::Rm { org_id, doc_id, auth } => {
                let user = authenticate(service, &auth)?;
                let result = service.delete_document(&user, &org_id, doc_id)?;
                println!("{}", serde_json::to_string(&result)?);
            }
        },
        Commands::Convert { command } => convert(command)?,
    }
    Ok(())
}

fn authenticate(service: &DocumentService, auth: &Auth) -> anyhow::Result<User> {
    let credentials = Credentials::new(auth.login.as_str(), auth.password.as_str());
    match service.authenticate(&credentials)? {
        Some(user) => Ok(user),
        None => bail!("authentication failed for {}", auth.login),
    }
}

fn stored_user(service: &DocumentService, login: &str) -> anyhow::Result<User> {
    match service.storage().load_user(&login.to_lowercase())? {
        Some(user) => Ok(user),
        None => bail!("no user {}", login),
    }
}

fn convert(command: ConvertCommands) -> anyhow::Result<()> {
    match command {
        ConvertCommands::ToJson {
            file,
            charset,
            pretty,
        } => {
            let input = read_input(file.as_deref())?;
            let tree = xml_to_json_with_charset(&input, charset.as_deref())?;
            let json = if pretty {
                tree.to_json_pretty()?
            } else {
                tree.to_json_string()?
            };
            println!("{}", json);
        }
        ConvertCommands::ToXml {
            file,
            method,
            encoding,
            root,
            compact,
        } => {
            let input = read_input(file.as_deref())?;
            let json = String::from_utf8(input).context("JSON input must be UTF-8")?;
            let options = XmlOptions::new()
                .with_method(method)
                .with_encoding(encoding.as_str())
                .with_default_root_name(root.as_str())
                .with_prettify(!compact);
            let xml = json_str_to_xml(&json, &options)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&xml)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
