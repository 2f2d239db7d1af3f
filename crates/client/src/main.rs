use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use heritage_auth::{
    parse_identity, FileStorage, IdentityStore, MemoryStorage, NavigationGate, RouteTable, StorageScope,
    IDENTITY_KEY,
};
use heritage_client::{ApiClient, ClientConfig, Envelope, MultipartPayload, QueryParams};

/// heritage-client - talk to the heritage backend as the stored identity
///
/// Environment: HERITAGE_API_URL (default http://localhost:8080),
/// HERITAGE_IDENTITY_HEADER (default X-User-Id), HERITAGE_IDENTITY (session identity JSON).
#[derive(Parser, Debug)]
#[command(name = "heritage-client")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the navigation gate for a route
    Navigate {
        /// Target path
        to: String,
        /// Path being left
        from: Option<String>,
    },

    /// GET with query parameters
    Get {
        url: String,
        /// Query parameters, in order
        #[arg(value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },

    /// POST a JSON body
    Post {
        url: String,
        #[arg(value_parser = parse_json)]
        body: serde_json::Value,
    },

    /// PUT a JSON body
    Put {
        url: String,
        #[arg(value_parser = parse_json)]
        body: serde_json::Value,
    },

    /// DELETE a resource
    #[command(alias = "del")]
    Delete { url: String },

    /// Multipart upload of a file as field 'file'
    Upload {
        url: String,
        file: PathBuf,
        /// Extra text fields
        #[arg(value_parser = parse_pair)]
        fields: Vec<(String, String)>,
    },

    /// Show the identity requests are sent as
    Whoami,

    /// Store an identity record persistently
    Remember {
        /// Identity record JSON
        record: String,
    },

    /// Clear the stored identity
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    heritage_observability::init();

    let store = open_store()?;
    let config = ClientConfig::from_env()?;
    let api = ApiClient::with_reqwest(config, Arc::new(store.fallback_provider()));

    match cli.command {
        Commands::Navigate { to, from } => {
            let gate = NavigationGate::new(Arc::new(store.session_provider()), RouteTable::application());
            let decision = gate.navigate(&to, from.as_deref());
            let explanation = gate.explain(&to);
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "decision": decision,
                "reason": explanation.reason,
            }))?);
        }
        Commands::Get { url, params } => {
            let params: QueryParams = params.into_iter().collect();
            print_envelope(api.get(&url, &params).await?)?;
        }
        Commands::Post { url, body } => print_envelope(api.post(&url, &body).await?)?,
        Commands::Put { url, body } => print_envelope(api.put(&url, &body).await?)?,
        Commands::Delete { url } => print_envelope(api.del(&url).await?)?,
        Commands::Upload { url, file, fields } => {
            let mut payload = MultipartPayload::new()
                .file_from_path("file", &file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            for (key, value) in fields {
                payload = payload.text(key, value);
            }
            print_envelope(api.upload(&url, payload).await?)?;
        }
        Commands::Whoami => match api.current_user() {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("anonymous"),
        },
        Commands::Remember { record } => {
            let record = parse_identity(&record).context("invalid identity record")?;
            store.remember_identity(&record)?;
            tracing::info!(user_id = %record.id, "identity remembered");
        }
        Commands::Forget => store.clear_identity()?,
    }

    Ok(())
}

/// Session scope lives in memory for this process, seeded from
/// `HERITAGE_IDENTITY`; the persistent scope is a file in the data dir.
fn open_store() -> Result<IdentityStore> {
    let session = Arc::new(MemoryStorage::new());
    if let Ok(raw) = std::env::var("HERITAGE_IDENTITY") {
        session.set(IDENTITY_KEY, &raw)?;
    }

    let persistent: Arc<dyn StorageScope> = match FileStorage::default_location() {
        Ok(file) => Arc::new(file),
        Err(err) => {
            tracing::warn!(error = %err, "persistent storage unavailable; using memory");
            Arc::new(MemoryStorage::new())
        }
    };

    Ok(IdentityStore::new(session, persistent))
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|err| format!("body must be valid JSON: {err}"))
}

fn print_envelope(envelope: Envelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn get_collects_ordered_pairs() {
        let cli = Cli::try_parse_from(["heritage-client", "get", "/api/search", "q=瓷", "page=2"]).unwrap();
        match cli.command {
            Commands::Get { url, params } => {
                assert_eq!(url, "/api/search");
                assert_eq!(
                    params,
                    vec![("q".to_string(), "瓷".to_string()), ("page".to_string(), "2".to_string())]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["heritage-client", "get", "/x", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["heritage-client", "post", "/x", "{oops"]).is_err());
        assert!(Cli::try_parse_from(["heritage-client", "delete"]).is_err());
    }

    #[test]
    fn navigate_takes_optional_origin() {
        let cli = Cli::try_parse_from(["heritage-client", "navigate", "/users", "/"]).unwrap();
        match cli.command {
            Commands::Navigate { to, from } => {
                assert_eq!(to, "/users");
                assert_eq!(from.as_deref(), Some("/"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
