use std::io::Write;
use std::sync::Arc;

use castor::types::{AuthKind, ContentKind};
use castor::{
    ChatClient, ChatRequest, Config, ConversationMessage, Credentials, MemoryTokenStore,
    ProviderConfig, UnifiedStreamEvent,
};
use futures::StreamExt;
use mimalloc::MiMalloc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: castor <models|login> <provider> | castor chat <provider> <prompt>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        loglevel = %cfg.basic.loglevel,
        app_scheme = %cfg.basic.app_scheme,
        proxy = %cfg.basic.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        providers = cfg.providers.len()
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, provider_id) = match args.as_slice() {
        [command, provider, ..] => (command.as_str(), provider.as_str()),
        _ => {
            eprintln!("{USAGE}");
            return Ok(());
        }
    };
    let Some(provider) = cfg.provider(provider_id).cloned().map(Arc::new) else {
        eprintln!("unknown provider: {provider_id}");
        return Ok(());
    };

    let client = ChatClient::new(&cfg, Arc::new(MemoryTokenStore::new()))?;

    match command {
        "login" => login(&client, &provider).await?,
        "models" => {
            let credentials = credentials_for(&client, &provider).await?;
            for model in client.fetch_models(&provider, &credentials).await? {
                println!("{}\t{}", model.id, model.name);
            }
        }
        "chat" => {
            let prompt = args[2..].join(" ");
            if prompt.trim().is_empty() {
                eprintln!("{USAGE}");
                return Ok(());
            }
            let credentials = credentials_for(&client, &provider).await?;
            chat(&client, provider, credentials, prompt).await;
        }
        _ => eprintln!("{USAGE}"),
    }
    Ok(())
}

/// `<ID>_API_KEY` from the environment, or an interactive login for OAuth providers.
async fn credentials_for(
    client: &ChatClient,
    provider: &ProviderConfig,
) -> Result<Credentials, Box<dyn std::error::Error>> {
    let var = format!("{}_API_KEY", provider.id.to_uppercase().replace('-', "_"));
    if let Ok(key) = std::env::var(&var) {
        return Ok(Credentials::ApiKey(key));
    }
    match provider.auth {
        AuthKind::None => Ok(Credentials::None),
        AuthKind::ApiKey => {
            warn!(provider = %provider.id, var = %var, "API key not set");
            Ok(Credentials::None)
        }
        AuthKind::OAuth => {
            if client.oauth().tokens(&provider.id).await?.is_none() {
                login(client, provider).await?;
            }
            Ok(Credentials::OAuth)
        }
    }
}

async fn login(
    client: &ChatClient,
    provider: &ProviderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = client.oauth().start_auth_flow(provider, None)?;
    println!("Open this URL in a browser:\n\n{url}\n");
    println!("Paste the redirect URI here:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let tokens = client.oauth().handle_callback(line.trim()).await?;
    info!(
        provider = %provider.id,
        email = %tokens.email.as_deref().unwrap_or("<unknown>"),
        "Logged in"
    );
    Ok(())
}

async fn chat(
    client: &ChatClient,
    provider: Arc<ProviderConfig>,
    credentials: Credentials,
    prompt: String,
) {
    let req = ChatRequest::new(provider, vec![ConversationMessage::user(prompt)])
        .with_credentials(credentials);
    let mut stream = client.stream_chat(req);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                client.cancel_streaming();
                eprintln!("\n[cancelled]");
                break;
            }
            event = stream.next() => {
                let Some(event) = event else { break };
                match event {
                    UnifiedStreamEvent::Content { text, kind: ContentKind::Answer, .. } => {
                        print!("{text}");
                        let _ = stdout.flush();
                    }
                    UnifiedStreamEvent::Content { text, kind: ContentKind::Thought, .. } => {
                        eprint!("{text}");
                    }
                    UnifiedStreamEvent::Done { finish_reason, model_id } => {
                        println!();
                        info!(
                            finish_reason = %finish_reason.as_deref().unwrap_or("-"),
                            model = %model_id.as_deref().unwrap_or("-"),
                            "Done"
                        );
                    }
                    UnifiedStreamEvent::Error { message, code, recoverable } => {
                        println!();
                        warn!(
                            code = %code.map(|c| c.to_string()).unwrap_or_default(),
                            recoverable,
                            "{message}"
                        );
                    }
                    UnifiedStreamEvent::Connected | UnifiedStreamEvent::KeepAlive => {}
                }
            }
        }
    }
}
