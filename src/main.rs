use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use qimb_client::config::{ClientConfig, PushConfig};
use qimb_client::error::{QimbError, Result};
use qimb_client::interfaces::handler::{handler_fn, MessageHandler};
use qimb_client::webhook;
use qimb_client::{Envelope, QimbClient};

#[derive(Parser, Debug)]
#[command(name = "qimb-console")]
#[command(about = "Publish and receive messages through a qimb gateway")]
struct Cli {
    #[arg(long, env = "QIMB_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    poll_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Publish {
        message_type: String,
        message: String,
    },
    /// Prints every message of a type; messages starting with `reply ` are
    /// answered to their sender.
    Subscribe {
        message_type: String,

        #[arg(long)]
        push_url: Option<String>,

        #[arg(long)]
        listen: Option<String>,
    },
    /// Publishes once and waits for a node-direct reply.
    Request {
        message_type: String,
        message: String,

        #[arg(long)]
        push_url: Option<String>,

        #[arg(long)]
        listen: Option<String>,

        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qimb_client=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    match cli.command {
        Commands::Publish {
            message_type,
            message,
        } => {
            let client = QimbClient::from_config(config)?;
            let message_id = client.publish(&message_type, &message).await?;
            println!("{message_id}");
            Ok(())
        }
        Commands::Subscribe {
            message_type,
            push_url,
            listen,
        } => {
            apply_push_overrides(&mut config, push_url, listen);
            subscribe(config, &message_type).await
        }
        Commands::Request {
            message_type,
            message,
            push_url,
            listen,
            timeout_secs,
        } => {
            apply_push_overrides(&mut config, push_url, listen);
            request(config, &message_type, &message, Duration::from_secs(timeout_secs)).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => {
            let endpoint = cli.endpoint.clone().ok_or_else(|| {
                QimbError::Config("either --endpoint or --config is required".to_string())
            })?;
            ClientConfig::new(endpoint)
        }
    };
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.poll_interval_ms = Some(poll_ms);
    }
    Ok(config)
}

fn apply_push_overrides(config: &mut ClientConfig, push_url: Option<String>, listen: Option<String>) {
    if push_url.is_none() && listen.is_none() {
        return;
    }
    let mut push = config.push.take().unwrap_or(PushConfig {
        listen_addr: "0.0.0.0:8080".to_string(),
        path: None,
        public_url: None,
    });
    if let Some(listen) = listen {
        push.listen_addr = listen;
    }
    if push_url.is_some() {
        push.public_url = push_url;
    }
    config.push = Some(push);
}

async fn subscribe(config: ClientConfig, message_type: &str) -> Result<()> {
    let client = Arc::new(QimbClient::from_config(config.clone())?);
    let replier = client.clone();
    let handler = handler_fn(move |envelope: Envelope| {
        let client = replier.clone();
        async move {
            println!("{}", envelope.message());
            if let Some(reply) = envelope.message().strip_prefix("reply ") {
                client.publish_direct(envelope.sender_node_id(), reply).await?;
            }
            Ok(())
        }
    });

    let listener = start_listener(&client, &config, handler.clone());
    let push_url = config.push.as_ref().and_then(|push| push.public_url.clone());
    client.subscribe(message_type, push_url.as_deref()).await?;
    println!("subscribed to '{message_type}' as node {}", client.node_id());

    let poller = client.begin_receive(handler);
    wait_for_ctrl_c().await;
    poller.stop().await?;
    stop_listener(listener).await
}

async fn request(
    config: ClientConfig,
    message_type: &str,
    message: &str,
    timeout: Duration,
) -> Result<()> {
    let client = Arc::new(QimbClient::from_config(config.clone())?);
    let (reply_tx, mut reply_rx) = mpsc::channel::<Envelope>(16);
    let handler = handler_fn(move |envelope: Envelope| {
        // Only the first reply is read; later ones are dropped.
        let _ = reply_tx.try_send(envelope);
        async { Ok(()) }
    });

    let listener = start_listener(&client, &config, handler.clone());
    let push_url = config.push.as_ref().and_then(|push| push.public_url.clone());
    client.subscribe_direct(push_url.as_deref()).await?;
    let poller = client.begin_receive(handler);

    let started = Instant::now();
    let message_id = client.publish(message_type, message).await?;
    println!("sent {message_id} from node {}", client.node_id());

    tokio::select! {
        reply = tokio::time::timeout(timeout, reply_rx.recv()) => match reply {
            Ok(Some(envelope)) => println!(
                "reply from {} after {} ms: {}",
                envelope.sender_node_id(),
                started.elapsed().as_millis(),
                envelope.message()
            ),
            Ok(None) => println!("receive loop ended without a reply"),
            Err(_) => println!("no reply within {} s", timeout.as_secs()),
        },
        _ = wait_for_ctrl_c() => {}
    }

    drop(reply_rx);
    poller.stop().await?;
    stop_listener(listener).await
}

struct Listener {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

fn start_listener(
    client: &QimbClient,
    config: &ClientConfig,
    handler: Arc<dyn MessageHandler>,
) -> Option<Listener> {
    let push = config.push.as_ref()?;
    let router = webhook::build_router(
        Arc::new(client.push_ingester(handler)),
        &config.push_path(),
    );
    let addr = push.listen_addr.clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        webhook::serve_with_shutdown(&addr, router, async move {
            let _ = shutdown_rx.await;
        })
        .await
    });
    Some(Listener { shutdown_tx, task })
}

async fn stop_listener(listener: Option<Listener>) -> Result<()> {
    let Some(listener) = listener else {
        return Ok(());
    };
    let _ = listener.shutdown_tx.send(());
    listener
        .task
        .await
        .map_err(|e| QimbError::Runtime(e.to_string()))?
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "unable to listen for ctrl-c");
        futures::future::pending::<()>().await;
    }
}
