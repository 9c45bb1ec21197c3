//! taskloop - command-line entry point.
//!
//! Loads configuration, prepares the vector index and runs the task loop
//! until it is interrupted, finishes, or keeps failing.

use std::sync::Arc;

use clap::Parser;
use taskloop::{
    cli::Cli,
    config::Config,
    llm::OpenAiClient,
    memory::{ContextRetriever, EmbeddingClient, IndexSpec, PineconeController, EMBEDDING_DIMENSION},
    orchestrator::{Orchestrator, StopReason},
    report,
    retry::RetryPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskloop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli.load_env()?;

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, index={}",
        config.llm.model, config.pinecone.index_name
    );
    if config.is_expensive_model() {
        report::expensive_model_warning(&config.llm.model);
    }
    report::objective(&config.run.objective);

    let retry_policy = RetryPolicy::default().with_max_retries(config.llm.max_retries);

    let llm = OpenAiClient::with_base_url(config.llm.api_key.clone(), &config.llm.api_base)
        .with_retry_policy(retry_policy.clone());
    let embedder = EmbeddingClient::new(
        config.llm.api_key.clone(),
        config.llm.embedding_model.clone(),
        EMBEDDING_DIMENSION,
    )
    .with_base_url(&config.llm.api_base)
    .with_retry_policy(retry_policy.clone());

    let controller = PineconeController::new(&config.pinecone.api_key, &config.pinecone.controller_url)
        .with_retry_policy(retry_policy);
    let spec = IndexSpec::cosine(&config.pinecone.index_name, &config.pinecone.pod_type);
    let index = controller.ensure_index(&spec).await?;
    info!("Vector index ready at {}", index.base_url());

    let retriever = ContextRetriever::new(Arc::new(embedder), Arc::new(index));
    let mut orchestrator = Orchestrator::new(
        Arc::new(llm),
        config.llm.model.clone(),
        retriever,
        config.run.clone(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping after the current iteration");
                on_interrupt.cancel();
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    let outcome = orchestrator.run(cancel).await;
    report::final_artifact(orchestrator.artifact());

    match outcome {
        Ok(reason) => {
            match reason {
                StopReason::Done => info!("Objective complete"),
                StopReason::IterationLimit => info!("Stopped at iteration limit"),
                StopReason::Cancelled => info!("Stopped on request"),
            }
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
