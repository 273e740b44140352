//! Arcus Operator - ZooKeeper ensembles for Arcus cache clusters

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt, Resource, ResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arcus_operator::compiler::EnsembleCompiler;
use arcus_operator::config::ControllerConfig;
use arcus_operator::controller::{error_policy, reconcile, Context};
use arcus_operator::crd::Arcus;
use arcus_operator::{DEFAULT_CLUSTER_DOMAIN, OPERATOR_NAME};

/// Arcus operator - reconciles ZooKeeper ensembles declared by Arcus resources
#[derive(Parser, Debug)]
#[command(name = "arcus-operator", version, about, long_about = None)]
struct Cli {
    /// Generate the CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Arcus resources and the ConfigMaps, PodDisruptionBudgets,
    /// Services and StatefulSets they own.
    Controller(ControllerArgs),

    /// Print the defaulted Arcus and its desired children without a cluster
    Render(RenderArgs),
}

/// Controller mode arguments
#[derive(Parser, Debug)]
struct ControllerArgs {
    /// Seconds between periodic resyncs of a converged Arcus
    #[arg(long, env = "ARCUS_RESYNC_INTERVAL_SECS", default_value = "300")]
    resync_interval_secs: u64,

    /// Seconds before retrying a failed reconcile
    #[arg(long, env = "ARCUS_ERROR_REQUEUE_SECS", default_value = "10")]
    error_requeue_secs: u64,

    /// Only watch Arcus resources in this namespace
    #[arg(long, env = "ARCUS_NAMESPACE")]
    namespace: Option<String>,

    /// Cluster DNS domain used in peer hostnames
    #[arg(long, env = "ARCUS_CLUSTER_DOMAIN", default_value = DEFAULT_CLUSTER_DOMAIN)]
    cluster_domain: String,

    /// Do not install or update the CRD on startup
    #[arg(long, env = "ARCUS_SKIP_CRD_INSTALL")]
    skip_crd_install: bool,
}

impl ControllerArgs {
    fn config(&self) -> ControllerConfig {
        ControllerConfig {
            resync_interval: Duration::from_secs(self.resync_interval_secs),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
            cluster_domain: self.cluster_domain.clone(),
            ..Default::default()
        }
    }
}

/// Render mode arguments
#[derive(Args, Debug)]
struct RenderArgs {
    /// Path to an Arcus YAML manifest
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Cluster DNS domain used in peer hostnames
    #[arg(long, default_value = DEFAULT_CLUSTER_DOMAIN)]
    cluster_domain: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&Arcus::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Render(args)) => run_render(args).await,
        Some(Commands::Controller(args)) => run_controller(args).await,
        // Bare invocation: defaults plus ARCUS_* environment
        None => run_controller(ControllerArgs::parse_from(["arcus-operator"])).await,
    }
}

/// Ensure the Arcus CRD is installed
///
/// Server-side apply keeps the installed CRD in step with the operator version.
async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(OPERATOR_NAME).force();

    tracing::info!("Installing Arcus CRD...");
    crds.patch(Arcus::crd_name(), &params, &Patch::Apply(&Arcus::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install Arcus CRD: {}", e))?;

    tracing::info!("Arcus CRD installed/updated");
    Ok(())
}

/// Run the controller until a shutdown signal arrives
async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    tracing::info!("Arcus controller starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if args.skip_crd_install {
        tracing::info!("Skipping CRD install");
    } else {
        ensure_crd_installed(&client).await?;
    }

    let config = args.config();
    let ctx = Arc::new(Context::builder(client.clone()).config(config).build());

    let (arcuses, config_maps, pdbs, services, statefulsets) = match args.namespace.as_deref() {
        Some(ns) => {
            tracing::info!(namespace = %ns, "Watching a single namespace");
            (
                Api::<Arcus>::namespaced(client.clone(), ns),
                Api::<ConfigMap>::namespaced(client.clone(), ns),
                Api::<PodDisruptionBudget>::namespaced(client.clone(), ns),
                Api::<Service>::namespaced(client.clone(), ns),
                Api::<StatefulSet>::namespaced(client.clone(), ns),
            )
        }
        None => (
            Api::<Arcus>::all(client.clone()),
            Api::<ConfigMap>::all(client.clone()),
            Api::<PodDisruptionBudget>::all(client.clone()),
            Api::<Service>::all(client.clone()),
            Api::<StatefulSet>::all(client.clone()),
        ),
    };

    tracing::info!("Starting Arcus controller");
    Controller::new(arcuses, WatcherConfig::default())
        .owns(config_maps, WatcherConfig::default())
        .owns(pdbs, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .owns(statefulsets, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(arcus = %obj.name, ?action, "Arcus reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Arcus reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("Arcus controller stopped");
    Ok(())
}

/// Print the defaulted Arcus and the four children it would produce
async fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", args.file, e))?;

    let mut arcus: Arcus = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse Arcus manifest: {}", e))?;
    if arcus.metadata.name.is_none() {
        anyhow::bail!("Arcus must have metadata.name");
    }
    if arcus.metadata.namespace.is_none() {
        arcus.metadata.namespace = Some("default".to_string());
    }

    arcus.with_defaults();
    arcus
        .spec
        .zookeeper
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid Arcus: {}", e))?;

    let identity = arcus.identity()?;
    let owner = render_owner(&arcus);
    let compiled = EnsembleCompiler::new(&identity, &arcus.spec.zookeeper, &owner)
        .with_cluster_domain(&args.cluster_domain)
        .compile()?;

    let mut documents = vec![serde_yaml::to_string(&arcus)?];
    for child in compiled.into_children() {
        documents.push(child.to_yaml()?);
    }
    println!("{}", documents.join("---\n"));
    Ok(())
}

/// Owner reference for an Arcus that may never have been stored
fn render_owner(arcus: &Arcus) -> OwnerReference {
    OwnerReference {
        api_version: Arcus::api_version(&()).to_string(),
        kind: Arcus::kind(&()).to_string(),
        name: arcus.name_any(),
        uid: arcus.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}
