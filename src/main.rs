use actix_web::{
    get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use kube::CustomResourceExt;
use prometheus::{Encoder, TextEncoder};
use provider_openstack::{
    api::extensions::{Cluster, ControlPlane},
    telemetry, State,
};
use tokio::time::Duration;
use tracing::error;

/// OpenStack control plane values provider
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address of the metrics and diagnostics server
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8443")]
    bind: String,

    /// Seconds between two derivations of the values of a control plane
    #[arg(long, env = "REQUEUE_SECONDS", default_value_t = 300)]
    requeue_seconds: u64,

    /// Print the custom resource definitions and exit
    #[arg(long)]
    crd: bool,
}

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok().body(buffer),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print!(
            "{}---\n{}",
            serde_yaml::to_string(&ControlPlane::crd())?,
            serde_yaml::to_string(&Cluster::crd())?
        );
        return Ok(());
    }

    telemetry::init().await?;

    // Init k8s controller state
    let state = State::new();
    let controller =
        provider_openstack::run(state.clone(), Duration::from_secs(cli.requeue_seconds));

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind(&cli.bind)?
    .shutdown_timeout(5)
    .run();

    let (controller, server) = tokio::join!(controller, server);
    controller?;
    server?;
    Ok(())
}
