use checkpoint_telemetry::app;

#[tokio::main]
async fn main() {
    std::process::exit(app::main().await);
}
