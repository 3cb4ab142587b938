#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use vestibule::{
    flow::LoginFlow,
    handlers::{health, login_callback, login_redirect},
    settings::VestibuleSettings,
    utils::responses::default_outcome_renderer,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables.
    // This also initializes the logger.
    let settings = VestibuleSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // Build provider adapters; misconfigured providers abort startup here
    let flow = LoginFlow::from_settings(&settings)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize providers: {e}")))?;
    if flow.provider_paths().next().is_none() {
        return Err(std::io::Error::other(
            "No providers are configured. Add at least one [[providers]] entry to Settings.toml.",
        ));
    }

    start_server(flow, settings).await
}

/// Start the server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(flow: LoginFlow, settings: VestibuleSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &flow, &settings);

    let flow = web::Data::new(flow);
    let renderer = web::Data::new(default_outcome_renderer());
    let login_route = settings.routes.login_route();
    let callback_route = settings.routes.callback_route();
    let settings = web::Data::new(settings);

    HttpServer::new(move || {
        App::new()
            .app_data(flow.clone())
            .app_data(renderer.clone())
            .app_data(settings.clone())
            .wrap(Logger::default())
            .route(&login_route, web::get().to(login_redirect))
            .route(&callback_route, web::get().to(login_callback))
            .route(&callback_route, web::post().to(login_callback))
            .route("/ping", web::get().to(health))
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, flow: &LoginFlow, settings: &VestibuleSettings) {
    println!("Starting Vestibule OIDC Login Mediator on http://{bind_address}");
    println!();
    println!("Login endpoints:");
    println!(
        "  GET  {}      - Issue provider redirect",
        settings.routes.login_route()
    );
    println!(
        "  GET|POST {} - Provider callback (POST for form_post providers)",
        settings.routes.callback_route()
    );
    println!();
    println!("Callback URLs to register with identity providers:");
    for path in flow.provider_paths() {
        println!(
            "  {}{}",
            settings.application.redirect_base_url,
            settings.routes.callback_path(path)
        );
    }
    println!();
    println!("System endpoints:");
    println!("  GET  /ping            - Health check");
}
