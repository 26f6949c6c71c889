pub mod form;
pub mod handlers;
pub mod views;

use actix_web::{web, App, HttpServer};

use crate::{config::Config, session::GenerationSession, stability::StabilityClient};

/// Uploads are read into memory whole; this bounds one form submission.
pub const MAX_FORM_BYTES: usize = 20 * 1024 * 1024;

pub struct AppState {
    pub client: StabilityClient,
    pub session: GenerationSession,
}

impl AppState {
    pub fn new(client: StabilityClient) -> Self {
        Self {
            client,
            session: GenerationSession::new(),
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::index)
        .service(handlers::generate)
        .service(handlers::clear)
        .service(handlers::health);
}

pub async fn run(config: Config, client: StabilityClient) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(client));
    let output_dir = config.storage.output_dir.clone();
    std::fs::create_dir_all(&output_dir)?;

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes)
            .service(actix_files::Files::new(views::OUTPUTS_ROUTE, &output_dir))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
