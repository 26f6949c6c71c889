use actix_multipart::Multipart;
use actix_web::{get, http::header, post, web, HttpResponse, Responder};

use crate::{
    server::{
        form::{self, GenerateForm},
        views, AppState,
    },
    session::GenerationBatch,
};

/// Renders the page with the session's batches below the form.
async fn page(state: &AppState, form: &GenerateForm, notices: &[String]) -> HttpResponse {
    let batches = state.session.batches().await;
    match views::render_page(form, &batches, notices) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(e) => {
            log::error!("❌ Failed to render page: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[get("/")]
pub async fn index(state: web::Data<AppState>) -> impl Responder {
    page(&state, &GenerateForm::default(), &[]).await
}

#[post("/generate")]
pub async fn generate(payload: Multipart, state: web::Data<AppState>) -> impl Responder {
    let fields = match form::read_fields(payload).await {
        Ok(fields) => fields,
        Err(e) => {
            log::warn!("⚠️  Rejected form submission: {}", e);
            return page(&state, &GenerateForm::default(), &[e.to_string()]).await;
        }
    };

    let (form, errors) = GenerateForm::from_fields(fields);
    if !errors.is_empty() {
        let notices: Vec<String> = errors.iter().map(ToString::to_string).collect();
        log::warn!("⚠️  Invalid form values: {}", notices.join("; "));
        return page(&state, &form, &notices).await;
    }

    let notices = match state
        .client
        .generate_and_save(&form.request, form.num_outputs)
        .await
    {
        Ok(entries) => {
            state
                .session
                .record(GenerationBatch::new(form.request.model, entries))
                .await;
            Vec::new()
        }
        Err(e) => {
            log::warn!("⚠️  Generation not started: {}", e);
            vec![e.to_string()]
        }
    };

    page(&state, &form, &notices).await
}

#[post("/clear")]
pub async fn clear(state: web::Data<AppState>) -> impl Responder {
    state.session.clear().await;
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish()
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
