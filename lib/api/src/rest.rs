use crate::error::ApiError;
use actix_cors::Cors;
use actix_files::Files;
use actix_web::{web, App, HttpResponse, HttpServer};
use countrysim_core::NewCountry;
use countrysim_gateway::{
    RetryConfig, SearchRequest, SearchTarget, SimilaritySearchService, DEFAULT_SEARCH_LIMIT,
    MAX_SEARCH_LIMIT,
};
use countrysim_storage::{CountryStore, ListQuery, SortKey, SortOrder};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Largest accepted JSON request body
pub const MAX_JSON_PAYLOAD: usize = 10 * 1024 * 1024;

type ApiResult = Result<HttpResponse, ApiError>;

/// Shared state handed to every handler
pub struct AppState {
    pub store: Arc<CountryStore>,
    pub search: Arc<SimilaritySearchService>,
    /// Retry policy for admin-triggered embedding work
    pub refresh_retry: RetryConfig,
}

impl AppState {
    pub fn new(search: Arc<SimilaritySearchService>) -> Self {
        Self {
            store: Arc::clone(search.store()),
            search,
            refresh_retry: RetryConfig::for_transient_errors(),
        }
    }

    #[must_use]
    pub fn with_refresh_retry(mut self, retry: RetryConfig) -> Self {
        self.refresh_retry = retry;
        self
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(
        state: Arc<AppState>,
        host: &str,
        port: u16,
        static_dir: Option<PathBuf>,
    ) -> std::io::Result<()> {
        info!("REST API listening on http://{}:{}", host, port);
        if let Some(dir) = &static_dir {
            info!("serving static files from {}", dir.display());
        }

        let data = web::Data::from(state);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            let mut app = App::new().wrap(cors).configure(Self::configure(data.clone()));
            if let Some(dir) = &static_dir {
                app = app.service(Files::new("/", dir).index_file("index.html"));
            }
            app
        })
        .bind((host, port))?
        .run()
        .await
    }

    /// Register state, extractor limits and every route on `cfg`
    pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(state)
                .app_data(json_config())
                .app_data(query_config())
                .route("/health", web::get().to(health))
                .service(
                    web::scope("/api/countries")
                        .route("", web::get().to(list_countries))
                        .route("", web::post().to(create_country))
                        .route("/dropdown", web::get().to(dropdown))
                        .route("/stats", web::get().to(country_stats))
                        .route("/{code}", web::get().to(get_country))
                        .route("/{code}", web::put().to(update_country))
                        .route("/{code}", web::delete().to(delete_country)),
                )
                .route("/api/similarity/search", web::post().to(similarity_search))
                .service(
                    web::scope("/api/admin")
                        .route("/import", web::post().to(import_countries))
                        .route("/refresh-embeddings", web::post().to(refresh_embeddings))
                        .route("/vector-index", web::get().to(vector_index))
                        .route("/stats", web::get().to(admin_stats)),
                );
        }
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_PAYLOAD)
        .error_handler(|err, _req| ApiError::validation("body", err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::validation("query", err.to_string()).into())
}

fn ok<T: serde::Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data
    }))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "countries": state.store.len(),
        "uptimeSeconds": state.store.uptime().as_secs(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    region: Option<String>,
    #[serde(alias = "sortBy")]
    sort: Option<String>,
    order: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let mut query = ListQuery::default();
        query.region = self.region.filter(|r| !r.trim().is_empty());
        if let Some(sort) = self.sort {
            query.sort_by = sort.parse::<SortKey>()?;
        }
        if let Some(order) = self.order {
            query.order = order.parse::<SortOrder>()?;
        }
        if let Some(page) = self.page {
            query.page = page;
        }
        if let Some(limit) = self.limit {
            query.limit = limit;
        }
        Ok(query)
    }
}

async fn list_countries(state: web::Data<AppState>, params: web::Query<ListParams>) -> ApiResult {
    let query = params.into_inner().into_query()?;
    Ok(ok(state.store.list(&query)))
}

async fn dropdown(state: web::Data<AppState>) -> ApiResult {
    Ok(ok(state.store.dropdown()))
}

async fn country_stats(state: web::Data<AppState>) -> ApiResult {
    Ok(ok(state.store.stats()))
}

async fn get_country(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let key = path.into_inner();
    let country = state
        .store
        .get_by_key(&key)
        .or_else(|| state.store.get_by_name(&key))
        .ok_or_else(|| ApiError::not_found(format!("country '{}'", key)))?;
    Ok(ok(country.view()))
}

/// Best-effort: a missing embedding only disables vector search for this
/// country until the next refresh.
async fn embed_quietly(state: &AppState, country: &countrysim_core::Country) -> bool {
    match state.search.embed_country(country, &RetryConfig::no_retry()).await {
        Ok(()) => true,
        Err(e) => {
            warn!(country = %country.name, "embedding not generated: {}", e);
            false
        }
    }
}

async fn create_country(state: web::Data<AppState>, body: web::Json<NewCountry>) -> ApiResult {
    let country = state.store.create(body.into_inner())?;
    let embedded = embed_quietly(&state, &country).await;
    info!(country = %country.name, embedded, "country created");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": country.view(),
        "embeddingGenerated": embedded,
    })))
}

async fn update_country(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewCountry>,
) -> ApiResult {
    let country = state.store.update(&path.into_inner(), body.into_inner())?;
    let embedded = if country.has_embedding() {
        true
    } else {
        embed_quietly(&state, &country).await
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": country.view(),
        "embeddingGenerated": embedded,
    })))
}

async fn delete_country(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let key = path.into_inner();
    if !state.store.delete(&key)? {
        return Err(ApiError::not_found(format!("country '{}'", key)));
    }
    info!(key = %key, "country deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("country '{}' deleted", key),
    })))
}

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    country: Option<String>,
    description: Option<String>,
    limit: Option<i64>,
    threshold: Option<f64>,
}

impl SearchBody {
    fn into_request(self) -> Result<SearchRequest, ApiError> {
        let country = self.country.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let description = self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());

        let target = match (country, description) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ApiError::validation(
                    "body",
                    "exactly one of 'country' or 'description' is required",
                ))
            }
            (Some(country), None) => {
                check_length("country", &country, 2, 100)?;
                SearchTarget::Country(country)
            }
            (None, Some(description)) => {
                check_length("description", &description, 10, 1000)?;
                SearchTarget::Description(description)
            }
        };

        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ApiError::validation("threshold", "must be between 0 and 1"));
            }
        }

        let limit = self
            .limit
            .map(|l| l.clamp(1, MAX_SEARCH_LIMIT as i64) as usize)
            .unwrap_or(DEFAULT_SEARCH_LIMIT);
        Ok(SearchRequest::new(target, limit).with_threshold(self.threshold))
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::validation(
            field,
            format!("must be between {} and {} characters", min, max),
        ));
    }
    Ok(())
}

async fn similarity_search(state: web::Data<AppState>, body: web::Json<SearchBody>) -> ApiResult {
    let request = body.into_inner().into_request()?;
    let started = Instant::now();
    let outcome = state.search.search(request).await?;
    let elapsed = started.elapsed().as_millis();

    info!(
        query = %outcome.query,
        engine = ?outcome.engine,
        results = outcome.results.len(),
        elapsed_ms = elapsed as u64,
        "similarity search"
    );

    Ok(ok(serde_json::json!({
        "query": outcome.query,
        "results": outcome.results,
        "totalResults": outcome.results.len(),
        "searchTime": format!("{}ms", elapsed),
        "method": outcome.method,
        "engine": outcome.engine,
        "stats": outcome.stats,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportBody {
    countries: Vec<NewCountry>,
    #[serde(default)]
    update_existing: bool,
}

async fn import_countries(state: web::Data<AppState>, body: web::Json<ImportBody>) -> ApiResult {
    let ImportBody {
        countries,
        update_existing,
    } = body.into_inner();
    if countries.is_empty() {
        return Err(ApiError::validation("countries", "must not be empty"));
    }

    let report = state.store.import(countries, update_existing);
    let embeddings = if report.created + report.updated > 0 {
        Some(state.search.refresh_embeddings(true, &state.refresh_retry).await)
    } else {
        None
    };
    Ok(ok(serde_json::json!({
        "import": report,
        "embeddings": embeddings,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    #[serde(default)]
    only_missing: bool,
}

async fn refresh_embeddings(
    state: web::Data<AppState>,
    body: Option<web::Json<RefreshBody>>,
) -> ApiResult {
    let only_missing = body.map(|b| b.only_missing).unwrap_or(false);
    let report = state
        .search
        .refresh_embeddings(only_missing, &state.refresh_retry)
        .await;
    Ok(ok(report))
}

async fn vector_index(state: web::Data<AppState>) -> ApiResult {
    let index = state.search.index();
    Ok(ok(serde_json::json!({
        "provider": index.name(),
        "definition": index.index_definition(),
    })))
}

async fn admin_stats(state: web::Data<AppState>) -> ApiResult {
    let embedder = state.search.embedder();
    Ok(ok(serde_json::json!({
        "embeddings": state.store.embedding_stats(),
        "model": embedder.model_id(),
        "dimension": embedder.dimension(),
        "vectorIndex": state.search.index().name(),
        "scoringStrategy": state.search.ranking().scorer().name(),
        "uptimeSeconds": state.store.uptime().as_secs(),
        "lastSaveTime": state.store.last_save_time(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(country: Option<&str>, description: Option<&str>, limit: Option<i64>) -> SearchBody {
        SearchBody {
            country: country.map(String::from),
            description: description.map(String::from),
            limit,
            threshold: None,
        }
    }

    #[test]
    fn test_search_body_requires_exactly_one_target() {
        assert!(body(None, None, None).into_request().is_err());
        assert!(body(Some("DE"), Some("a rich european country"), None)
            .into_request()
            .is_err());
        assert!(body(Some("   "), None, None).into_request().is_err());
    }

    #[test]
    fn test_search_body_lengths() {
        assert!(body(Some("D"), None, None).into_request().is_err());
        assert!(body(Some("DE"), None, None).into_request().is_ok());
        assert!(body(None, Some("too short"), None).into_request().is_err());
        assert!(body(None, Some("a wealthy nation"), None).into_request().is_ok());
        let long = "x".repeat(1001);
        assert!(body(None, Some(&long), None).into_request().is_err());
    }

    #[test]
    fn test_search_body_limit_clamped() {
        let request = body(Some("DE"), None, None).into_request().unwrap();
        assert_eq!(request.limit, DEFAULT_SEARCH_LIMIT);

        let request = body(Some("DE"), None, Some(0)).into_request().unwrap();
        assert_eq!(request.limit, 1);

        let request = body(Some("DE"), None, Some(-5)).into_request().unwrap();
        assert_eq!(request.limit, 1);

        let request = body(Some("DE"), None, Some(201)).into_request().unwrap();
        assert_eq!(request.limit, MAX_SEARCH_LIMIT);
    }

    #[test]
    fn test_search_body_threshold_bounds() {
        let mut b = body(Some("DE"), None, None);
        b.threshold = Some(1.5);
        assert!(b.into_request().is_err());

        let mut b = body(Some("DE"), None, None);
        b.threshold = Some(0.8);
        assert_eq!(b.into_request().unwrap().threshold, Some(0.8));
    }

    #[test]
    fn test_list_params() {
        let params = ListParams {
            region: Some("europe".into()),
            sort: Some("gdp".into()),
            order: Some("DESC".into()),
            page: Some(2),
            limit: Some(500),
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.sort_by, SortKey::Gdp);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.page, 2);
        assert_eq!(query.effective_limit(), 200);

        let bad = ListParams {
            sort: Some("altitude".into()),
            ..Default::default()
        };
        assert!(bad.into_query().is_err());
    }
}
