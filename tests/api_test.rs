// REST API tests
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use countrysim_api::{AppState, RestApi};
use countrysim_gateway::{HashEmbedder, InMemoryVectorIndex, RetryConfig, SimilaritySearchService};
use countrysim_storage::{sample_countries, CountryStore};
use serde_json::{json, Value};
use std::sync::Arc;

async fn state(with_embeddings: bool) -> web::Data<AppState> {
    let store = Arc::new(CountryStore::in_memory());
    store.seed(sample_countries()).unwrap();
    let index = Arc::new(InMemoryVectorIndex::new(Arc::clone(&store)));
    let service = SimilaritySearchService::new(store, Arc::new(HashEmbedder::default()), index);
    if with_embeddings {
        service.refresh_embeddings(false, &RetryConfig::no_retry()).await;
    }
    web::Data::new(AppState::new(Arc::new(service)).with_refresh_retry(RetryConfig::no_retry()))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().configure(RestApi::configure($state.clone()))).await
    };
}

#[actix_web::test]
async fn test_health() {
    let state = state(false).await;
    let app = app!(state);

    let resp: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp["status"], "ok");
    assert_eq!(resp["countries"], 30);
}

#[actix_web::test]
async fn test_list_countries_paginated() {
    let state = state(false).await;
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/countries?region=asia&sort=gdp&order=desc&limit=2")
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], true);

    let countries = resp["data"]["countries"].as_array().unwrap();
    assert_eq!(countries.len(), 2);
    assert_eq!(countries[0]["name"], "Singapore");
    assert!(countries[0].get("embedding").is_none());
    assert_eq!(resp["data"]["pagination"]["currentPage"], 1);
    assert_eq!(resp["data"]["pagination"]["hasNext"], true);
}

#[actix_web::test]
async fn test_list_rejects_unknown_sort() {
    let state = state(false).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/api/countries?sort=altitude").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[actix_web::test]
async fn test_dropdown_and_stats() {
    let state = state(false).await;
    let app = app!(state);

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/countries/dropdown").to_request(),
    )
    .await;
    let items = resp["data"].as_array().unwrap();
    assert_eq!(items.len(), 30);
    assert_eq!(items[0]["name"], "Argentina");

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/countries/stats").to_request(),
    )
    .await;
    assert_eq!(resp["data"]["global"]["totalCountries"], 30);
    assert_eq!(resp["data"]["topCountries"]["gdp"][0]["name"], "Switzerland");
}

#[actix_web::test]
async fn test_get_country_by_code_or_name() {
    let state = state(false).await;
    let app = app!(state);

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/countries/jp").to_request(),
    )
    .await;
    assert_eq!(resp["data"]["name"], "Japan");

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/countries/Germany").to_request(),
    )
    .await;
    assert_eq!(resp["data"]["isoCode"], "DE");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/countries/XX").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_update_delete() {
    let state = state(false).await;
    let app = app!(state);

    let iceland = json!({
        "name": "Iceland",
        "isoCode": "is",
        "flag": "🇮🇸",
        "region": "Europe",
        "capital": "Reykjavik",
        "indicators": {
            "gdp": 68384.0, "lifeExpectancy": 83.1, "education": 92.0,
            "co2Emissions": 9.5, "population": 0.37
        }
    });

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/countries").set_json(&iceland).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["isoCode"], "IS");
    assert_eq!(body["embeddingGenerated"], true);
    assert!(state.store.get_by_key("IS").unwrap().has_embedding());

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/countries").set_json(&iceland).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let mut changed = iceland.clone();
    changed["indicators"]["gdp"] = json!(70000.0);
    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::put().uri("/api/countries/IS").set_json(&changed).to_request(),
    )
    .await;
    assert_eq!(resp["data"]["indicators"]["gdp"], 70000.0);
    assert_eq!(resp["embeddingGenerated"], true);

    let resp = test::call_service(&app, test::TestRequest::delete().uri("/api/countries/IS").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, test::TestRequest::delete().uri("/api/countries/IS").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_rejects_invalid_indicators() {
    let state = state(false).await;
    let app = app!(state);

    let body = json!({
        "name": "Nowhere",
        "isoCode": "NW",
        "region": "Europe",
        "capital": "Nowhere City",
        "indicators": {
            "gdp": 1000.0, "lifeExpectancy": 150.0, "education": 50.0,
            "co2Emissions": 1.0, "population": 1.0
        }
    });
    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/countries").set_json(&body).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
}

#[actix_web::test]
async fn test_similarity_search_without_embeddings_uses_scorer() {
    let state = state(false).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/similarity/search")
        .set_json(json!({ "country": "Germany", "limit": 5 }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    let data = &resp["data"];
    assert_eq!(data["method"], "country_reference");
    assert_eq!(data["engine"], "fallback_scorer");
    assert_eq!(data["totalResults"], 5);
    assert!(data["searchTime"].as_str().unwrap().ends_with("ms"));

    let results = data["results"].as_array().unwrap();
    assert!(results.iter().all(|r| r["country"]["name"] != "Germany"));
    assert!(results.iter().all(|r| r["reasons"].as_array().unwrap().len() <= 4));
}

#[actix_web::test]
async fn test_similarity_search_by_description() {
    let state = state(true).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/similarity/search")
        .set_json(json!({ "description": "small wealthy nordic country", "limit": 500 }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["data"]["method"], "text_description");
    assert_eq!(resp["data"]["engine"], "vector_search");
    assert_eq!(resp["data"]["totalResults"], 30);
}

#[actix_web::test]
async fn test_similarity_search_validation() {
    let state = state(false).await;
    let app = app!(state);

    for body in [
        json!({}),
        json!({ "country": "DE", "description": "a country with many people" }),
        json!({ "country": "D" }),
        json!({ "description": "short" }),
        json!({ "country": "DE", "threshold": 2.0 }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/similarity/search")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    let req = test::TestRequest::post()
        .uri("/api/similarity/search")
        .set_json(json!({ "country": "Atlantis" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let state = state(false).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/similarity/search")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_admin_import_and_refresh() {
    let state = state(false).await;
    let app = app!(state);

    let body = json!({
        "updateExisting": true,
        "countries": [
            {
                "name": "Portugal", "isoCode": "PT", "region": "Europe", "capital": "Lisbon",
                "indicators": { "gdp": 24262.0, "lifeExpectancy": 81.1, "education": 84.0,
                                "co2Emissions": 4.1, "population": 10.3 }
            },
            {
                "name": "Germany", "isoCode": "DE", "region": "Europe", "capital": "Berlin",
                "indicators": { "gdp": 48000.0, "lifeExpectancy": 81.3, "education": 92.0,
                                "co2Emissions": 9.4, "population": 83.0 }
            },
            {
                "name": "Broken", "isoCode": "BK", "region": "Europe", "capital": "Nowhere",
                "indicators": { "gdp": -5.0, "lifeExpectancy": 81.3, "education": 92.0,
                                "co2Emissions": 9.4, "population": 83.0 }
            }
        ]
    });
    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post().uri("/api/admin/import").set_json(&body).to_request(),
    )
    .await;
    let report = &resp["data"]["import"];
    assert_eq!(report["processed"], 3);
    assert_eq!(report["created"], 1);
    assert_eq!(report["updated"], 1);
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    assert_eq!(resp["data"]["embeddings"]["updated"], 31);

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/admin/refresh-embeddings")
            .set_json(json!({ "onlyMissing": true }))
            .to_request(),
    )
    .await;
    assert_eq!(resp["data"]["skipped"], 31);
    assert_eq!(resp["data"]["updated"], 0);

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/admin/stats").to_request(),
    )
    .await;
    assert_eq!(resp["data"]["embeddings"]["withEmbeddings"], 31);
    assert_eq!(resp["data"]["dimension"], 768);
    assert_eq!(resp["data"]["vectorIndex"], "in_memory");
    assert_eq!(resp["data"]["scoringStrategy"], "ratio");
}

#[actix_web::test]
async fn test_admin_vector_index_definition() {
    let state = state(false).await;
    let app = app!(state);

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/admin/vector-index").to_request(),
    )
    .await;
    assert_eq!(resp["data"]["provider"], "in_memory");
    let field = &resp["data"]["definition"]["definition"]["fields"][0];
    assert_eq!(field["numDimensions"], 768);
    assert_eq!(field["similarity"], "cosine");
}
