use std::sync::Arc;

use cinescout::clients::{OmdbClient, TmdbClient, WikipediaClient, YoutubeClient};
use cinescout::config::ApiConfig;
use cinescout::models::{DataType, Provenance, RawRecord};
use cinescout::storage::{MovieStore, SharedMovieStore, SqliteMovieStore};
use serde_json::json;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_config(omdb: bool, tmdb: bool, youtube: bool) -> ApiConfig {
    ApiConfig {
        omdb_api_key: omdb.then(|| "omdb-key".to_string()),
        tmdb_api_key: tmdb.then(|| "tmdb-key".to_string()),
        youtube_api_key: youtube.then(|| "yt-key".to_string()),
        ..ApiConfig::default()
    }
}

fn seeded_store() -> SharedMovieStore {
    let store = SqliteMovieStore::in_memory().unwrap();
    let mut details = RawRecord::new(
        DataType::FilmDetails,
        "Inception",
        "Film Wiki",
        "https://example.org/wiki/Inception",
    )
    .with_year(Some(2010));
    details.set("director", "Christopher Nolan");
    details.set(
        "content",
        "trailer at https://youtube.com/watch?v=YoHD9XEInc0",
    );
    store.upsert(&details).unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_omdb_live_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("apikey", "omdb-key"))
        .and(query_param("t", "Inception"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "True",
            "Title": "Inception",
            "Year": "2010",
            "Director": "Christopher Nolan",
            "imdbID": "tt1375666",
        })))
        .mount(&server)
        .await;

    let client = OmdbClient::new(&api_config(true, false, false), None)
        .unwrap()
        .with_base_url(&server.uri());
    let result = client.search_movie("Inception", None).await.unwrap();
    assert_eq!(result.source, Provenance::Api("OMDb"));
    assert_eq!(result.year, Some(2010));
    assert_eq!(result.get_str("imdb_id"), Some("tt1375666"));
}

#[tokio::test]
async fn test_omdb_disabled_falls_back_without_network_calls() {
    let server = MockServer::start().await;
    // a disabled client must issue zero requests
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OmdbClient::new(&api_config(false, false, false), Some(seeded_store()))
        .unwrap()
        .with_base_url(&server.uri());
    let result = client.search_movie("inception", Some(2010)).await.unwrap();
    assert_eq!(result.source, Provenance::Scraped("Film Wiki".into()));
    assert_eq!(result.title, "Inception");
    assert_eq!(result.get_str("director"), Some("Christopher Nolan"));
    server.verify().await;
}

#[tokio::test]
async fn test_omdb_api_failure_falls_back_to_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OmdbClient::new(&api_config(true, false, false), Some(seeded_store()))
        .unwrap()
        .with_base_url(&server.uri());
    let result = client.search_movie("Inception", None).await.unwrap();
    assert!(!result.is_from_api());
}

#[tokio::test]
async fn test_tmdb_live_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "Inception"))
        .and(query_param("api_key", "tmdb-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 27205, "title": "Inception", "release_date": "2010-07-16"}
            ]
        })))
        .mount(&server)
        .await;

    let client = TmdbClient::new(&api_config(false, true, false), None)
        .unwrap()
        .with_base_url(&server.uri());
    let results = client.search_movies("Inception", None).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, Provenance::Api("TMDb"));
    assert_eq!(results[0].year, Some(2010));
}

#[tokio::test]
async fn test_tmdb_disabled_search_uses_substring_fallback() {
    let client = TmdbClient::new(&api_config(false, false, false), Some(seeded_store())).unwrap();
    let results = client.search_movies("incep", None).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Inception");
    assert!(!results[0].is_from_api());
}

#[tokio::test]
async fn test_youtube_trailer_prefers_official() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": {"videoId": "aaaaaaaaaaa"},
                    "snippet": {"title": "Inception fan edit"}
                },
                {
                    "id": {"videoId": "bbbbbbbbbbb"},
                    "snippet": {"title": "Inception (2010) Official Trailer"}
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = YoutubeClient::new(&api_config(false, false, true), None)
        .unwrap()
        .with_base_url(&server.uri());
    let result = client.search_movie_trailer("Inception", Some(2010)).await.unwrap();
    assert_eq!(result.get_str("video_id"), Some("bbbbbbbbbbb"));
    assert_eq!(result.source, Provenance::Api("YouTube"));
}

#[tokio::test]
async fn test_youtube_disabled_recovers_link_from_store() {
    let client =
        YoutubeClient::new(&api_config(false, false, false), Some(seeded_store())).unwrap();
    let result = client.search_movie_trailer("Inception", None).await.unwrap();
    assert_eq!(result.source, Provenance::Scraped("Film Wiki".into()));
    assert_eq!(result.get_str("video_id"), Some("YoHD9XEInc0"));
    assert_eq!(
        result.get_str("url"),
        Some("https://youtube.com/watch?v=YoHD9XEInc0")
    );
}

#[tokio::test]
async fn test_wikipedia_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("list", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {
                "search": [
                    {
                        "title": "Inception",
                        "pageid": 24053,
                        "snippet": "a <span>2010</span> science fiction film"
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = WikipediaClient::new(&ApiConfig::default())
        .unwrap()
        .with_base_url(&server.uri());
    let results = client.search_movies("Inception", 10).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get_str("snippet"), Some("a 2010 science fiction film"));
    assert_eq!(
        results[0].get_str("url"),
        Some("https://en.wikipedia.org/wiki/Inception")
    );
}

#[tokio::test]
async fn test_wikipedia_infobox_outlives_short_api_timeout() {
    let server = MockServer::start().await;
    let wikitext = "{{Infobox film\n| director = [[Denis Villeneuve]]\n| released = {{Film date|2021|10|22}}\n}}";
    Mock::given(method("GET"))
        .and(query_param("prop", "revisions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(2))
                .set_body_json(json!({
                    "query": {
                        "pages": {
                            "1234": {
                                "revisions": [
                                    {"slots": {"main": {"*": wikitext}}}
                                ]
                            }
                        }
                    }
                })),
        )
        .mount(&server)
        .await;

    // the client-wide timeout is shorter than the mocked delay; the
    // revisions request carries its own longer one
    let config = ApiConfig {
        api_timeout_secs: 1,
        ..ApiConfig::default()
    };
    let client = WikipediaClient::new(&config)
        .unwrap()
        .with_base_url(&server.uri());
    let result = client.movie_infobox("Dune").await.unwrap();
    assert_eq!(result.get_str("director"), Some("Denis Villeneuve"));
    assert_eq!(result.year, Some(2021));
}

#[tokio::test]
async fn test_wikipedia_category_members_filters_namespaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("list", "categorymembers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {
                "categorymembers": [
                    {"ns": 0, "title": "Inception"},
                    {"ns": 14, "title": "Category:2010 films by country"},
                    {"ns": 0, "title": "The Social Network"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = WikipediaClient::new(&ApiConfig::default())
        .unwrap()
        .with_base_url(&server.uri());
    let titles = client.films_by_year(2010).await;
    assert_eq!(titles, vec!["Inception", "The Social Network"]);
}
