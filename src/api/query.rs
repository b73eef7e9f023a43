//! Request classification and the two query handlers
//!
//! An inbound request on `/` is classified into at most one query kind:
//! - POST form field `ip_query` → IP/domain query (wins if both fields sent)
//! - POST form field `music_query` → music search
//! - GET `?music=<name>` (non-empty) → music search
//! - GET with a bare query string (no `=`) → percent-decoded IP/domain query
//! - anything else → the default form page
//!
//! Both handlers always produce a full HTML page: results on success, the
//! error-block variant with HTTP 500 on a hard upstream failure.

use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tracing::{info, warn};

use crate::render::{render_page, PageContext};
use crate::upstream::resolved_ip;
use crate::AppState;

/// A classified user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserQuery {
    /// IP address or domain name lookup
    Ip(String),
    /// Music search by song name
    Music(String),
}

/// POST form body; both fields optional, `ip_query` takes priority
#[derive(Debug, Default, Deserialize)]
pub struct ToolForm {
    ip_query: Option<String>,
    music_query: Option<String>,
}

/// Recognized GET query parameters
#[derive(Debug, Deserialize)]
pub struct GetParams {
    music: Option<String>,
}

/// Classify a GET request from its parsed `music` parameter and raw query
///
/// The bare-string branch mirrors form-free browser usage (`GET /?8.8.8.8`):
/// a query string without any `=` is percent-decoded and treated as the
/// lookup target. Malformed percent-encoding decodes lossily rather than
/// failing the request.
fn classify_get(music: Option<&str>, raw_query: Option<&str>) -> Option<UserQuery> {
    if let Some(name) = music.filter(|m| !m.is_empty()) {
        return Some(UserQuery::Music(name.to_string()));
    }

    let raw = raw_query?;
    if raw.is_empty() || raw.contains('=') {
        return None;
    }

    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    if decoded.is_empty() {
        None
    } else {
        Some(UserQuery::Ip(decoded.into_owned()))
    }
}

/// Classify a POST form; field presence decides, `ip_query` first
fn classify_post(form: ToolForm) -> Option<UserQuery> {
    if let Some(target) = form.ip_query {
        return Some(UserQuery::Ip(target));
    }
    form.music_query.map(UserQuery::Music)
}

/// GET /
pub async fn handle_get(
    State(state): State<AppState>,
    Query(params): Query<GetParams>,
    RawQuery(raw): RawQuery,
) -> Response {
    match classify_get(params.music.as_deref(), raw.as_deref()) {
        Some(UserQuery::Ip(target)) => ip_query(&state, target).await,
        Some(UserQuery::Music(song)) => music_query(&state, song).await,
        None => Html(render_page(&PageContext::default())).into_response(),
    }
}

/// POST /
pub async fn handle_post(State(state): State<AppState>, Form(form): Form<ToolForm>) -> Response {
    match classify_post(form) {
        Some(UserQuery::Ip(target)) => ip_query(&state, target).await,
        Some(UserQuery::Music(song)) => music_query(&state, song).await,
        None => Html(render_page(&PageContext::default())).into_response(),
    }
}

/// IP/domain query: probe + site metadata in parallel, then geolocation
///
/// The probe is the only call whose failure aborts the request. Site
/// metadata degrades to an omitted section; geolocation (attempted only when
/// the probe resolved an IP) degrades to an inline failure string.
async fn ip_query(state: &AppState, target: String) -> Response {
    info!(target = %target, "Handling IP/domain query");

    let (probe, site_tdk) = tokio::join!(
        state.upstream.probe(&target),
        state.upstream.site_metadata(&target),
    );

    let tcping = match probe {
        Ok(payload) => payload,
        Err(e) => {
            warn!(target = %target, error = %e, "Probe failed, rendering error page");
            let ctx = PageContext {
                ip_query: Some(target),
                error: Some(e.to_string()),
                ..Default::default()
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(render_page(&ctx))).into_response();
        }
    };

    let geo = match resolved_ip(&tcping) {
        Some(ip) => Some(state.upstream.geolocate(ip).await),
        None => None,
    };

    let ctx = PageContext {
        ip_query: Some(target),
        tcping: Some(tcping),
        geo,
        site_tdk,
        ..Default::default()
    };
    Html(render_page(&ctx)).into_response()
}

/// Music query: one search call, hard error on any failure
async fn music_query(state: &AppState, song: String) -> Response {
    info!(song = %song, "Handling music query");

    match state.upstream.search_music(&song).await {
        Ok(music_data) => {
            let ctx = PageContext {
                music_query: Some(song),
                music_data: Some(music_data),
                ..Default::default()
            };
            Html(render_page(&ctx)).into_response()
        }
        Err(e) => {
            warn!(song = %song, error = %e, "Music search failed, rendering error page");
            let ctx = PageContext {
                music_query: Some(song),
                error: Some(e.to_string()),
                ..Default::default()
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Html(render_page(&ctx))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_with_music_param_is_music_query() {
        assert_eq!(
            classify_get(Some("test"), Some("music=test")),
            Some(UserQuery::Music("test".to_string()))
        );
    }

    #[test]
    fn get_with_empty_music_param_is_no_query() {
        // `?music=` contains `=`, so the bare-string branch does not apply
        assert_eq!(classify_get(Some(""), Some("music=")), None);
    }

    #[test]
    fn bare_query_string_is_ip_query() {
        assert_eq!(
            classify_get(None, Some("example.com")),
            Some(UserQuery::Ip("example.com".to_string()))
        );
    }

    #[test]
    fn bare_query_string_is_percent_decoded() {
        assert_eq!(
            classify_get(None, Some("b%C3%BCro.example")),
            Some(UserQuery::Ip("büro.example".to_string()))
        );
        // Malformed encoding decodes lossily instead of failing
        assert!(matches!(
            classify_get(None, Some("a%ZZb")),
            Some(UserQuery::Ip(_))
        ));
    }

    #[test]
    fn key_value_query_string_is_no_query() {
        assert_eq!(classify_get(None, Some("foo=bar")), None);
        assert_eq!(classify_get(None, Some("")), None);
        assert_eq!(classify_get(None, None), None);
    }

    #[test]
    fn post_ip_field_wins_over_music_field() {
        let form = ToolForm {
            ip_query: Some("example.com".to_string()),
            music_query: Some("test".to_string()),
        };
        assert_eq!(
            classify_post(form),
            Some(UserQuery::Ip("example.com".to_string()))
        );
    }

    #[test]
    fn post_music_field_alone_is_music_query() {
        let form = ToolForm {
            ip_query: None,
            music_query: Some("晴天".to_string()),
        };
        assert_eq!(
            classify_post(form),
            Some(UserQuery::Music("晴天".to_string()))
        );
    }

    #[test]
    fn empty_post_form_is_no_query() {
        assert_eq!(classify_post(ToolForm::default()), None);
    }
}
