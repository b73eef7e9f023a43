//! HTML page rendering
//!
//! Pure functions from request-scoped result data to the complete page
//! document. No I/O happens here; rendering identical input twice yields
//! byte-identical output.
//!
//! Every user- or upstream-supplied string is HTML-escaped before
//! interpolation (`encode_minimal` for element text, quote-escaping
//! inside attribute values). JSON payloads are pretty-printed and escaped
//! inside `<pre><code>` blocks.

use htmlescape::encode_minimal;
use serde_json::Value;

use crate::upstream::{resolved_ip, MusicData, Song};

/// Escape a string for use inside a double-quoted attribute value
///
/// `encode_minimal` leaves quotes alone; attribute context needs them escaped
/// too. `encode_attribute` is not used because it hex-encodes every
/// non-alphanumeric character, which garbles displayed URLs.
fn encode_attr(s: &str) -> String {
    encode_minimal(s).replace('"', "&quot;")
}

/// Default text when a search matched nothing and the upstream sent no message
const NO_RESULTS_TEXT: &str = "未搜索到相关歌曲。";

/// Everything a single response renders from
///
/// At most one of the two query kinds is populated per request; `error`
/// belongs to whichever query is set.
#[derive(Debug, Default)]
pub struct PageContext {
    /// Submitted IP/domain, echoed into the form input
    pub ip_query: Option<String>,
    /// Full TCPing payload, present only when the probe succeeded
    pub tcping: Option<Value>,
    /// Geolocation text (or inline failure string) for the resolved IP
    pub geo: Option<String>,
    /// Site TDK payload; `None` when the metadata call failed
    pub site_tdk: Option<Value>,
    /// Submitted song name, echoed into the form input
    pub music_query: Option<String>,
    /// Kugou search payload, present only when the search succeeded
    pub music_data: Option<MusicData>,
    /// Hard-error message for the active query
    pub error: Option<String>,
}

/// Render the complete HTML document for a request
pub fn render_page(ctx: &PageContext) -> String {
    let is_result_page = ctx.ip_query.is_some() || ctx.music_query.is_some();
    let loader_style = if is_result_page {
        r#" style="display: flex;""#
    } else {
        ""
    };

    let ip_query_attr = encode_attr(ctx.ip_query.as_deref().unwrap_or(""));
    let music_query_attr = encode_attr(ctx.music_query.as_deref().unwrap_or(""));

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>多功能在线工具</title>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 2rem auto; padding: 0 1rem; background-color: #f8f9fa; }}
    h1, h2 {{ color: #007bff; text-align: center; }}
    h2 {{ border-top: 1px solid #dee2e6; padding-top: 2rem; margin-top: 2rem; }}
    .container {{ background-color: #fff; padding: 2rem; border-radius: 8px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); margin-bottom: 2rem; }}
    .form-container {{ display: flex; gap: 10px; margin-bottom: 1rem; }}
    input[type="text"] {{ flex-grow: 1; padding: 10px; border: 1px solid #ccc; border-radius: 4px; font-size: 16px; }}
    button {{ padding: 10px 20px; border: none; background-color: #007bff; color: white; border-radius: 4px; cursor: pointer; font-size: 16px; transition: background-color 0.3s; }}
    button:hover {{ background-color: #0056b3; }}
    .results h3 {{ border-bottom: 2px solid #007bff; padding-bottom: 10px; margin-top: 1.5rem; text-align: left; }}
    .error {{ color: #dc3545; border: 1px solid #dc3545; padding: 1rem; border-radius: 4px; background-color: #f8d7da; }}
    pre {{ background-color: #e9ecef; padding: 15px; border-radius: 4px; white-space: pre-wrap; word-wrap: break-word; }}
    code {{ font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, Courier, monospace; }}
    footer {{ text-align: center; margin-top: 2rem; color: #6c757d; font-size: 0.9em; }}
    .loader-overlay {{ position: fixed; top: 0; left: 0; width: 100%; height: 100%; background-color: rgba(255, 255, 255, 0.8); z-index: 9999; display: none; justify-content: center; align-items: center; }}
    .loader {{ border: 8px solid #f3f3f3; border-top: 8px solid #007bff; border-radius: 50%; width: 60px; height: 60px; animation: spin 1.5s linear infinite; }}
    @keyframes spin {{ 0% {{ transform: rotate(0deg); }} 100% {{ transform: rotate(360deg); }} }}
    .music-list {{ list-style-type: none; padding-left: 0; }}
    .music-list li {{ background-color: #f8f9fa; padding: 10px 15px; border-radius: 4px; margin-bottom: 8px; display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 10px; }}
    .music-list li .song-info {{ font-size: 0.95em; }}
    .music-list li .download-link {{ font-size: 0.9em; font-weight: bold; text-decoration: none; color: #28a745; }}
  </style>
</head>
<body>
  <div id="loader-overlay" class="loader-overlay"{loader_style}>
    <div class="loader"></div>
  </div>

  <h1>多功能在线工具</h1>

  <div class="container">
    <h2>多功能查询工具</h2>
    <form method="POST" action="/" class="form-container" id="ip-form">
      <input type="text" name="ip_query" value="{ip_query_attr}" placeholder="请输入 IP 或域名" required>
      <button type="submit">查询</button>
    </form>
    <div class="results">
{ip_sections}    </div>
  </div>

  <div class="container">
    <h2>音乐搜索工具</h2>
    <form method="POST" action="/" class="form-container" id="music-form">
      <input type="text" name="music_query" value="{music_query_attr}" placeholder="请输入歌曲名称" required>
      <button type="submit">搜索</button>
    </form>
    <div class="results">
{music_sections}    </div>
  </div>

  <footer><p>由 omnitool 强力驱动</p></footer>

  <script>
    const loader = document.getElementById('loader-overlay');
    document.querySelectorAll('form').forEach(form => {{
      form.addEventListener('submit', function() {{
        if (form.checkValidity() && loader) {{
          loader.style.display = 'flex';
        }}
      }});
    }});
    if ({is_result_page}) {{
      document.getElementById('loader-overlay').style.display = 'none';
    }}
  </script>
</body>
</html>
"#,
        loader_style = loader_style,
        ip_query_attr = ip_query_attr,
        ip_sections = ip_sections(ctx),
        music_query_attr = music_query_attr,
        music_sections = music_sections(ctx),
        is_result_page = is_result_page,
    )
}

/// Result sections for the IP/domain half of the page
fn ip_sections(ctx: &PageContext) -> String {
    let mut out = String::new();

    // The hard-error block belongs to whichever query was active
    if ctx.ip_query.is_some() {
        if let Some(error) = &ctx.error {
            out.push_str(&error_block(error));
        }
    }

    if let Some(tcping) = &ctx.tcping {
        out.push_str(&json_block("TCPing 结果", tcping));

        // Geolocation section is keyed by the resolved IP; hidden entirely
        // when the upstream sent an empty body
        if let Some(geo) = ctx.geo.as_deref().filter(|g| !g.is_empty()) {
            let display_ip = resolved_ip(tcping).unwrap_or("N/A");
            out.push_str(&format!(
                "      <h3>IP 地理位置信息 (查询IP: {})</h3><pre><code>{}</code></pre>\n",
                encode_minimal(display_ip),
                encode_minimal(geo)
            ));
        }

        if let Some(site_tdk) = &ctx.site_tdk {
            out.push_str(&json_block("网站信息 (TDK)", site_tdk));
        }
    }

    out
}

/// Result sections for the music half of the page
fn music_sections(ctx: &PageContext) -> String {
    let mut out = String::new();

    if ctx.music_query.is_some() {
        if let Some(error) = &ctx.error {
            out.push_str(&error_block(error));
        }
    }

    let Some(music) = &ctx.music_data else {
        return out;
    };

    match &music.musicarr {
        Some(songs) => {
            out.push_str(&format!(
                "      <h3>搜索结果: {}</h3>\n      <ul class=\"music-list\">\n",
                encode_minimal(music.msg.as_deref().unwrap_or(""))
            ));
            for song in songs {
                out.push_str(&music_list_item(song));
            }
            out.push_str("      </ul>\n");
        }
        None => {
            let message = music
                .msg
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(NO_RESULTS_TEXT);
            out.push_str(&format!("      <p>{}</p>\n", encode_minimal(message)));
        }
    }

    out
}

/// One `<li>` of the music result list
///
/// A download link is emitted only for an `http`/`https`-schemed URL
/// (case-insensitive prefix check); anything else gets the invalid-link
/// placeholder.
fn music_list_item(song: &Song) -> String {
    let name = song
        .songname
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("未知歌名");
    let singer = song
        .singer
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("未知歌手");

    let link = match song.mp3.as_deref() {
        Some(url) if url.to_lowercase().starts_with("http") => {
            let download_name = song
                .songname
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("song");
            format!(
                "<a href=\"{}\" class=\"download-link\" download=\"{}.mp3\" target=\"_blank\" rel=\"noopener noreferrer\">下载</a>",
                encode_attr(url),
                encode_attr(download_name)
            )
        }
        _ => "<span>链接无效</span>".to_string(),
    };

    format!(
        "        <li><span class=\"song-info\">{} - <strong>{}</strong></span>{}</li>\n",
        encode_minimal(name),
        encode_minimal(singer),
        link
    )
}

fn error_block(error: &str) -> String {
    format!(
        "      <div class=\"error\"><strong>查询出错：</strong><br>{}</div>\n",
        encode_minimal(error)
    )
}

/// `<h3>` heading plus a pretty-printed, escaped JSON payload
fn json_block(title: &str, value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!(
        "      <h3>{}</h3><pre><code>{}</code></pre>\n",
        title,
        encode_minimal(&pretty)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ip_ctx(tcping: Value) -> PageContext {
        PageContext {
            ip_query: Some("example.com".to_string()),
            tcping: Some(tcping),
            ..Default::default()
        }
    }

    #[test]
    fn default_page_has_forms_and_no_results() {
        let html = render_page(&PageContext::default());
        assert!(html.contains("name=\"ip_query\""));
        assert!(html.contains("name=\"music_query\""));
        assert!(!html.contains("TCPing 结果"));
        assert!(!html.contains("class=\"error\""));
        // Loader overlay stays hidden on the plain form page
        assert!(!html.contains("display: flex;\""));
        assert!(html.contains("if (false)"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut ctx = ip_ctx(json!({"data": {"ip": "1.2.3.4", "avg": 10}}));
        ctx.geo = Some("中国 北京".to_string());
        ctx.site_tdk = Some(json!({"title": "Example"}));
        assert_eq!(render_page(&ctx), render_page(&ctx));
    }

    #[test]
    fn ip_results_render_all_three_sections() {
        let mut ctx = ip_ctx(json!({"data": {"ip": "1.2.3.4"}}));
        ctx.geo = Some("中国 北京 电信".to_string());
        ctx.site_tdk = Some(json!({"title": "Example Domain"}));

        let html = render_page(&ctx);
        assert!(html.contains("TCPing 结果"));
        assert!(html.contains("IP 地理位置信息 (查询IP: 1.2.3.4)"));
        assert!(html.contains("中国 北京 电信"));
        assert!(html.contains("网站信息 (TDK)"));
        assert!(html.contains("Example Domain"));
    }

    #[test]
    fn missing_site_metadata_omits_section_only() {
        let ctx = ip_ctx(json!({"data": {"ip": "1.2.3.4"}}));
        let html = render_page(&ctx);
        assert!(html.contains("TCPing 结果"));
        assert!(!html.contains("网站信息"));
        assert!(!html.contains("class=\"error\""));
    }

    #[test]
    fn geo_section_hidden_without_geo_text() {
        let mut ctx = ip_ctx(json!({"data": {}}));
        let html = render_page(&ctx);
        assert!(!html.contains("IP 地理位置信息"));

        // An empty geolocation body also hides the section
        ctx.geo = Some(String::new());
        let html = render_page(&ctx);
        assert!(!html.contains("IP 地理位置信息"));
    }

    #[test]
    fn geo_display_falls_back_when_ip_missing() {
        let mut ctx = ip_ctx(json!({"code": 200}));
        ctx.geo = Some("somewhere".to_string());
        let html = render_page(&ctx);
        assert!(html.contains("(查询IP: N/A)"));
    }

    #[test]
    fn hard_error_renders_in_ip_section() {
        let ctx = PageContext {
            ip_query: Some("example.com".to_string()),
            error: Some("TCPing API error: 502 Bad Gateway".to_string()),
            ..Default::default()
        };
        let html = render_page(&ctx);
        assert!(html.contains("查询出错："));
        assert!(html.contains("TCPing API error: 502 Bad Gateway"));
        // The error belongs to the IP query, not the music section
        let music_half = html.split("音乐搜索工具").nth(1).expect("music section");
        assert!(!music_half.contains("class=\"error\""));
    }

    #[test]
    fn music_entry_with_http_link_gets_download_anchor() {
        let ctx = PageContext {
            music_query: Some("test".to_string()),
            music_data: Some(MusicData {
                msg: Some("搜索成功".to_string()),
                musicarr: Some(vec![Song {
                    songname: Some("A".to_string()),
                    singer: Some("B".to_string()),
                    mp3: Some("http://x/y.mp3".to_string()),
                }]),
            }),
            ..Default::default()
        };
        let html = render_page(&ctx);
        assert!(html.contains("href=\"http://x/y.mp3\""));
        assert!(html.contains("A - <strong>B</strong>"));
        assert!(html.contains("搜索结果: 搜索成功"));
        assert!(!html.contains("链接无效"));
    }

    #[test]
    fn music_entry_with_bad_link_gets_placeholder() {
        for mp3 in [Some("ftp://x".to_string()), Some(String::new()), None] {
            let ctx = PageContext {
                music_query: Some("test".to_string()),
                music_data: Some(MusicData {
                    msg: None,
                    musicarr: Some(vec![Song {
                        songname: Some("A".to_string()),
                        singer: None,
                        mp3,
                    }]),
                }),
                ..Default::default()
            };
            let html = render_page(&ctx);
            assert!(html.contains("链接无效"));
            assert!(!html.contains("<a href"));
            assert!(html.contains("未知歌手"));
        }
    }

    #[test]
    fn uppercase_scheme_still_counts_as_valid_link() {
        let ctx = PageContext {
            music_query: Some("test".to_string()),
            music_data: Some(MusicData {
                msg: None,
                musicarr: Some(vec![Song {
                    songname: None,
                    singer: None,
                    mp3: Some("HTTPS://x/y.mp3".to_string()),
                }]),
            }),
            ..Default::default()
        };
        let html = render_page(&ctx);
        assert!(html.contains("href=\"HTTPS://x/y.mp3\""));
        // Missing song name falls back for display and the download attribute
        assert!(html.contains("未知歌名"));
        assert!(html.contains("download=\"song.mp3\""));
    }

    #[test]
    fn message_only_music_payload_shows_message() {
        let ctx = PageContext {
            music_query: Some("test".to_string()),
            music_data: Some(MusicData {
                msg: Some("none".to_string()),
                musicarr: None,
            }),
            ..Default::default()
        };
        let html = render_page(&ctx);
        assert!(html.contains("<p>none</p>"));
        assert!(!html.contains("music-list\">"));

        // Without a message the default no-results text appears
        let ctx = PageContext {
            music_query: Some("test".to_string()),
            music_data: Some(MusicData::default()),
            ..Default::default()
        };
        assert!(render_page(&ctx).contains(NO_RESULTS_TEXT));
    }

    #[test]
    fn user_and_upstream_strings_are_escaped() {
        let mut ctx = ip_ctx(json!({"data": {"ip": "<script>alert(1)</script>"}}));
        ctx.ip_query = Some("<script>alert(1)</script>".to_string());
        ctx.geo = Some("<img src=x onerror=alert(1)>".to_string());

        let html = render_page(&ctx);
        assert!(!html.contains("<script>alert(1)"));
        assert!(!html.contains("<img src=x"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn result_page_shows_loader_state() {
        let ctx = ip_ctx(json!({}));
        let html = render_page(&ctx);
        assert!(html.contains("style=\"display: flex;\""));
        assert!(html.contains("if (true)"));
    }
}
