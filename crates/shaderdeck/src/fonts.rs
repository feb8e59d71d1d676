use std::time::Duration;

use anyhow::{Context, Result};
use editor::{EditorSession, FontLoadOutcome, FontResourceError};
use reqwest::blocking::Client;

/// Fetches font stylesheets (e.g. Google Fonts CSS) and reports the family
/// they declare.
pub struct FontLoader {
    http: Client,
}

impl FontLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shaderdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to construct font HTTP client")?;
        Ok(Self { http })
    }

    pub fn load(&self, url: &str) -> FontLoadOutcome {
        match self.fetch_family(url) {
            Ok(family) => FontLoadOutcome::Loaded { family },
            Err(err) => FontLoadOutcome::Failed {
                reason: format!("{err:#}"),
            },
        }
    }

    fn fetch_family(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;
        let css = response.text().context("failed to read stylesheet body")?;
        extract_font_family(&css)
            .with_context(|| format!("{url} does not declare a font-family"))
    }
}

/// First `font-family` value declared in a stylesheet, unquoted.
pub fn extract_font_family(css: &str) -> Option<String> {
    let lower = css.to_ascii_lowercase();
    let start = lower.find("font-family")? + "font-family".len();
    let rest = css[start..].trim_start().strip_prefix(':')?;
    let end = rest.find([';', '}']).unwrap_or(rest.len());
    let family = rest[..end]
        .split(',')
        .next()?
        .trim()
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim();
    (!family.is_empty()).then(|| family.to_string())
}

/// Runs every layer's font resource through `load` and applies each result
/// once. Failures keep the layer's previous family and are returned.
pub fn resolve_layer_fonts<F>(session: &mut EditorSession, mut load: F) -> Vec<FontResourceError>
where
    F: FnMut(&str) -> FontLoadOutcome,
{
    let pending: Vec<(String, String)> = session
        .layers()
        .layers()
        .iter()
        .filter_map(|layer| {
            layer
                .font_resource_url
                .as_ref()
                .map(|url| (layer.id.clone(), url.clone()))
        })
        .collect();

    let mut failures = Vec::new();
    for (layer_id, url) in pending {
        let Some(ticket) = session.layers_mut().begin_font_load(&layer_id, &url) else {
            continue;
        };
        let outcome = load(&url);
        match session.layers_mut().complete_font_load(ticket, outcome) {
            Ok(()) => tracing::info!(layer = %layer_id, %url, "font resource loaded"),
            Err(err) => {
                tracing::warn!(layer = %layer_id, error = %err, "font resource failed");
                failures.push(err);
            }
        }
    }
    failures
}
