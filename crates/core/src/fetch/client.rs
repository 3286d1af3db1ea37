use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::backoff::backoff_delay;
use super::decode::decode_body;
use super::errors::{AttemptOutcome, AttemptRecord, FetchError, is_retryable_status, outcome_from_reqwest};
use super::profiles::{DESKTOP, HEADER_PROFILES, HeaderProfile};
use super::{FetchConfig, FetchResult};
use crate::credentials::{CookieStore, CredentialSource};
use crate::rules::{HeaderValueSource, Rule};

/// Phrases marking an archive response as an interstitial rather than a snapshot.
const BOT_CHECK_MARKERS: &[&str] = &["captcha", "security check", "one more step"];
const BOT_CHECK_SNIFF_CHARS: usize = 3000;

/// Why one attempt did not return a page.
enum AttemptError {
    /// Try the next profile.
    Retry(AttemptOutcome),
    /// Give up now.
    Fatal(FetchError),
}

/// Shared HTTP fetcher. Cloning is cheap; the client, cookie store, and
/// credential source are reference-counted.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    credentials: Arc<dyn CredentialSource>,
    cookies: Arc<CookieStore>,
}

impl Fetcher {
    pub fn new(
        config: FetchConfig, credentials: Arc<dyn CredentialSource>, cookies: Arc<CookieStore>,
    ) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout))
            .connect_timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, config, credentials, cookies })
    }

    /// Retrieves `url` using `rule`'s headers, cookies, and paywall policy.
    #[instrument(skip_all, fields(url = %url, rule = %rule.name))]
    pub async fn fetch(&self, url: &str, rule: &Rule) -> Result<FetchResult, FetchError> {
        let target = parse_http_url(url)?;
        let mut attempts = Vec::new();
        let mut paywall_marker = None;

        for (index, profile) in HEADER_PROFILES.iter().enumerate() {
            if index > 0 {
                let delay = backoff_delay(index as u32 - 1, self.config.backoff_base);
                debug!(profile = profile.name, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
            }

            let headers = self.request_headers(profile, &target, rule)?;
            let outcome = match self.attempt(&target, headers, rule.preferred_encoding.as_deref()).await {
                Ok(mut page) => match find_marker(&page.body, &rule.paywall_markers) {
                    None => {
                        debug!(profile = profile.name, status = %page.status, charset = page.charset, "fetched");
                        page.attempts = attempts;
                        return Ok(page);
                    }
                    Some(marker) => {
                        paywall_marker = Some(marker.to_string());
                        AttemptOutcome::PaywallMarker(marker.to_string())
                    }
                },
                Err(AttemptError::Retry(outcome)) => {
                    paywall_marker = None;
                    outcome
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
            };

            warn!(profile = profile.name, outcome = %outcome, "attempt failed");
            attempts.push(AttemptRecord { profile: profile.name, outcome });
        }

        if rule.paywall_prone {
            return self.fetch_archive(&target, rule, attempts).await;
        }

        match paywall_marker {
            Some(marker) => Err(FetchError::Paywalled { marker, attempts }),
            None => Err(FetchError::Exhausted { attempts }),
        }
    }

    /// One extra attempt against the archive snapshot of `target`.
    async fn fetch_archive(
        &self, target: &Url, rule: &Rule, attempts: Vec<AttemptRecord>,
    ) -> Result<FetchResult, FetchError> {
        let archive_url = archive_url(&self.config.archive_url_template, target)?;
        warn!(archive = %archive_url, "live page unavailable, trying archive snapshot");

        let headers = self.profile_headers(&DESKTOP, &archive_url)?;
        let failed = |reason: String| FetchError::PaywallFallbackFailed { url: archive_url.to_string(), reason };

        match self.attempt(&archive_url, headers, rule.preferred_encoding.as_deref()).await {
            Ok(mut page) => {
                if let Some(marker) = bot_check_marker(&page.body) {
                    return Err(failed(format!("archive served a bot check (`{}`)", marker)));
                }
                info!(archive = %page.final_url, "using archive snapshot");
                page.from_archive = true;
                page.attempts = attempts;
                Ok(page)
            }
            Err(AttemptError::Retry(outcome)) => Err(failed(outcome.to_string())),
            Err(AttemptError::Fatal(err)) => Err(failed(err.to_string())),
        }
    }

    async fn attempt(
        &self, url: &Url, headers: HeaderMap, preferred_encoding: Option<&str>,
    ) -> Result<FetchResult, AttemptError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| AttemptError::Retry(outcome_from_reqwest(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(if is_retryable_status(status) {
                AttemptError::Retry(AttemptOutcome::Status(status))
            } else {
                AttemptError::Fatal(FetchError::Http { status })
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = &content_type
            && !is_html_content_type(ct)
        {
            return Err(AttemptError::Fatal(FetchError::UnsupportedContentType(ct.clone())));
        }

        if let Some(length) = response.content_length()
            && length > self.config.max_body_bytes
        {
            return Err(AttemptError::Fatal(FetchError::BodyTooLarge(length)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Retry(outcome_from_reqwest(&e)))?;

        if bytes.len() as u64 > self.config.max_body_bytes {
            return Err(AttemptError::Fatal(FetchError::BodyTooLarge(bytes.len() as u64)));
        }

        let (body, charset) = decode_body(&bytes, content_type.as_deref(), preferred_encoding);
        Ok(FetchResult { body, final_url, status, headers, charset, from_archive: false, attempts: Vec::new() })
    }

    /// Profile headers, overlaid by the rule's headers and cookies.
    fn request_headers(&self, profile: &HeaderProfile, target: &Url, rule: &Rule) -> Result<HeaderMap, FetchError> {
        let mut headers = self.profile_headers(profile, target)?;

        for (name, source) in &rule.request_headers {
            let value = match source {
                HeaderValueSource::Literal(value) => Some(value.clone()),
                HeaderValueSource::Env { env } => {
                    let value = self.credentials.lookup(env);
                    if value.is_none() {
                        debug!(header = %name, env = %env, "credential not set, header skipped");
                    }
                    value
                }
            };
            if let Some(value) = value {
                headers.insert(header_name(name)?, header_value(&value)?);
            }
        }

        let cookie = match &rule.cookie_env_var {
            Some(var) => self.credentials.lookup(var),
            None => None,
        }
        .or_else(|| target.host_str().and_then(|host| self.cookies.cookie_header(host)));
        if let Some(cookie) = cookie {
            headers.insert(header::COOKIE, header_value(&cookie)?);
        }

        Ok(headers)
    }

    fn profile_headers(&self, profile: &HeaderProfile, target: &Url) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = match (&self.config.user_agent, profile.name == DESKTOP.name) {
            (Some(custom), true) => custom.as_str(),
            _ => profile.user_agent,
        };
        headers.insert(header::USER_AGENT, header_value(user_agent)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static(profile.accept));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(profile.accept_language));
        for &(name, value) in profile.extra {
            headers.insert(header_name(name)?, HeaderValue::from_static(value));
        }
        if let Some(host) = target.host_str() {
            let referer = format!("{}://{}/", target.scheme(), host);
            headers.insert(header::REFERER, header_value(&referer)?);
        }
        Ok(headers)
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(format!("{}: only http(s) URLs with a host can be fetched", url))),
    }
}

/// Fills the archive template with the page URL.
pub(crate) fn archive_url(template: &str, target: &Url) -> Result<Url, FetchError> {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
    let filled = template.replace("{url_encoded}", &encoded).replace("{url}", target.as_str());
    Url::parse(&filled).map_err(|e| FetchError::InvalidUrl(format!("archive url {}: {}", filled, e)))
}

fn is_html_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/html") || lowered.contains("xhtml") || lowered.trim().is_empty()
}

fn find_marker<'m>(body: &str, markers: &'m [String]) -> Option<&'m str> {
    if markers.is_empty() {
        return None;
    }
    let lowered = body.to_lowercase();
    markers.iter().find(|m| lowered.contains(m.as_str())).map(String::as_str)
}

fn bot_check_marker(body: &str) -> Option<&'static str> {
    let head: String = body.chars().take(BOT_CHECK_SNIFF_CHARS).collect::<String>().to_lowercase();
    BOT_CHECK_MARKERS.iter().copied().find(|m| head.contains(m))
}

fn header_name(name: &str) -> Result<HeaderName, FetchError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| FetchError::InvalidHeader(name.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(format!("value for {}", value)))
}
