/// A browser-like set of request headers. Attempts walk through
/// [`HEADER_PROFILES`] in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub extra: &'static [(&'static str, &'static str)],
}

pub const DESKTOP: HeaderProfile = HeaderProfile {
    name: "desktop",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7",
    extra: &[("Cache-Control", "no-cache"), ("Pragma", "no-cache"), ("Upgrade-Insecure-Requests", "1")],
};

pub const MOBILE: HeaderProfile = HeaderProfile {
    name: "mobile",
    user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9",
    extra: &[],
};

pub const HEADER_PROFILES: &[HeaderProfile] = &[DESKTOP, MOBILE];
