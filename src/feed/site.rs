use url::Url;

use crate::error::ConfigError;

/// A browsable listing on the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

pub const SECTIONS: &[Section] = &[
    Section {
        key: "popular",
        label: "Popular",
        path: "/popular",
    },
    Section {
        key: "cinema",
        label: "Movies & series",
        path: "/cinema",
    },
    Section {
        key: "games",
        label: "Games",
        path: "/games",
    },
    Section {
        key: "music",
        label: "Music",
        path: "/music",
    },
    Section {
        key: "gamedev",
        label: "Gamedev",
        path: "/gamedev",
    },
];

pub fn find_section(key: &str) -> Option<&'static Section> {
    let key = key.trim();
    SECTIONS.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

/// CSS selectors describing one listing item in the rendered markup.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub block: String,
    pub title: String,
    pub link: String,
    pub excerpt: String,
    pub views: String,
    pub timestamp: String,
    /// Attribute on the timestamp element holding the date.
    pub timestamp_attr: String,
    /// chrono format string for the timestamp attribute.
    pub timestamp_format: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            block: "div.content--short".to_string(),
            title: "div.content-title".to_string(),
            link: "a.content__link".to_string(),
            excerpt: "div.block-text".to_string(),
            views: ".views__value".to_string(),
            timestamp: "time[datetime]".to_string(),
            timestamp_attr: "datetime".to_string(),
            timestamp_format: "%Y-%m-%dT%H:%M:%S%:z".to_string(),
        }
    }
}

impl ListingSelectors {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| {
            dotenv::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            block: var("SELECTOR_BLOCK", defaults.block),
            title: var("SELECTOR_TITLE", defaults.title),
            link: var("SELECTOR_LINK", defaults.link),
            excerpt: var("SELECTOR_EXCERPT", defaults.excerpt),
            views: var("SELECTOR_VIEWS", defaults.views),
            timestamp: var("SELECTOR_TIMESTAMP", defaults.timestamp),
            timestamp_attr: var("TIMESTAMP_ATTR", defaults.timestamp_attr),
            timestamp_format: var("TIMESTAMP_FORMAT", defaults.timestamp_format),
        }
    }
}

/// Where listings live and how their markup looks.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Scheme + host, e.g. `https://dtf.ru/`. Links resolve against it.
    pub origin: Url,
    /// Search page path; `{query}` is replaced by the encoded query.
    pub search_path: String,
    pub selectors: ListingSelectors,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            origin: Url::parse("https://dtf.ru/").expect("static origin parses"),
            search_path: "/search/v2/content/new?query={query}".to_string(),
            selectors: ListingSelectors::default(),
        }
    }
}

impl SiteProfile {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let origin = dotenv::var("SITE_ORIGIN").unwrap_or_else(|_| defaults.origin.to_string());
        let search_path = dotenv::var("SITE_SEARCH_PATH").unwrap_or(defaults.search_path);
        Self::new(&origin, &search_path, ListingSelectors::from_env())
    }

    pub fn new(
        origin: &str,
        search_path: &str,
        selectors: ListingSelectors,
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(origin).map_err(|_| ConfigError::Origin(origin.to_string()))?;
        let bare = parsed.path() == "/" && parsed.query().is_none() && parsed.fragment().is_none();
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() || !bare {
            return Err(ConfigError::Origin(origin.to_string()));
        }
        let search_ok = search_path.contains("{query}")
            && parsed.join(&search_path.replace("{query}", "q")).is_ok();
        if !search_ok {
            return Err(ConfigError::Value {
                key: "SITE_SEARCH_PATH",
                value: search_path.to_string(),
            });
        }

        Ok(Self {
            origin: parsed,
            search_path: search_path.to_string(),
            selectors,
        })
    }

    /// Resolve an `href` found in a listing. Only links on the origin
    /// (same scheme, host and port) qualify; fragments and script links don't.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        if href.starts_with('#') {
            return None;
        }
        let url = self.origin.join(href).ok()?;
        (url.origin() == self.origin.origin()).then_some(url)
    }

    pub fn section_url(&self, section: &Section) -> Result<Url, url::ParseError> {
        self.origin.join(section.path)
    }

    pub fn search_url(&self, query: &str) -> Result<Url, url::ParseError> {
        let encoded: String =
            url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        self.origin.join(&self.search_path.replace("{query}", &encoded))
    }
}
