//! Example snippets, fetched from a source with built-in fallbacks
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Example names offered by the gallery
pub const CATALOG: &[&str] = &[
    "animated-treemap",
    "arc-diagram",
    "area-chart",
    "bar-chart",
    "bubble-chart",
    "calendar",
    "candlestick-chart",
    "chord-diagram",
    "choropleth",
    "connected-scatterplot",
    "density-contours",
    "donut-chart",
    "force-directed-graph",
    "hexbin",
    "histogram",
    "horizon-chart",
    "line-chart",
    "multi-line-chart",
    "pack",
    "parallel-coordinates",
    "pie-chart",
    "radial-area-chart",
    "sankey",
    "scatterplot",
    "stacked-area-chart",
    "stacked-bar-chart",
    "streamgraph",
    "sunburst",
    "treemap",
    "violin-plot",
    "world-map",
];

/// Built-in snippets used when an example cannot be fetched
pub const FALLBACKS: &[(&str, &str)] = &[
    ("bar-chart", include_str!("../fallbacks/bar-chart.js")),
    ("line-chart", include_str!("../fallbacks/line-chart.js")),
    ("scatterplot", include_str!("../fallbacks/scatterplot.js")),
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Request failed - {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response status {0}")]
    Status(u16),

    #[error("IO Error - {0}")]
    IOError(#[from] std::io::Error),

    #[error("No example source configured")]
    Offline,

    #[error("Invalid example name {0:?}")]
    InvalidName(String),
}

/// Where example text comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ExampleSource {
    /// `GET <base>/<name>.js`
    Http { base: String },
    /// `<dir>/<name>.js`
    Dir(PathBuf),
    #[default]
    Offline,
}

/// Example text, and whether or not it is a built-in substitute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub name: String,
    pub text: String,
    pub fallback: bool,
}

impl ExampleSource {
    /// Source from a URL, a directory path, or `offline`
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("offline") {
            ExampleSource::Offline
        } else if s.starts_with("http://") || s.starts_with("https://") {
            ExampleSource::Http {
                base: s.trim_end_matches('/').to_string(),
            }
        } else {
            ExampleSource::Dir(PathBuf::from(s))
        }
    }

    /// Fetch text of example `name`
    pub async fn fetch(&self, name: &str) -> Result<String, LoadError> {
        if !valid_name(name) {
            return Err(LoadError::InvalidName(name.to_string()));
        }
        match self {
            ExampleSource::Http { base } => {
                let url = format!("{base}/{name}.js");
                debug!("fetching {url}");
                let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(LoadError::Status(response.status().as_u16()));
                }
                Ok(response.text().await?)
            }
            ExampleSource::Dir(dir) => {
                let path = dir.join(format!("{name}.js"));
                debug!("reading {path:?}");
                Ok(tokio::fs::read_to_string(path).await?)
            }
            ExampleSource::Offline => Err(LoadError::Offline),
        }
    }

    /// Fetch example `name`, substituting its built-in on failure
    pub async fn load(&self, name: &str) -> Example {
        match self.fetch(name).await {
            Ok(text) => Example {
                name: name.to_string(),
                text,
                fallback: false,
            },
            Err(e) => {
                warn!("Failed to load example {name} - {e}");
                Example {
                    name: name.to_string(),
                    text: fallback(name).to_string(),
                    fallback: true,
                }
            }
        }
    }
}

/// Whether or not `name` stays within its source, as a single path segment
fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// Built-in snippet for `name`, defaulting to the bar chart
pub fn fallback(name: &str) -> &'static str {
    let lookup = |n: &str| FALLBACKS.iter().find(|(k, _)| *k == n).map(|(_, v)| *v);
    lookup(name).or_else(|| lookup("bar-chart")).unwrap_or_default()
}

/// Display title of an example name, e.g. `Bar Chart`
pub fn title(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn titles() {
        assert_eq!(title("bar-chart"), "Bar Chart");
        assert_eq!(title("pack"), "Pack");
        assert_eq!(title("force-directed-graph"), "Force Directed Graph");
        assert_eq!(CATALOG.len(), 31);
    }

    #[test]
    fn fallbacks() {
        assert!(fallback("bar-chart").starts_with("// Simple Bar Chart"));
        assert!(fallback("line-chart").starts_with("// Simple Line Chart"));
        assert!(fallback("scatterplot").starts_with("// Simple Scatterplot"));
        assert_eq!(fallback("totally-unknown-name"), fallback("bar-chart"));
    }

    #[test]
    fn parse_sources() {
        assert_eq!(ExampleSource::parse(""), ExampleSource::Offline);
        assert_eq!(ExampleSource::parse("offline"), ExampleSource::Offline);
        assert_eq!(
            ExampleSource::parse("https://example.org/gallery/"),
            ExampleSource::Http {
                base: "https://example.org/gallery".to_string()
            }
        );
        assert_eq!(
            ExampleSource::parse("./gallery"),
            ExampleSource::Dir(PathBuf::from("./gallery"))
        );
    }

    #[tokio::test]
    async fn offline_falls_back() {
        assert_matches!(ExampleSource::Offline.fetch("bar-chart").await, Err(LoadError::Offline));
        let example = ExampleSource::Offline.load("scatterplot").await;
        assert!(example.fallback);
        assert_eq!(example.text, fallback("scatterplot"));
    }

    #[tokio::test]
    async fn names_stay_in_source() {
        let dir = std::env::temp_dir().join(format!("pad-examples-{}", nanoid::nanoid!()));
        let inner = dir.join("gallery");
        tokio::fs::create_dir_all(&inner).await.unwrap();
        tokio::fs::write(dir.join("secret.js"), "return 'secret'").await.unwrap();

        let source = ExampleSource::Dir(inner);
        for name in ["../secret", "..\\secret", "a/b", "..", ""] {
            assert_matches!(source.fetch(name).await, Err(LoadError::InvalidName(n)) if n == name);
        }
        let example = source.load("../secret").await;
        assert!(example.fallback);
        assert_eq!(example.text, fallback("bar-chart"));

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn dir_source() {
        let dir = std::env::temp_dir().join(format!("pad-examples-{}", nanoid::nanoid!()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("histogram.js"), "return 1").await.unwrap();

        let source = ExampleSource::Dir(dir.clone());
        let found = source.load("histogram").await;
        assert_eq!(found.text, "return 1");
        assert!(!found.fallback);

        let missing = source.load("line-chart").await;
        assert!(missing.fallback);
        assert_eq!(missing.text, fallback("line-chart"));

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }
}
