//! Static file plugin options.
//!
//! [`StaticOptions`] is what callers build; registration validates it once and
//! freezes the result. The file-sending options ([`SendOptions`]) are not
//! interpreted here, only carried to the [`FileSender`](crate::send::FileSender).

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

/// Callback run on every successfully resolved file, right before the
/// response leaves the plugin: `(response headers, absolute file path, file
/// metadata)`. Anything it writes to the headers is final.
pub type SetHeaders = Arc<dyn Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync + 'static>;

/// How paths with a segment starting with `.` are treated.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Dotfiles {
    /// Serve them like any other file.
    Allow,
    /// Respond `403 Forbidden`.
    Deny,
    /// Pretend they do not exist: `404 Not Found`.
    #[default]
    Ignore,
}

/// Options handed verbatim to the file sender on every request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendOptions {
    /// Absolute directory files are served from.
    pub root: PathBuf,
    /// Honor `Range` requests and advertise `Accept-Ranges`.
    pub accept_ranges: bool,
    /// Emit a `Cache-Control` header.
    pub cache_control: bool,
    pub dotfiles: Dotfiles,
    pub etag: bool,
    /// Extensions tried, in order, when a path without one is not found.
    pub extensions: Vec<String>,
    /// Append `immutable` to `Cache-Control`.
    pub immutable: bool,
    /// Index file names tried, in order, for paths ending in `/`. Empty
    /// disables index resolution.
    pub index: Vec<String>,
    pub last_modified: bool,
    /// `max-age` of the `Cache-Control` header, whole seconds.
    pub max_age: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            accept_ranges: true,
            cache_control: true,
            dotfiles: Dotfiles::Ignore,
            etag: true,
            extensions: Vec::new(),
            immutable: false,
            index: vec!["index.html".to_owned()],
            last_modified: true,
            max_age: Duration::ZERO,
        }
    }
}

/// Options for [`ServeStatic`](crate::middleware::serve_static::ServeStatic).
///
/// ```rust
/// use std::time::Duration;
/// use serve_static::StaticOptions;
///
/// let options = StaticOptions::new("/var/www")
///     .prefix("/assets")
///     .max_age(Duration::from_secs(3600))
///     .set_headers(|headers, _path, _metadata| {
///         headers.insert("x-served-by", "serve-static".parse().unwrap());
///     });
/// ```
#[derive(Clone, Default)]
pub struct StaticOptions {
    pub(crate) root: Option<PathBuf>,
    pub(crate) prefix: Option<String>,
    pub(crate) set_headers: Option<SetHeaders>,
    pub(crate) send: SendOptions,
}

/// Validated options, frozen at registration.
pub(crate) struct StaticConfig {
    pub(crate) prefix: String,
    pub(crate) set_headers: Option<SetHeaders>,
    pub(crate) send: SendOptions,
}

impl StaticOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::default().root(root)
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// URL prefix the files are mounted under. Defaults to `/`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn set_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync + 'static,
    {
        self.set_headers = Some(Arc::new(f));
        self
    }

    pub fn accept_ranges(mut self, yes: bool) -> Self {
        self.send.accept_ranges = yes;
        self
    }

    pub fn cache_control(mut self, yes: bool) -> Self {
        self.send.cache_control = yes;
        self
    }

    pub fn dotfiles(mut self, dotfiles: Dotfiles) -> Self {
        self.send.dotfiles = dotfiles;
        self
    }

    pub fn etag(mut self, yes: bool) -> Self {
        self.send.etag = yes;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn immutable(mut self, yes: bool) -> Self {
        self.send.immutable = yes;
        self
    }

    pub fn index<I, S>(mut self, index: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send.index = index.into_iter().map(Into::into).collect();
        self
    }

    pub fn last_modified(mut self, yes: bool) -> Self {
        self.send.last_modified = yes;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.send.max_age = max_age;
        self
    }

    /// The file-sending options as they will be forwarded.
    pub fn send_options(&self) -> &SendOptions { &self.send }

    /// Builds options from a loosely-typed configuration document.
    ///
    /// Keys are accepted in camelCase (`maxAge`) or snake_case (`max_age`).
    /// `maxAge` is in milliseconds; `index` and `extensions` take `false`, a
    /// string or a list of strings.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use serve_static::StaticOptions;
    ///
    /// let options = StaticOptions::from_value(json!({
    ///     "root": "/var/www",
    ///     "prefix": "/assets",
    ///     "maxAge": 60000,
    ///     "index": false,
    /// }))
    /// .unwrap();
    /// assert!(options.send_options().index.is_empty());
    /// ```
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(mut map) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let root = match map.remove("root") {
            None => None,
            Some(Value::String(root)) => Some(PathBuf::from(root)),
            Some(_) => return Err(ConfigError::RootNotString),
        };

        let prefix = match map.remove("prefix") {
            None => None,
            Some(v) if is_falsy(&v) => None,
            Some(Value::String(prefix)) => Some(prefix),
            Some(_) => return Err(ConfigError::PrefixNotString),
        };

        for key in ["setHeaders", "set_headers"] {
            if map.remove(key).is_some_and(|v| !is_falsy(&v)) {
                return Err(ConfigError::SetHeadersNotCallable);
            }
        }

        let raw: RawSendOptions =
            serde_json::from_value(Value::Object(map)).map_err(ConfigError::Malformed)?;

        Ok(Self { root, prefix, set_headers: None, send: raw.into_send_options() })
    }

    /// Checks the options and freezes them. Never re-run per request.
    pub(crate) fn validate(self) -> Result<StaticConfig, ConfigError> {
        let root = self.root.ok_or(ConfigError::RootRequired)?;
        if !root.is_absolute() {
            return Err(ConfigError::RootNotAbsolute);
        }

        let prefix = match self.prefix {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => "/".to_owned(),
        };
        if !prefix.starts_with('/') {
            return Err(ConfigError::PrefixMissingSlash);
        }

        Ok(StaticConfig {
            prefix,
            set_headers: self.set_headers,
            send: SendOptions { root, ..self.send },
        })
    }
}

impl fmt::Debug for StaticOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticOptions")
            .field("root", &self.root)
            .field("prefix", &self.prefix)
            .field("set_headers", &self.set_headers.is_some())
            .field("send", &self.send)
            .finish()
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// ── Document form ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSendOptions {
    #[serde(alias = "accept_ranges")]
    accept_ranges: bool,
    #[serde(alias = "cache_control")]
    cache_control: bool,
    dotfiles: Dotfiles,
    etag: bool,
    extensions: Names,
    immutable: bool,
    index: Names,
    #[serde(alias = "last_modified")]
    last_modified: bool,
    /// Milliseconds.
    #[serde(alias = "max_age")]
    max_age: u64,
}

/// `false`, `"name"` or `["a", "b"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Names {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl Names {
    fn into_vec(self, when_true: &[String]) -> Vec<String> {
        match self {
            Self::Flag(true) => when_true.to_vec(),
            Self::Flag(false) => Vec::new(),
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

impl Default for RawSendOptions {
    fn default() -> Self {
        let defaults = SendOptions::default();
        Self {
            accept_ranges: defaults.accept_ranges,
            cache_control: defaults.cache_control,
            dotfiles: defaults.dotfiles,
            etag: defaults.etag,
            extensions: Names::Many(defaults.extensions),
            immutable: defaults.immutable,
            index: Names::Many(defaults.index),
            last_modified: defaults.last_modified,
            max_age: 0,
        }
    }
}

impl RawSendOptions {
    fn into_send_options(self) -> SendOptions {
        let defaults = SendOptions::default();
        SendOptions {
            root: PathBuf::new(),
            accept_ranges: self.accept_ranges,
            cache_control: self.cache_control,
            dotfiles: self.dotfiles,
            etag: self.etag,
            extensions: self.extensions.into_vec(&[]),
            immutable: self.immutable,
            index: self.index.into_vec(&defaults.index),
            last_modified: self.last_modified,
            max_age: Duration::from_millis(self.max_age),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn validate(value: Value) -> Result<StaticConfig, ConfigError> {
        StaticOptions::from_value(value)?.validate()
    }

    #[test]
    fn root_is_required() {
        assert!(matches!(validate(json!({})), Err(ConfigError::RootRequired)));
        assert!(matches!(StaticOptions::default().validate(), Err(ConfigError::RootRequired)));
    }

    #[test]
    fn root_must_be_a_string() {
        assert!(matches!(validate(json!({ "root": null })), Err(ConfigError::RootNotString)));
        assert!(matches!(validate(json!({ "root": 10 })), Err(ConfigError::RootNotString)));
    }

    #[test]
    fn root_must_be_absolute() {
        for root in ["relative/path", "../path/files", ""] {
            assert!(
                matches!(StaticOptions::new(root).validate(), Err(ConfigError::RootNotAbsolute)),
                "{root}"
            );
        }
    }

    #[test]
    fn prefix_must_be_a_string() {
        assert!(matches!(
            validate(json!({ "root": "/srv", "prefix": true })),
            Err(ConfigError::PrefixNotString)
        ));
        assert!(matches!(
            validate(json!({ "root": "/srv", "prefix": 10 })),
            Err(ConfigError::PrefixNotString)
        ));
    }

    #[test]
    fn prefix_must_start_with_a_slash() {
        assert!(matches!(
            StaticOptions::new("/srv").prefix("v1").validate(),
            Err(ConfigError::PrefixMissingSlash)
        ));
    }

    #[test]
    fn falsy_prefix_defaults_to_root() {
        for prefix in [json!(null), json!(false), json!(0), json!("")] {
            let config = validate(json!({ "root": "/srv", "prefix": prefix })).unwrap();
            assert_eq!(config.prefix, "/");
        }
        assert_eq!(StaticOptions::new("/srv").validate().unwrap().prefix, "/");
    }

    #[test]
    fn set_headers_cannot_come_from_a_document() {
        for value in [json!(10), json!(true), json!("fn")] {
            assert!(matches!(
                validate(json!({ "root": "/", "setHeaders": value })),
                Err(ConfigError::SetHeadersNotCallable)
            ));
        }
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert!(validate(json!({ "root": "/", "setHeaders": falsy.clone() })).is_ok());
            assert!(validate(json!({ "root": "/", "set_headers": falsy })).is_ok());
        }
    }

    #[test]
    fn not_an_object() {
        assert!(matches!(StaticOptions::from_value(json!("/srv")), Err(ConfigError::NotAnObject)));
    }

    #[test]
    fn send_options_have_send_defaults() {
        let config = StaticOptions::new("/srv").validate().unwrap();
        assert_eq!(config.send, SendOptions { root: PathBuf::from("/srv"), ..SendOptions::default() });
    }

    #[test]
    fn document_send_options_are_forwarded() {
        let config = validate(json!({
            "root": "/srv",
            "acceptRanges": false,
            "cache_control": false,
            "dotfiles": "allow",
            "etag": false,
            "extensions": ["html", "htm"],
            "immutable": true,
            "index": "default.htm",
            "lastModified": false,
            "maxAge": 90_000,
        }))
        .unwrap();

        assert_eq!(config.send, SendOptions {
            root: PathBuf::from("/srv"),
            accept_ranges: false,
            cache_control: false,
            dotfiles: Dotfiles::Allow,
            etag: false,
            extensions: vec!["html".to_owned(), "htm".to_owned()],
            immutable: true,
            index: vec!["default.htm".to_owned()],
            last_modified: false,
            max_age: Duration::from_secs(90),
        });
    }

    #[test]
    fn mistyped_send_option_is_malformed() {
        assert!(matches!(
            validate(json!({ "root": "/srv", "etag": "yes" })),
            Err(ConfigError::Malformed(_))
        ));
    }
}
