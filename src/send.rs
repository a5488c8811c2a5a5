//! The file-sending collaborator.
//!
//! [`FileSender`] is the seam between the plugin and whatever actually finds
//! and streams files. It answers every request with a [`SendOutcome`]; the
//! plugin pattern-matches on it and never looks at the filesystem itself.
//!
//! [`DiskSender`] is the default implementation. Resolution, MIME types,
//! ranges, `If-Modified-Since` and streaming come from `hyper-staticfile`;
//! this module layers the [`SendOptions`] policy on top: path checks,
//! dotfiles, index names, extension fallback, header toggles and
//! `If-None-Match` revalidation.

use std::fs::Metadata;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use http::StatusCode;
use http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, HeaderMap,
    HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, LAST_MODIFIED, RANGE,
};
use http::request::Parts;
use http_body_util::BodyExt;
use hyper_staticfile::util::FileResponseBuilder;
use hyper_staticfile::{AcceptEncoding, ResolveResult, Resolver};
use percent_encoding::percent_decode_str;
use tracing::trace;

use crate::options::{Dotfiles, SendOptions};
use crate::response::{Body, full};

/// Finds a file for a request path and prepares it for sending.
///
/// `Err` is reserved for genuine I/O failures; every ordinary miss is a
/// [`SendOutcome`] variant.
#[async_trait]
pub trait FileSender: Send + Sync + 'static {
    async fn send(
        &self,
        head: &Parts,
        pathname: &str,
        options: &SendOptions,
    ) -> io::Result<SendOutcome>;
}

/// What the sender made of a request path.
pub enum SendOutcome {
    /// A file, ready to stream.
    Resolved(SentFile),
    /// The path names a directory and no index file applies.
    Directory,
    NotFound,
    /// The path must not be served; the reason is for logs, not clients.
    Forbidden(String),
    /// The path could not be decoded.
    BadRequest(String),
}

/// A resolved file: response status, headers and body as the sender built
/// them, plus the file's location and metadata for header hooks.
pub struct SentFile {
    /// Absolute path of the file on disk.
    pub path: PathBuf,
    pub metadata: Metadata,
    /// `200`, or `206`/`304`/`416` for range and conditional requests.
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Serves files from [`SendOptions::root`] using `hyper-staticfile`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskSender;

#[async_trait]
impl FileSender for DiskSender {
    async fn send(
        &self,
        head: &Parts,
        pathname: &str,
        options: &SendOptions,
    ) -> io::Result<SendOutcome> {
        let decoded = match percent_decode_str(pathname).decode_utf8() {
            Ok(decoded) if !decoded.contains('\0') => decoded,
            _ => return Ok(SendOutcome::BadRequest(format!("undecodable path {pathname}"))),
        };

        if has_parent_segment(&decoded) {
            return Ok(SendOutcome::Forbidden("malicious path".to_owned()));
        }

        match options.dotfiles {
            Dotfiles::Deny if has_dotfile_segment(&decoded) => {
                return Ok(SendOutcome::Forbidden("dotfile".to_owned()));
            }
            // Only the file itself; `/.well-known/x.txt` is still served.
            Dotfiles::Ignore if ends_in_dotfile(&decoded) => return Ok(SendOutcome::NotFound),
            _ => {}
        }

        let is_dir_request = pathname.ends_with('/');
        let candidates: Vec<String> = if is_dir_request {
            if options.index.is_empty() {
                return Ok(SendOutcome::Directory);
            }
            options.index.iter().map(|index| format!("{pathname}{index}")).collect()
        } else {
            let mut candidates = vec![pathname.to_owned()];
            if !has_extension(&decoded) {
                candidates.extend(options.extensions.iter().map(|ext| format!("{pathname}.{ext}")));
            }
            candidates
        };

        let resolver = Resolver::new(options.root.clone());

        for (attempt, candidate) in candidates.iter().enumerate() {
            trace!(candidate = candidate.as_str(), "resolving");

            let result = match resolver.resolve_path(candidate, AcceptEncoding::none()).await {
                Ok(result) => result,
                // `/file.txt/index.html` and friends
                Err(e) if e.kind() == io::ErrorKind::NotADirectory => continue,
                Err(e) => return Err(e),
            };

            match result {
                ResolveResult::Found(file) => {
                    let path = options.root.join(&file.path);
                    let metadata = tokio::fs::metadata(&path).await?;

                    let request_headers = conditional_headers(&head.headers, options);
                    let response = FileResponseBuilder::new()
                        .request_parts(&head.method, &request_headers)
                        .build(file)
                        .map_err(io::Error::other)?;

                    let (parts, body) = response.into_parts();
                    let mut headers = parts.headers;
                    apply_header_options(&mut headers, options);

                    if parts.status.is_success() && etag_fresh(&head.headers, &headers, options) {
                        for name in [CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE] {
                            headers.remove(name);
                        }
                        return Ok(SendOutcome::Resolved(SentFile {
                            path,
                            metadata,
                            status: StatusCode::NOT_MODIFIED,
                            headers,
                            body: full(""),
                        }));
                    }

                    return Ok(SendOutcome::Resolved(SentFile {
                        path,
                        metadata,
                        status: parts.status,
                        headers,
                        body: body.boxed_unsync(),
                    }));
                }
                ResolveResult::IsDirectory { .. } if attempt == 0 && !is_dir_request => {
                    return Ok(SendOutcome::Directory);
                }
                ResolveResult::IsDirectory { .. }
                | ResolveResult::NotFound
                | ResolveResult::MethodNotMatched => {}
                ResolveResult::PermissionDenied => {
                    return Err(io::Error::from(io::ErrorKind::PermissionDenied));
                }
            }
        }

        Ok(SendOutcome::NotFound)
    }
}

/// `..` anywhere in the decoded path, with either separator.
fn has_parent_segment(decoded: &str) -> bool {
    decoded.split(['/', '\\']).any(|segment| segment == "..")
}

fn has_dotfile_segment(decoded: &str) -> bool {
    decoded.split('/').any(|segment| segment.len() > 1 && segment.starts_with('.'))
}

/// Whether the last segment has an extension. A leading dot does not count.
fn ends_in_dotfile(decoded: &str) -> bool {
    decoded
        .split('/')
        .rfind(|segment| !segment.is_empty())
        .is_some_and(|segment| segment.len() > 1 && segment.starts_with('.'))
}

fn has_extension(decoded: &str) -> bool {
    decoded
        .rsplit('/')
        .next()
        .and_then(|name| name.rfind('.'))
        .is_some_and(|dot| dot > 0)
}

/// Request headers as `hyper-staticfile` should see them.
///
/// `If-None-Match` takes precedence over `If-Modified-Since`, so the date is
/// dropped whenever a tag is sent. Disabled features drop their validators.
fn conditional_headers(headers: &HeaderMap, options: &SendOptions) -> HeaderMap {
    let mut headers = headers.clone();
    if !options.accept_ranges {
        headers.remove(RANGE);
        headers.remove(IF_RANGE);
    }
    if !options.last_modified || headers.contains_key(IF_NONE_MATCH) {
        headers.remove(IF_MODIFIED_SINCE);
    }
    headers
}

fn etag_fresh(request: &HeaderMap, response: &HeaderMap, options: &SendOptions) -> bool {
    if !options.etag {
        return false;
    }
    let (Some(if_none_match), Some(etag)) = (
        request.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()),
        response.get(ETAG).and_then(|v| v.to_str().ok()),
    ) else {
        return false;
    };
    etag_matches(etag, if_none_match)
}

/// Weak comparison against a comma-separated `If-None-Match` list.
fn etag_matches(etag: &str, if_none_match: &str) -> bool {
    if if_none_match.trim() == "*" {
        return true;
    }
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate.strip_prefix("W/").unwrap_or(candidate) == etag)
}

fn apply_header_options(headers: &mut HeaderMap, options: &SendOptions) {
    if !options.accept_ranges {
        headers.remove(ACCEPT_RANGES);
    }
    if !options.etag {
        headers.remove(ETAG);
    }
    if !options.last_modified {
        headers.remove(LAST_MODIFIED);
    }
    if options.cache_control {
        let mut value = format!("public, max-age={}", options.max_age.as_secs());
        if options.immutable {
            value.push_str(", immutable");
        }
        if let Ok(value) = HeaderValue::try_from(value) {
            headers.insert(CACHE_CONTROL, value);
        }
    }
}
