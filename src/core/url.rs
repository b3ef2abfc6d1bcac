/// URL Assembly
///
/// Pure helpers that compose GitLab API URLs from a base URL and path segments.
/// Segments are joined verbatim: no percent-encoding is applied, so a namespaced
/// project path such as `group/sub/project` must already be in the form the
/// caller wants on the wire.

use std::fmt;

/// Project identifier accepted by GitLab's REST API.
///
/// Either the numeric project ID or the (URL-encoded) namespaced path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectId {
    Numeric(i64),
    Path(String),
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectId::Numeric(id) => write!(f, "{}", id),
            ProjectId::Path(path) => f.write_str(path),
        }
    }
}

/// Append `segment` to `url` behind exactly one `/`.
///
/// Only trailing slashes already on `url` are collapsed into the separator.
/// The segment itself is appended verbatim, even when empty or made of slashes.
pub fn push_segment(url: &mut String, segment: &str) {
    let kept = url.trim_end_matches('/').len();
    url.truncate(kept);
    url.push('/');
    url.push_str(segment);
}

/// Build the authenticated download URL of a project upload.
///
/// Produces `<base>/projects/<projectId>/uploads/<secret>/<filename>?access_token=<token>`.
/// Every field keeps its position and content; an empty token still yields
/// `?access_token=`.
pub fn build_upload_url(
    base_url: &str,
    project_id: &ProjectId,
    secret: &str,
    filename: &str,
    access_token: &str,
) -> String {
    let project = project_id.to_string();
    let mut url = String::with_capacity(
        base_url.len() + project.len() + secret.len() + filename.len() + access_token.len() + 40,
    );
    url.push_str(base_url);
    push_segment(&mut url, "projects");
    // Fields go in verbatim: a trailing slash inside one must not eat the next seam
    url.push('/');
    url.push_str(&project);
    url.push_str("/uploads/");
    url.push_str(secret);
    url.push('/');
    url.push_str(filename);
    url.push_str("?access_token=");
    url.push_str(access_token);
    url
}
