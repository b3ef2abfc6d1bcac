/// GitLab Upload File Tool
///
/// Builds the authenticated download URL of a file uploaded to a GitLab
/// project. The tool never fetches the file; it only returns the URL. The
/// connection's [`Config`] is captured by the handler at registration time and
/// is only ever read.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::{FieldIssue, ToolInputValidationError};
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};
use crate::core::url::{self, ProjectId};

pub const TOOL_NAME: &str = "get_upload_file";

pub const DESCRIPTION: &str = "Get the uploads which are uploaded files in a project that can be referenced as links in Markdown text in an issue, merge request, snippet, or wiki page (https://docs.gitlab.com/security/user_file_uploads/)";

pub const SECRET_LENGTH: usize = 32;

/// JSON Schema of the tool's arguments, as advertised by `tools/list`.
pub fn input_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "projectId": {
                "anyOf": [{ "type": "integer" }, { "type": "string" }],
                "description": "ID or URL-encoded path of the project (https://docs.gitlab.com/api/rest/#namespaced-paths)"
            },
            "secret": {
                "type": "string",
                "minLength": SECRET_LENGTH,
                "maxLength": SECRET_LENGTH,
                "description": "32-character secret of the upload"
            },
            "filename": {
                "type": "string",
                "minLength": 1,
                "description": "Filename of the upload"
            }
        },
        "required": ["projectId", "secret", "filename"]
    })
}

/// Validated arguments of a single `get_upload_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileInput {
    pub project_id: ProjectId,
    pub secret: String,
    pub filename: String,
}

impl UploadFileInput {
    /// Validate raw call arguments, reporting every offending field.
    pub fn parse(args: &Value) -> Result<Self, ToolInputValidationError> {
        let empty = Map::new();
        let object = args.as_object().unwrap_or(&empty);
        let mut issues = Vec::new();

        let project_id = match parse_project_id(object.get("projectId")) {
            Ok(id) => Some(id),
            Err(issue) => {
                issues.push(issue);
                None
            }
        };

        let secret = match object.get("secret") {
            None | Some(Value::Null) => {
                issues.push(FieldIssue::new("secret", "missing"));
                None
            }
            Some(Value::String(s)) => {
                let length = s.chars().count();
                if length == SECRET_LENGTH {
                    Some(s.clone())
                } else {
                    issues.push(FieldIssue::new(
                        "secret",
                        format!("must be exactly {} characters, got {}", SECRET_LENGTH, length),
                    ));
                    None
                }
            }
            Some(_) => {
                issues.push(FieldIssue::new("secret", "expected string"));
                None
            }
        };

        let filename = match object.get("filename") {
            None | Some(Value::Null) => {
                issues.push(FieldIssue::new("filename", "missing"));
                None
            }
            Some(Value::String(s)) if s.is_empty() => {
                issues.push(FieldIssue::new("filename", "must not be empty"));
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                issues.push(FieldIssue::new("filename", "expected string"));
                None
            }
        };

        match (project_id, secret, filename) {
            (Some(project_id), Some(secret), Some(filename)) if issues.is_empty() => Ok(Self {
                project_id,
                secret,
                filename,
            }),
            _ => Err(ToolInputValidationError { issues }),
        }
    }
}

fn parse_project_id(value: Option<&Value>) -> Result<ProjectId, FieldIssue> {
    match value {
        None | Some(Value::Null) => Err(FieldIssue::new("projectId", "missing")),
        Some(Value::String(path)) if path.is_empty() => Err(FieldIssue::new("projectId", "must not be empty")),
        Some(Value::String(path)) => Ok(ProjectId::Path(path.clone())),
        Some(Value::Number(n)) => {
            if let Some(id) = n.as_i64() {
                return Ok(ProjectId::Numeric(id));
            }
            // GitLab IDs are signed 64-bit; larger unsigned values cannot name a project
            if n.is_u64() {
                return Err(FieldIssue::new("projectId", "integer out of range"));
            }
            // JSON producers may serialize integral IDs as 42.0
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                    Ok(ProjectId::Numeric(f as i64))
                }
                _ => Err(FieldIssue::new("projectId", "expected integer or string")),
            }
        }
        Some(_) => Err(FieldIssue::new("projectId", "expected integer or string")),
    }
}

/// Compute the download URL for validated input under `config`.
pub fn execute(config: &Config, input: &UploadFileInput) -> String {
    url::build_upload_url(
        config.api_base_url(),
        &input.project_id,
        &input.secret,
        &input.filename,
        config.access_token(),
    )
}

/// Register the upload tool, capturing the connection's configuration.
///
/// # Arguments
/// * `registry` - Tool registry of the connection
/// * `config` - Validated configuration the handler reads on every call
pub fn register(registry: &mut ToolRegistry, config: Arc<Config>) {
    let tool = MCPTool {
        name: TOOL_NAME.to_string(),
        description: DESCRIPTION.to_string(),
        input_schema: input_schema(),
    };

    let handler: ToolHandler = Box::new(move |args: Value| -> Result<String, ToolInputValidationError> {
        let input = UploadFileInput::parse(&args)?;
        tracing::debug!(
            project_id = %input.project_id,
            filename = %input.filename,
            "Building upload URL"
        );
        Ok(execute(&config, &input))
    });

    registry.register(tool, handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "abcdefghijklmnopqrstuvwxyz012345";

    fn config() -> Config {
        Config::validate(&json!({
            "gitlabApiUrl": "https://gitlab.example.com/api/v4",
            "gitlabPersonalAccessToken": "tok123"
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_numeric_project() {
        let input = UploadFileInput::parse(&json!({
            "projectId": 42,
            "secret": SECRET,
            "filename": "diagram.png"
        }))
        .unwrap();
        assert_eq!(input.project_id, ProjectId::Numeric(42));
        assert_eq!(
            execute(&config(), &input),
            "https://gitlab.example.com/api/v4/projects/42/uploads/abcdefghijklmnopqrstuvwxyz012345/diagram.png?access_token=tok123"
        );
    }

    #[test]
    fn test_parse_path_project() {
        let input = UploadFileInput::parse(&json!({
            "projectId": "group/sub/project",
            "secret": SECRET,
            "filename": "diagram.png"
        }))
        .unwrap();
        assert_eq!(input.project_id, ProjectId::Path("group/sub/project".to_string()));
        assert!(execute(&config(), &input).contains("/projects/group/sub/project/uploads/"));
    }

    #[test]
    fn test_integral_float_project_id_accepted() {
        let input = UploadFileInput::parse(&json!({
            "projectId": 42.0,
            "secret": SECRET,
            "filename": "a"
        }))
        .unwrap();
        assert_eq!(input.project_id, ProjectId::Numeric(42));
    }

    #[test]
    fn test_secret_length_boundaries() {
        for (secret, ok) in [
            ("a".repeat(31), false),
            ("a".repeat(32), true),
            ("a".repeat(33), false),
            ("!@#$%^&*()_+-=[]{}|;':,./<>?~`ü".to_string() + "x", true),
        ] {
            let result = UploadFileInput::parse(&json!({
                "projectId": 1,
                "secret": secret,
                "filename": "f"
            }));
            assert_eq!(result.is_ok(), ok, "secret {:?}", secret);
            if let Err(err) = result {
                assert!(err.mentions("secret"));
            }
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = UploadFileInput::parse(&json!({
            "projectId": 42,
            "secret": "short",
            "filename": "diagram.png"
        }))
        .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "secret");
        assert_eq!(err.issues[0].message, "must be exactly 32 characters, got 5");
    }

    #[test]
    fn test_empty_filename_rejected() {
        let err = UploadFileInput::parse(&json!({
            "projectId": 42,
            "secret": SECRET,
            "filename": ""
        }))
        .unwrap_err();
        assert!(err.mentions("filename"));
    }

    #[test]
    fn test_project_id_wrong_type_rejected() {
        for project_id in [json!(true), json!([1]), json!({"id": 1}), json!(1.5)] {
            let err = UploadFileInput::parse(&json!({
                "projectId": project_id,
                "secret": SECRET,
                "filename": "f"
            }))
            .unwrap_err();
            assert!(err.mentions("projectId"));
        }
    }

    #[test]
    fn test_unsigned_project_id_beyond_i64_rejected() {
        let err = UploadFileInput::parse(&json!({
            "projectId": u64::MAX,
            "secret": SECRET,
            "filename": "f"
        }))
        .unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("projectId", "integer out of range")]);

        let input = UploadFileInput::parse(&json!({
            "projectId": i64::MAX as u64,
            "secret": SECRET,
            "filename": "f"
        }))
        .unwrap();
        assert_eq!(input.project_id, ProjectId::Numeric(i64::MAX));
    }

    #[test]
    fn test_empty_project_path_rejected() {
        let err = UploadFileInput::parse(&json!({
            "projectId": "",
            "secret": SECRET,
            "filename": "f"
        }))
        .unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("projectId", "must not be empty")]);
    }

    #[test]
    fn test_secret_length_counts_characters() {
        // Four bytes and two UTF-16 units, but one character
        let thirty_two = format!("😀{}", "a".repeat(31));
        let thirty_one = format!("😀{}", "a".repeat(30));
        let parse = |secret: &str| {
            UploadFileInput::parse(&json!({ "projectId": 1, "secret": secret, "filename": "f" }))
        };
        assert!(parse(thirty_two.as_str()).is_ok());
        assert!(parse(thirty_one.as_str()).unwrap_err().mentions("secret"));
    }

    #[test]
    fn test_slash_only_secret_and_filename_reach_url() {
        let input = UploadFileInput::parse(&json!({
            "projectId": 1,
            "secret": "/".repeat(32),
            "filename": "/"
        }))
        .unwrap();
        let url = execute(&config(), &input);
        assert!(url.contains(&format!("/uploads/{}//?access_token=", "/".repeat(32))));
    }

    #[test]
    fn test_missing_arguments_report_every_field() {
        let err = UploadFileInput::parse(&json!({})).unwrap_err();
        let fields: Vec<_> = err.issues.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["projectId", "secret", "filename"]);
    }

    #[test]
    fn test_registered_handler_uses_captured_config() {
        let mut registry = ToolRegistry::new();
        register(&mut registry, Arc::new(config()));

        assert_eq!(registry.tools.len(), 1);
        assert_eq!(registry.tools[0].name, TOOL_NAME);

        let handler = registry.handlers.get(TOOL_NAME).unwrap();
        let url = handler(json!({
            "projectId": 42,
            "secret": SECRET,
            "filename": "diagram.png"
        }))
        .unwrap();
        assert!(url.starts_with("https://gitlab.example.com/api/v4/projects/42/"));
        assert!(url.ends_with("?access_token=tok123"));

        let err = handler(json!({ "projectId": 42, "secret": "short", "filename": "x" })).unwrap_err();
        assert!(err.mentions("secret"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = input_schema();
        assert_eq!(schema["required"], json!(["projectId", "secret", "filename"]));
        assert_eq!(schema["properties"]["secret"]["minLength"], json!(32));
    }
}
