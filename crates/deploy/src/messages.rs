//! User-facing messages.
//!
//! Messages are structured values (a key plus named parameters). Rendering
//! goes through an injected [`MessageFormatter`]; [`Catalog`] is the built-in
//! one with English and Simplified Chinese tables.

use sitepush_api::Error as ApiError;

use crate::error::DeployError;

/// Every message the deploy flow and its host can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    VerifySite,
    ScanFiles,
    CreateDeploy,
    UploadFile { uploaded: usize, total: usize },
    Finish,
    Wait,
    DeployDone { url: String },
    DeployStillProcessing { url: String },

    TokenSaved,
    TokenCleared,
    TokenRequired,
    FolderSelected { path: String },
    SiteSelected { name: String },
    SiteCreated { name: String },
    SiteCreatedAdjusted { name: String },
    SiteNameInvalid,
    SiteNameTaken,
    NoSites,

    CredentialInvalid,
    ApiError {
        status: u16,
        status_text: String,
        detail: String,
    },
    RequestFailed { detail: String },
    EmptyDir,
    MissingFile { file: String },
    DeployProcessingFailed,
    ReadFailed { detail: String },
    NeedCredential,
    NeedFolder,
    NeedSite,
    Cancelled,
    DeployFailed { detail: String },
}

impl Message {
    /// Stable lookup key of this message.
    pub fn key(&self) -> &'static str {
        match self {
            Self::VerifySite => "progress.verifySite",
            Self::ScanFiles => "progress.scanFiles",
            Self::CreateDeploy => "progress.createDeploy",
            Self::UploadFile { .. } => "progress.uploadFile",
            Self::Finish => "progress.finish",
            Self::Wait => "progress.wait",
            Self::DeployDone { .. } => "info.deploy.done",
            Self::DeployStillProcessing { .. } => "info.deploy.processing",
            Self::TokenSaved => "info.pat.saved",
            Self::TokenCleared => "info.pat.cleared",
            Self::TokenRequired => "input.pat.required",
            Self::FolderSelected { .. } => "info.folder.selected",
            Self::SiteSelected { .. } => "info.site.selected",
            Self::SiteCreated { .. } => "info.site.created",
            Self::SiteCreatedAdjusted { .. } => "info.site.created.adjusted",
            Self::SiteNameInvalid => "input.site.validate",
            Self::SiteNameTaken => "error.site.name.taken",
            Self::NoSites => "warn.noSites",
            Self::CredentialInvalid => "error.pat.invalid",
            Self::ApiError { .. } => "error.api",
            Self::RequestFailed { .. } => "error.request",
            Self::EmptyDir => "error.emptyDir",
            Self::MissingFile { .. } => "error.missingFile",
            Self::DeployProcessingFailed => "error.deploy.processing",
            Self::ReadFailed { .. } => "error.read",
            Self::NeedCredential => "warn.needPat",
            Self::NeedFolder => "warn.needFolder",
            Self::NeedSite => "warn.needSite",
            Self::Cancelled => "warn.cancelled",
            Self::DeployFailed { .. } => "error.deploy.failed",
        }
    }

    /// Named parameters substituted into the template.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::UploadFile { uploaded, total } => vec![
                ("uploaded", uploaded.to_string()),
                ("total", total.to_string()),
            ],
            Self::DeployDone { url } | Self::DeployStillProcessing { url } => {
                vec![("url", url.clone())]
            }
            Self::FolderSelected { path } => vec![("path", path.clone())],
            Self::SiteSelected { name }
            | Self::SiteCreated { name }
            | Self::SiteCreatedAdjusted { name } => vec![("name", name.clone())],
            Self::ApiError {
                status,
                status_text,
                detail,
            } => vec![
                ("status", status.to_string()),
                ("statusText", status_text.clone()),
                ("detail", detail.clone()),
            ],
            Self::RequestFailed { detail }
            | Self::ReadFailed { detail }
            | Self::DeployFailed { detail } => vec![("detail", detail.clone())],
            Self::MissingFile { file } => vec![("file", file.clone())],
            _ => Vec::new(),
        }
    }

    /// Maps an error to the message shown for it.
    pub fn from_error(error: &DeployError) -> Self {
        match error {
            DeployError::Api(ApiError::CredentialInvalid) => Self::CredentialInvalid,
            DeployError::Api(ApiError::Api {
                status,
                status_text,
                detail,
            }) => Self::ApiError {
                status: *status,
                status_text: status_text.clone(),
                detail: detail.clone(),
            },
            DeployError::Api(other) => Self::RequestFailed {
                detail: other.to_string(),
            },
            DeployError::EmptyDeploy => Self::EmptyDir,
            DeployError::MissingFile { entry } => Self::MissingFile {
                file: entry.clone(),
            },
            DeployError::DeployFailed { .. } => Self::DeployProcessingFailed,
            DeployError::Io(e) => Self::ReadFailed {
                detail: e.to_string(),
            },
            DeployError::Manifest(e) => Self::ReadFailed {
                detail: e.to_string(),
            },
            DeployError::NoCredential => Self::NeedCredential,
            DeployError::NoFolderSelected => Self::NeedFolder,
            DeployError::NoSiteSelected => Self::NeedSite,
            DeployError::Cancelled => Self::Cancelled,
            DeployError::Task(e) => Self::DeployFailed {
                detail: e.to_string(),
            },
        }
    }
}

/// Renders messages to display text.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, message: &Message) -> String;
}

/// Supported display languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl Locale {
    /// Maps a language tag (`zh_CN.UTF-8`, `en-US`, ...) to a locale.
    pub fn detect(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Self::ZhCn
        } else {
            Self::En
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::ZhCn => "zh-CN",
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::En => EN,
            Self::ZhCn => ZH_CN,
        }
    }
}

const EN: &[(&str, &str)] = &[
    ("progress.verifySite", "Verifying site..."),
    ("progress.scanFiles", "Scanning files..."),
    ("progress.createDeploy", "Creating deploy..."),
    ("progress.uploadFile", "Uploading files ({uploaded}/{total})"),
    ("progress.finish", "Finalizing deploy..."),
    ("progress.wait", "Waiting for deploy to finish processing..."),
    ("info.deploy.done", "Deploy complete: {url}"),
    (
        "info.deploy.processing",
        "Deploy is still processing; it should be live shortly at {url}",
    ),
    ("info.pat.saved", "Access token saved."),
    ("info.pat.cleared", "Access token cleared."),
    ("input.pat.required", "The access token must not be empty."),
    ("info.folder.selected", "Deploy folder set to {path}"),
    ("info.site.selected", "Selected site: {name}"),
    ("info.site.created", "Created site: {name}"),
    (
        "info.site.created.adjusted",
        "Site created, but the remote adjusted its name to {name}",
    ),
    ("input.site.validate", "Site names may only contain letters and digits."),
    ("error.site.name.taken", "That site name is already taken."),
    ("warn.noSites", "No sites found for this account."),
    (
        "error.pat.invalid",
        "The access token is invalid or expired. Log in again with a new token.",
    ),
    ("error.api", "API error {status} {statusText}: {detail}"),
    ("error.request", "Request failed: {detail}"),
    ("error.emptyDir", "The selected folder has no files to deploy."),
    ("error.missingFile", "File requested by the remote was not found locally: {file}"),
    ("error.deploy.processing", "The remote failed to process the deploy."),
    ("error.read", "Could not read local files: {detail}"),
    ("warn.needPat", "No access token configured. Run `login` first."),
    ("warn.needFolder", "No deploy folder selected."),
    ("warn.needSite", "No site selected."),
    ("warn.cancelled", "Deploy cancelled."),
    ("error.deploy.failed", "Deploy failed: {detail}"),
];

const ZH_CN: &[(&str, &str)] = &[
    ("progress.verifySite", "正在验证站点..."),
    ("progress.scanFiles", "正在扫描文件..."),
    ("progress.createDeploy", "正在创建部署..."),
    ("progress.uploadFile", "正在上传文件 ({uploaded}/{total})"),
    ("progress.finish", "正在完成部署..."),
    ("progress.wait", "等待部署处理完成..."),
    ("info.deploy.done", "部署完成：{url}"),
    ("info.deploy.processing", "部署仍在处理中，稍后可访问 {url}"),
    ("info.pat.saved", "访问令牌已保存。"),
    ("info.pat.cleared", "访问令牌已清除。"),
    ("input.pat.required", "访问令牌不能为空。"),
    ("info.folder.selected", "部署目录已设置为 {path}"),
    ("info.site.selected", "已选择站点：{name}"),
    ("info.site.created", "已创建站点：{name}"),
    ("info.site.created.adjusted", "站点已创建，但名称被调整为 {name}"),
    ("input.site.validate", "站点名称只能包含字母和数字。"),
    ("error.site.name.taken", "该站点名称已被占用。"),
    ("warn.noSites", "该账户下没有站点。"),
    ("error.pat.invalid", "访问令牌无效或已过期，请重新登录。"),
    ("error.api", "API 错误 {status} {statusText}：{detail}"),
    ("error.request", "请求失败：{detail}"),
    ("error.emptyDir", "所选目录中没有可部署的文件。"),
    ("error.missingFile", "本地找不到远端要求的文件：{file}"),
    ("error.deploy.processing", "远端处理部署失败。"),
    ("error.read", "读取本地文件失败：{detail}"),
    ("warn.needPat", "尚未配置访问令牌，请先运行 `login`。"),
    ("warn.needFolder", "尚未选择部署目录。"),
    ("warn.needSite", "尚未选择站点。"),
    ("warn.cancelled", "部署已取消。"),
    ("error.deploy.failed", "部署失败：{detail}"),
];

/// Built-in message tables.
///
/// Lookup falls back to English, then to the raw key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    locale: Locale,
}

impl Catalog {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn template(&self, key: &'static str) -> &'static str {
        lookup(self.locale.table(), key)
            .or_else(|| lookup(EN, key))
            .unwrap_or(key)
    }
}

impl MessageFormatter for Catalog {
    fn format(&self, message: &Message) -> String {
        fill_template(self.template(message.key()), &message.params())
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Replaces `{name}` placeholders; unknown names are left as written.
pub fn fill_template(template: &str, params: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        if name_len > 0 && after[name_len..].starts_with('}') {
            match params.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[name_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}
