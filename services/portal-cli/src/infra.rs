use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use registration_portal::auth::AuthService;
use registration_portal::config::AppConfig;
use registration_portal::error::AppError;
use registration_portal::gateway::HttpPortalClient;
use registration_portal::session::FileSessionStore;
use registration_portal::telemetry;
use registration_portal::workflows::registration::{Attachment, AttachmentKind, Attachments};
use tracing::debug;

/// Everything a command needs, built once from the environment.
pub(crate) struct Context {
    pub(crate) config: AppConfig,
    pub(crate) client: Arc<HttpPortalClient>,
    pub(crate) store: Arc<FileSessionStore>,
}

impl Context {
    pub(crate) fn load() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;

        let client = Arc::new(HttpPortalClient::new(config.api.clone())?);
        let store = Arc::new(FileSessionStore::new(config.session.dir.clone()));
        debug!(
            environment = ?config.environment,
            api = %config.api.base_url,
            session_dir = %config.session.dir.display(),
            "portal client configured"
        );

        Ok(Self {
            config,
            client,
            store,
        })
    }

    pub(crate) fn auth(&self) -> AuthService<HttpPortalClient, FileSessionStore> {
        AuthService::new(self.client.clone(), self.store.clone())
    }
}

/// Read one trimmed line from stdin after printing `label`.
pub(crate) async fn prompt(label: &str) -> Result<String, AppError> {
    let label = label.to_string();
    let line = tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{label}")?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::Other, err)))??;

    Ok(line.trim().to_string())
}

pub(crate) async fn confirm(question: &str) -> Result<bool, AppError> {
    let answer = prompt(&format!("{question} [y/N] ")).await?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Load an upload from disk. Only PDFs are accepted.
pub(crate) fn load_attachment(kind: AttachmentKind, path: &Path) -> Result<Attachment, AppError> {
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    if content_type != mime_guess::mime::APPLICATION_PDF {
        return Err(AppError::Input(format!(
            "{} must be a PDF, got {}",
            path.display(),
            content_type.essence_str()
        )));
    }

    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{kind}.pdf"));
    debug!(%kind, file = %file_name, size = bytes.len(), "attachment loaded");
    Ok(Attachment::new(file_name, content_type, bytes))
}

/// Uploads given on the command line; missing ones are left for validation to report.
pub(crate) fn load_attachments(
    documents: [(AttachmentKind, Option<&Path>); 3],
) -> Result<Attachments, AppError> {
    let mut attachments = Attachments::new();
    for (kind, path) in documents {
        if let Some(path) = path {
            attachments.insert(kind, load_attachment(kind, path)?);
        }
    }
    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_uploads_keep_their_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("my-pan.pdf");
        fs::write(&path, b"%PDF-1.4").expect("write pdf");

        let attachment = load_attachment(AttachmentKind::Pan, &path).expect("pdf accepted");
        assert_eq!(attachment.file_name, "my-pan.pdf");
        assert_eq!(attachment.content_type, mime_guess::mime::APPLICATION_PDF);
        assert_eq!(attachment.size(), 8);
    }

    #[test]
    fn non_pdf_uploads_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sign.png");
        fs::write(&path, b"\x89PNG").expect("write png");

        match load_attachment(AttachmentKind::Signature, &path) {
            Err(AppError::Input(message)) => assert!(message.contains("must be a PDF")),
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn absent_documents_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aadhaar.pdf");
        fs::write(&path, b"%PDF-1.4").expect("write pdf");

        let attachments = load_attachments([
            (AttachmentKind::Pan, None),
            (AttachmentKind::Aadhaar, Some(path.as_path())),
            (AttachmentKind::Signature, None),
        ])
        .expect("loads");
        assert_eq!(
            attachments.keys().copied().collect::<Vec<_>>(),
            vec![AttachmentKind::Aadhaar]
        );
    }
}
