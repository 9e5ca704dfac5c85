// src/services/storage.rs

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;

/// Armazenamento opaco de arquivos: recebe bytes, devolve uma URL pública.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, AppError>;
}

// Extensões aceitas para fotos de check-in e anexos
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "pdf"];

pub fn normalize_extension(raw: &str) -> Result<String, AppError> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::invalid("file", "tipo de arquivo não suportado"))
    }
}

/// Extensão a partir do nome original do arquivo (`foto.JPG` → `jpg`).
pub fn extension_of(file_name: Option<&str>) -> Option<String> {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_string())
}

// Disco local, servido estaticamente em `public_prefix`
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::invalid("file", "arquivo vazio"));
        }
        let ext = normalize_extension(extension)?;
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao criar diretório de uploads: {}", e))?;
        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao gravar upload: {}", e))?;

        tracing::info!("📎 Arquivo salvo: {}", file_name);
        Ok(format!("{}/{}", self.public_prefix, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_normalized_and_checked() {
        assert_eq!(normalize_extension(".JPG").unwrap(), "jpg");
        assert!(normalize_extension("exe").is_err());
        assert_eq!(extension_of(Some("selfie.png")).as_deref(), Some("png"));
        assert_eq!(extension_of(Some("semextensao")), None);
    }

    #[tokio::test]
    async fn local_store_writes_file_and_returns_public_url() {
        let dir = std::env::temp_dir().join(format!("salesflow-blob-{}", Uuid::new_v4()));
        let store = LocalBlobStore::new(&dir, "/uploads/");

        let url = store.put(b"\x89PNG", "png").await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let name = url.trim_start_matches("/uploads/");
        let saved = tokio::fs::read(dir.join(name)).await.unwrap();
        assert_eq!(saved, b"\x89PNG");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let store = LocalBlobStore::new(std::env::temp_dir(), "/uploads");
        assert!(store.put(b"", "jpg").await.is_err());
    }
}
