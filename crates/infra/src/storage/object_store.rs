//! [`DocumentStore`] over the `object_store` crate
//!
//! Local filesystem puts go through a staging file and a rename, and S3
//! puts are atomic per object, so readers never see a partial document.

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use clout_core::DocumentStore;
use clout_domain::{CloutError, Result, StorageBackend};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::{debug, info};

use crate::errors::InfraError;

#[derive(Clone)]
pub struct ObjectDocumentStore {
    inner: Arc<dyn ObjectStore>,
    /// Whether the backend accepts a content-type attribute on put.
    content_types: bool,
    label: &'static str,
}

impl std::fmt::Debug for ObjectDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDocumentStore").field("backend", &self.label).finish_non_exhaustive()
    }
}

impl ObjectDocumentStore {
    /// # Errors
    /// Returns `CloutError::Config` or `CloutError::Storage` if the backend
    /// cannot be initialised.
    pub fn from_backend(backend: &StorageBackend) -> Result<Self> {
        match backend {
            StorageBackend::S3 { bucket, region } => Self::s3(bucket, region.as_deref()),
            StorageBackend::Local { root } => Self::local(root),
            StorageBackend::Memory => Ok(Self::in_memory()),
        }
    }

    /// Process-local store; nothing survives the process.
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(InMemory::new()), content_types: true, label: "memory" }
    }

    /// # Errors
    /// Fails if `root` cannot be created or opened.
    pub fn local(root: &FsPath) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|err| {
            CloutError::Storage(format!("cannot create storage dir {}: {err}", root.display()))
        })?;
        let fs = LocalFileSystem::new_with_prefix(root).map_err(|err| CloutError::from(InfraError::from(err)))?;
        info!(root = %root.display(), "using local filesystem storage");
        Ok(Self { inner: Arc::new(fs), content_types: false, label: "local" })
    }

    /// S3 bucket, with credentials from the standard AWS environment.
    ///
    /// # Errors
    /// Fails if the client cannot be configured.
    #[cfg(feature = "aws")]
    pub fn s3(bucket: &str, region: Option<&str>) -> Result<Self> {
        let mut builder = object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        let s3 = builder.build().map_err(|err| CloutError::from(InfraError::from(err)))?;
        info!(bucket, region = region.unwrap_or("default"), "using S3 storage");
        Ok(Self { inner: Arc::new(s3), content_types: true, label: "s3" })
    }

    /// # Errors
    /// Always fails; this build has no S3 support.
    #[cfg(not(feature = "aws"))]
    pub fn s3(bucket: &str, _region: Option<&str>) -> Result<Self> {
        Err(CloutError::Config(format!(
            "S3 bucket {bucket} configured but this build lacks the `aws` feature"
        )))
    }

    /// Wrap an arbitrary store.
    pub fn with_store(inner: Arc<dyn ObjectStore>, content_types: bool) -> Self {
        Self { inner, content_types, label: "custom" }
    }

    /// Backend name for logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    fn location(key: &str) -> Result<Path> {
        Path::parse(key).map_err(|err| CloutError::InvalidInput(format!("invalid storage key {key:?}: {err}")))
    }
}

#[async_trait]
impl DocumentStore for ObjectDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let location = Self::location(key)?;
        let result = match self.inner.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(key, "object not found");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };
        let bytes = result.bytes().await.map_err(|err| CloutError::from(InfraError::from(err)))?;
        debug!(key, bytes = bytes.len(), "read object");
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let location = Self::location(key)?;
        let size = body.len();

        let mut options = PutOptions::default();
        if self.content_types {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, AttributeValue::from(content_type.to_string()));
            options.attributes = attributes;
        }

        self.inner
            .put_opts(&location, PutPayload::from(body), options)
            .await
            .map_err(|err| CloutError::from(InfraError::from(err)))?;
        debug!(key, bytes = size, content_type, "wrote object");
        Ok(())
    }
}
