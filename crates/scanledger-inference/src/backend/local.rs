//! In-process model runtime.
//!
//! The model itself is a capability supplied by the host through
//! [`LocalModelLoader`]. This module owns the process-wide handle: the model
//! is loaded lazily on first use, exactly once, and every generation runs
//! under a mutex on the blocking thread pool, since one loaded model context
//! cannot serve two generations at the same time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use super::{ChatBackend, ChatRequest};
use crate::{InferenceError, Result};

/// A loaded model context. Generation is blocking and CPU/GPU bound.
pub trait LocalModel: Send {
    fn generate(&mut self, request: &ChatRequest) -> Result<String>;
}

/// Loads a model file into memory.
pub trait LocalModelLoader: Send + Sync {
    fn load(&self, model_path: &Path) -> Result<Box<dyn LocalModel>>;
}

type SharedModel = Arc<Mutex<Box<dyn LocalModel>>>;

/// Process-scoped handle to a lazily loaded local model.
pub struct LocalRuntime {
    loader: Arc<dyn LocalModelLoader>,
    model: OnceCell<(PathBuf, SharedModel)>,
}

impl LocalRuntime {
    pub fn new(loader: Arc<dyn LocalModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn handle(&self, model_path: &Path) -> Result<SharedModel> {
        let (loaded_path, model) = self
            .model
            .get_or_try_init(|| async {
                if !model_path.exists() {
                    return Err(InferenceError::NotConfigured(format!(
                        "local model file not found: {}",
                        model_path.display()
                    )));
                }

                let loader = Arc::clone(&self.loader);
                let path = model_path.to_path_buf();
                let model = tokio::task::spawn_blocking(move || loader.load(&path))
                    .await
                    .map_err(|e| InferenceError::Failed(format!("model load task failed: {}", e)))??;

                info!("Loaded local model from {}", model_path.display());
                Ok((model_path.to_path_buf(), Arc::new(Mutex::new(model))))
            })
            .await?;

        if loaded_path != model_path {
            return Err(InferenceError::NotConfigured(format!(
                "local model already loaded from {}, restart to use {}",
                loaded_path.display(),
                model_path.display()
            )));
        }

        Ok(Arc::clone(model))
    }

    /// Run one generation. Calls queue on the model mutex.
    pub async fn generate(&self, model_path: &Path, request: ChatRequest) -> Result<String> {
        let model = self.handle(model_path).await?;
        let mut guard = model.lock_owned().await;

        // The guard moves into the blocking task, so the lock is held until
        // generation finishes even if the caller stops waiting.
        tokio::task::spawn_blocking(move || guard.generate(&request))
            .await
            .map_err(|e| InferenceError::Failed(format!("generation task failed: {}", e)))?
    }
}

/// [`ChatBackend`] adapter over a shared [`LocalRuntime`].
pub struct LocalBackend {
    runtime: Arc<LocalRuntime>,
    model_path: PathBuf,
}

impl LocalBackend {
    pub fn new(runtime: Arc<LocalRuntime>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            model_path: model_path.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.runtime.generate(&self.model_path, request.clone()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echo model that fails loudly if two generations overlap.
    pub(crate) struct EchoModel {
        busy: Arc<AtomicBool>,
        reply: String,
    }

    impl LocalModel for EchoModel {
        fn generate(&mut self, _request: &ChatRequest) -> Result<String> {
            if self.busy.swap(true, Ordering::SeqCst) {
                return Err(InferenceError::Failed("concurrent generation".to_string()));
            }
            std::thread::sleep(Duration::from_millis(20));
            self.busy.store(false, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    pub(crate) struct CountingLoader {
        pub loads: AtomicUsize,
        pub reply: String,
    }

    impl CountingLoader {
        pub(crate) fn new(reply: &str) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                reply: reply.to_string(),
            }
        }
    }

    impl LocalModelLoader for CountingLoader {
        fn load(&self, _model_path: &Path) -> Result<Box<dyn LocalModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoModel {
                busy: Arc::new(AtomicBool::new(false)),
                reply: self.reply.clone(),
            }))
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            system: "s".to_string(),
            user: "u".to_string(),
            max_tokens: 8,
            temperature: 0.0,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_loads_once_and_serializes() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.gguf");
        std::fs::write(&model_path, b"weights").unwrap();

        let loader = Arc::new(CountingLoader::new("hello"));
        let runtime = Arc::new(LocalRuntime::new(loader.clone()));
        assert!(!runtime.is_loaded());

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let runtime = Arc::clone(&runtime);
            let path = model_path.clone();
            tasks.push(tokio::spawn(async move { runtime.generate(&path, request()).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "hello");
        }

        assert!(runtime.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switching_model_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.gguf");
        let second = dir.path().join("second.gguf");
        std::fs::write(&first, b"weights").unwrap();
        std::fs::write(&second, b"weights").unwrap();

        let runtime = LocalRuntime::new(Arc::new(CountingLoader::new("hello")));
        assert_eq!(runtime.generate(&first, request()).await.unwrap(), "hello");

        let err = runtime.generate(&second, request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NotConfigured(_)), "{err}");
        assert_eq!(runtime.generate(&first, request()).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_missing_model_file_is_not_configured() {
        let runtime = LocalRuntime::new(Arc::new(CountingLoader::new("x")));
        let err = runtime
            .generate(Path::new("/definitely/not/here.gguf"), request())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::NotConfigured(_)));
        assert!(!runtime.is_loaded());
    }
}
