//! Asset loading: url resolution and background glTF decoding.

pub mod gltf;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;

use futures::channel::oneshot;
use log::debug;

use crate::error::LoadError;
use crate::scene::SceneSubgraph;

pub use self::gltf::load_gltf_file;

/// Resolves model urls against an asset directory and decodes them
///
/// The loader holds no per-load state and can be reused for any number of
/// loads, including concurrent ones.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a url onto the filesystem
    ///
    /// `/models/a.glb` and `models/a.glb` both resolve under the asset root;
    /// `file://` urls are taken as absolute paths.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, LoadError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if url.contains("://") {
            return Err(LoadError::UnsupportedScheme {
                url: url.to_string(),
            });
        }
        Ok(self.root.join(url.trim_start_matches('/')))
    }

    /// Decode on a worker thread; the task resolves with the subgraph
    pub fn load(&self, url: &str) -> LoadTask {
        let url = url.to_string();
        let path = match self.resolve(&url) {
            Ok(path) => path,
            Err(err) => return LoadTask::ready(url, Err(err)),
        };

        let (sender, receiver) = oneshot::channel();
        let worker_url = url.clone();
        thread::spawn(move || {
            let result = load_gltf_file(&path, &worker_url);
            // the receiver may already be gone; nothing to report then
            let _ = sender.send(result);
        });

        debug!("Loading {}", url);
        LoadTask {
            url,
            state: TaskState::Waiting(receiver),
        }
    }

    /// Decode on the calling thread
    pub fn load_blocking(&self, url: &str) -> Result<SceneSubgraph, LoadError> {
        let path = self.resolve(url)?;
        load_gltf_file(&path, url)
    }
}

enum TaskState {
    Waiting(oneshot::Receiver<Result<SceneSubgraph, LoadError>>),
    Ready(Option<Result<SceneSubgraph, LoadError>>),
}

/// A model load in flight
///
/// Await it, or poll it without blocking from a tick loop with
/// [`LoadTask::poll_ready`]. The result is handed out once.
pub struct LoadTask {
    url: String,
    state: TaskState,
}

impl LoadTask {
    fn ready(url: String, result: Result<SceneSubgraph, LoadError>) -> Self {
        Self {
            url,
            state: TaskState::Ready(Some(result)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Take the result if the load has finished
    pub fn poll_ready(&mut self) -> Option<Result<SceneSubgraph, LoadError>> {
        match &mut self.state {
            TaskState::Ready(result) => result.take(),
            TaskState::Waiting(receiver) => match receiver.try_recv() {
                Ok(Some(result)) => {
                    self.state = TaskState::Ready(None);
                    Some(result)
                }
                Ok(None) => None,
                Err(oneshot::Canceled) => {
                    self.state = TaskState::Ready(None);
                    Some(Err(LoadError::Cancelled {
                        url: self.url.clone(),
                    }))
                }
            },
        }
    }
}

impl Future for LoadTask {
    type Output = Result<SceneSubgraph, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let url = self.url.clone();
        match &mut self.state {
            TaskState::Ready(result) => match result.take() {
                Some(result) => Poll::Ready(result),
                None => Poll::Ready(Err(LoadError::Cancelled { url })),
            },
            TaskState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(result)) => {
                    self.state = TaskState::Ready(None);
                    Poll::Ready(result)
                }
                Poll::Ready(Err(oneshot::Canceled)) => {
                    self.state = TaskState::Ready(None);
                    Poll::Ready(Err(LoadError::Cancelled { url }))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
