//! Render Worker - Background Render Job Processor

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::application::error::{JobFailure, PipelineError};
use crate::application::ports::{ArtifactStoragePort, JobManagerPort, JobState};
use crate::application::services::{NarrationPipeline, RenderRequest};
use crate::infrastructure::events::{EventPublisher, JobProgressReporter};

/// Worker 配置
#[derive(Debug, Clone)]
pub struct RenderWorkerConfig {
    /// 最大并发任务数
    pub max_concurrent_jobs: usize,
}

impl Default for RenderWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
        }
    }
}

/// 渲染 Worker
///
/// 后台任务处理器，从队列消费 job_id 并在任务的取消令牌下执行流水线
pub struct RenderWorker {
    config: RenderWorkerConfig,
    queue_receiver: mpsc::Receiver<String>,
    job_manager: Arc<dyn JobManagerPort>,
    pipeline: Arc<NarrationPipeline>,
    /// 丢弃已上传的成品
    storage: Arc<dyn ArtifactStoragePort>,
    event_publisher: Arc<EventPublisher>,
}

impl RenderWorker {
    pub fn new(
        config: RenderWorkerConfig,
        queue_receiver: mpsc::Receiver<String>,
        job_manager: Arc<dyn JobManagerPort>,
        pipeline: Arc<NarrationPipeline>,
        storage: Arc<dyn ArtifactStoragePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            job_manager,
            pipeline,
            storage,
            event_publisher,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "RenderWorker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));

        while let Some(job_id) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    break;
                }
            };

            let job_manager = self.job_manager.clone();
            let pipeline = self.pipeline.clone();
            let storage = self.storage.clone();
            let event_publisher = self.event_publisher.clone();

            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成
                Self::process_job(&job_id, job_manager, pipeline, storage, event_publisher).await;
            });
        }

        tracing::info!("RenderWorker stopped");
    }

    /// 处理单个任务
    async fn process_job(
        job_id: &str,
        job_manager: Arc<dyn JobManagerPort>,
        pipeline: Arc<NarrationPipeline>,
        storage: Arc<dyn ArtifactStoragePort>,
        event_publisher: Arc<EventPublisher>,
    ) {
        let job = match job_manager.get_job(job_id) {
            Some(job) => job,
            None => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return;
            }
        };

        if job_manager.is_cancelled(job_id) {
            tracing::debug!(job_id = %job_id, "Job cancelled before start, skipping");
            event_publisher.publish_job_cancelled(job_id);
            return;
        }

        let Some(cancel) = job_manager.cancellation_token(job_id) else {
            tracing::warn!(job_id = %job_id, "Job has no cancellation token, skipping");
            return;
        };

        if let Err(e) = job_manager.set_state(job_id, JobState::Running) {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to mark job running");
            return;
        }

        let request = RenderRequest::from(&job);
        let reporter = JobProgressReporter::new(job_manager.clone(), event_publisher.clone());

        match pipeline.run(&request, &cancel, &reporter).await {
            Ok(result) => match job_manager.set_completed(job_id, result.clone()) {
                Ok(()) => {
                    tracing::info!(
                        job_id = %job_id,
                        url = %result.url,
                        duration_ms = result.duration_ms,
                        paragraphs = result.paragraphs,
                        "Render job completed"
                    );
                    event_publisher.publish_job_completed(job_id, &result);
                }
                Err(e) => {
                    // 上传期间被取消，成品不能继续可访问
                    tracing::info!(job_id = %job_id, error = %e, "Render result discarded");
                    if let Err(e) = storage.delete(&result.path).await {
                        tracing::warn!(
                            job_id = %job_id,
                            path = %result.path,
                            error = %e,
                            "Failed to delete discarded artifact"
                        );
                    }
                    if job_manager.is_cancelled(job_id) {
                        event_publisher.publish_job_cancelled(job_id);
                    }
                }
            },
            Err(PipelineError::Cancelled) => {
                tracing::info!(job_id = %job_id, "Render job cancelled");
                event_publisher.publish_job_cancelled(job_id);
            }
            Err(err) => {
                let failure = JobFailure::from(&err);
                tracing::error!(
                    job_id = %job_id,
                    stage = failure.stage.as_str(),
                    paragraph = ?failure.paragraph_index,
                    error = %err,
                    "Render job failed"
                );
                match job_manager.set_failed(job_id, failure.clone()) {
                    Ok(()) => event_publisher.publish_job_failed(job_id, &failure),
                    Err(e) => tracing::debug!(job_id = %job_id, error = %e, "Failure not recorded"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::PipelineStage;
    use crate::application::ports::{AudioFormat, RenderJob};
    use crate::application::services::test_support::*;
    use crate::application::services::{
        MusicResolver, MusicResolverConfig, PipelineConfig, RetryPolicy,
    };
    use crate::domain::FixedRandomSource;
    use crate::infrastructure::events::WsEvent;
    use crate::infrastructure::memory::InMemoryJobManager;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const RATE: u32 = 8000;

    struct Setup {
        manager: Arc<InMemoryJobManager>,
        events: broadcast::Receiver<WsEvent>,
        storage: MemoryArtifactStorage,
    }

    fn start() -> Setup {
        start_with(MemoryArtifactStorage::default())
    }

    fn start_with(storage: MemoryArtifactStorage) -> Setup {
        let (tx, rx) = mpsc::channel(16);
        let manager = Arc::new(InMemoryJobManager::new(tx));
        let assets = Arc::new(
            MemoryAssetStore::default()
                .with_asset("fallback.mp3", encode_raw(&tone(2.0, 1.0, RATE, 1))),
        );
        let resolver = Arc::new(MusicResolver::new(
            assets.clone(),
            Arc::new(FixedRandomSource(0)),
            MusicResolverConfig::default(),
        ));
        let fast = RetryPolicy {
            max_attempts: 2,
            timeout: Duration::from_secs(2),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let pipeline = NarrationPipeline::new(
            PipelineConfig {
                gap_secs: 0.5,
                tts_retry: fast,
                classifier_retry: fast,
                ..Default::default()
            },
            Arc::new(ScriptedClassifier::default()),
            Arc::new(ScriptedTts::new(RATE, 1)),
            resolver,
            assets,
            Arc::new(RawCodec),
            Arc::new(storage.clone()),
        );
        let publisher = Arc::new(EventPublisher::new());
        let events = publisher.subscribe();

        let worker = RenderWorker::new(
            RenderWorkerConfig::default(),
            rx,
            manager.clone(),
            Arc::new(pipeline),
            Arc::new(storage.clone()),
            publisher,
        );
        tokio::spawn(worker.run());

        Setup {
            manager,
            events,
            storage,
        }
    }

    fn submit(manager: &InMemoryJobManager, text: &str) -> String {
        manager
            .submit(RenderJob::new(
                "t".to_string(),
                text.to_string(),
                "narrator".to_string(),
                AudioFormat::Wav,
                2,
            ))
            .unwrap()
    }

    async fn terminal_event(events: &mut broadcast::Receiver<WsEvent>) -> WsEvent {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match events.recv().await.unwrap() {
                    e @ (WsEvent::JobCompleted { .. }
                    | WsEvent::JobFailed { .. }
                    | WsEvent::JobCancelled { .. }) => return e,
                    _ => continue,
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_job_completes() {
        let mut setup = start();
        let job_id = submit(&setup.manager, "First part.$Second part.");

        let event = terminal_event(&mut setup.events).await;
        assert!(matches!(event, WsEvent::JobCompleted { .. }));

        let job = setup.manager.get_job(&job_id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.completed_paragraphs, 2);
        let result = job.result.unwrap();
        // 1s + 0.5s + 1s
        assert_eq!(result.duration_ms, 2500);
        assert!(setup
            .storage
            .artifacts
            .contains_key(&format!("renders/{}.wav", job_id)));
    }

    #[tokio::test]
    async fn test_job_failure_names_paragraph() {
        let mut setup = start();
        let job_id = submit(&setup.manager, "Fine.$Broken !tts-fail.");

        let event = terminal_event(&mut setup.events).await;
        assert!(matches!(event, WsEvent::JobFailed { .. }));

        let failure = setup.manager.get_job(&job_id).unwrap().failure.unwrap();
        assert_eq!(failure.stage, PipelineStage::Synthesis);
        assert_eq!(failure.paragraph_index, Some(1));
        assert!(setup.storage.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_running_job() {
        let mut setup = start();
        let job_id = submit(&setup.manager, "Takes forever !slow.");

        // 等到任务开始
        tokio::time::timeout(Duration::from_secs(5), async {
            while setup.manager.get_state(&job_id) != Some(JobState::Running) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(setup.manager.cancel(&job_id));
        let event = terminal_event(&mut setup.events).await;
        assert_eq!(
            event,
            WsEvent::JobCancelled {
                job_id: job_id.clone()
            }
        );
        assert_eq!(setup.manager.get_state(&job_id), Some(JobState::Cancelled));
        assert!(setup.storage.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_upload_removes_artifact() {
        let mut setup = start_with(MemoryArtifactStorage {
            store_delay: Duration::from_millis(300),
            ..Default::default()
        });
        let job_id = submit(&setup.manager, "Quick one.");
        let path = format!("renders/{}.wav", job_id);

        // 成品已写入但上传尚未返回
        tokio::time::timeout(Duration::from_secs(5), async {
            while !setup.storage.artifacts.contains_key(&path) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(setup.manager.cancel(&job_id));
        let event = terminal_event(&mut setup.events).await;
        assert_eq!(
            event,
            WsEvent::JobCancelled {
                job_id: job_id.clone()
            }
        );

        let job = setup.manager.get_job(&job_id).unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert!(job.result.is_none());
        assert!(!setup.storage.artifacts.contains_key(&path));
    }
}
