use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use speedtrim::adapters::{AppConfig, LocalArtifactStore};
use speedtrim::domain::model::{AudioPlan, EncodeJob};
use speedtrim::*;
use tempfile::TempDir;

/// Fake ports and a scratch workspace for driving the pipeline without ffmpeg
mod test_utils {
    use super::*;
    use async_trait::async_trait;
    use speedtrim::ports::{ConcatPort, EncodePort, ProbePort};

    pub struct FakeProbe {
        pub result: Result<MediaInfo, DomainError>,
        /// File names that fail analysis regardless of `result`
        pub unreadable: Vec<String>,
    }

    #[async_trait]
    impl ProbePort for FakeProbe {
        async fn probe(&self, path: &Path) -> Result<MediaInfo, DomainError> {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.unreadable.contains(&name) {
                return Err(DomainError::ProbeFailed(format!("{}: moov atom not found", name)));
            }
            self.result.clone()
        }
    }

    #[derive(Default)]
    pub struct FakeEncoder {
        pub fail_on: Option<usize>,
        pub skip_write_on: Option<usize>,
        pub panic_on: Option<usize>,
        pub delay: Option<Duration>,
        pub jobs: Mutex<Vec<EncodeJob>>,
        pub active: AtomicUsize,
        pub max_active: AtomicUsize,
    }

    #[async_trait]
    impl EncodePort for FakeEncoder {
        async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, DomainError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.jobs.lock().unwrap().push(job.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on == Some(job.range_index) {
                panic!("encoder crashed on range {}", job.range_index);
            }
            if self.fail_on == Some(job.range_index) {
                return Err(DomainError::EncodeFailed {
                    range_index: job.range_index,
                    stderr: "Invalid data found when processing input".to_string(),
                });
            }
            if self.skip_write_on != Some(job.range_index) {
                std::fs::write(&job.output, format!("range {}", job.range_index)).unwrap();
            }
            Ok(job.output.clone())
        }
    }

    #[derive(Default)]
    pub struct FakeConcat {
        pub calls: Mutex<Vec<(String, bool, PathBuf)>>,
    }

    #[async_trait]
    impl ConcatPort for FakeConcat {
        async fn concat(
            &self,
            manifest: &Path,
            has_audio: bool,
            output: &Path,
        ) -> Result<(), DomainError> {
            let content = std::fs::read_to_string(manifest).unwrap();
            std::fs::write(output, b"joined").unwrap();
            self.calls
                .lock()
                .unwrap()
                .push((content, has_audio, output.to_path_buf()));
            Ok(())
        }
    }

    pub fn media(duration: f64, has_audio: bool) -> MediaInfo {
        MediaInfo {
            duration,
            width: 320,
            height: 240,
            has_audio,
            ..MediaInfo::default()
        }
    }

    pub struct Harness {
        pub dir: TempDir,
        pub config: AppConfig,
        pub encoder: Arc<FakeEncoder>,
        pub concat: Arc<FakeConcat>,
        pub container: DefaultAppContainer,
    }

    impl Harness {
        pub fn new(probe: Result<MediaInfo, DomainError>, encoder: FakeEncoder) -> Self {
            Self::with_config(probe, encoder, |_| {})
        }

        pub fn with_config<F>(
            probe: Result<MediaInfo, DomainError>,
            encoder: FakeEncoder,
            configure: F,
        ) -> Self
        where
            F: FnOnce(&mut AppConfig),
        {
            let encoder = Arc::new(encoder);
            let encode_port = Arc::clone(&encoder) as Arc<dyn EncodePort>;
            Self::build(probe, encoder, encode_port, configure)
        }

        /// Harness whose encodes go through `encode_port` instead of the fake
        pub fn with_encode_port<F>(
            probe: Result<MediaInfo, DomainError>,
            encode_port: Arc<dyn EncodePort>,
            configure: F,
        ) -> Self
        where
            F: FnOnce(&mut AppConfig),
        {
            Self::build(probe, Arc::new(FakeEncoder::default()), encode_port, configure)
        }

        fn build<F>(
            probe: Result<MediaInfo, DomainError>,
            encoder: Arc<FakeEncoder>,
            encode_port: Arc<dyn EncodePort>,
            configure: F,
        ) -> Self
        where
            F: FnOnce(&mut AppConfig),
        {
            let dir = TempDir::new().unwrap();
            let mut config = AppConfig::default();
            config.paths.videos_dir = dir.path().join("videos");
            config.paths.processed_dir = dir.path().join("processed");
            config.paths.temp_dir = dir.path().join("temp");
            configure(&mut config);

            std::fs::create_dir_all(&config.paths.videos_dir).unwrap();
            std::fs::write(config.paths.videos_dir.join("in.mp4"), b"source").unwrap();

            let concat = Arc::new(FakeConcat::default());
            let container = DefaultAppContainer::with_ports(
                &config,
                Arc::new(FakeProbe {
                    result: probe,
                    unreadable: vec!["broken.MKV".to_string()],
                }),
                encode_port,
                Arc::clone(&concat) as Arc<dyn ConcatPort>,
                Arc::new(LocalArtifactStore::new()),
            );

            Self {
                dir,
                config,
                encoder,
                concat,
                container,
            }
        }

        pub fn interactor(&self) -> Arc<EditInteractor> {
            self.container.edit_interactor()
        }

        pub fn temp_file(&self, name: String) -> PathBuf {
            self.config.paths.temp_dir.join(name)
        }

        pub async fn submit(&self, segments: Vec<Segment>) -> TaskId {
            self.interactor()
                .submit(ProcessRequest::new("in.mp4", segments))
                .await
                .unwrap()
        }

        pub async fn wait(&self, id: &TaskId) -> TaskSnapshot {
            let interactor = self.interactor();
            for _ in 0..1000 {
                let snapshot = interactor.status(id).unwrap();
                if snapshot.status.is_terminal() {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("task {} did not finish", id);
        }
    }
}

use test_utils::*;

#[tokio::test]
async fn test_speed_segment_renders_three_ranges() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.progress, 100);
    assert!(snapshot.output_filename.starts_with("in_processed_"));
    assert!(snapshot.output_filename.ends_with(".mp4"));
    assert!(harness
        .config
        .paths
        .processed_dir
        .join(&snapshot.output_filename)
        .exists());

    let jobs = harness.encoder.jobs.lock().unwrap().clone();
    let spans: Vec<(f64, f64)> = jobs.iter().map(|j| (j.start, j.duration)).collect();
    assert_eq!(spans, vec![(0.0, 2.0), (2.0, 2.0), (4.0, 6.0)]);
    assert_eq!(jobs[0].audio, AudioPlan::Tempo(1.0));
    assert_eq!(jobs[1].audio, AudioPlan::Tempo(3.0));
    assert_eq!(jobs[1].settings.crf, 23);
}

#[tokio::test]
async fn test_trimmed_prefix_leaves_single_range() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let id = harness
        .submit(vec![
            Segment::trim(0.0, 5.0),
            Segment::with_speed(5.0, 10.0, 2.0),
        ])
        .await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let jobs = harness.encoder.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].start, 5.0);
    assert_eq!(jobs[0].duration, 5.0);
    assert_eq!(jobs[0].video_filter, "setpts=0.5*PTS");
}

#[tokio::test]
async fn test_concat_follows_timeline_order_and_cleans_up() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    // Submitted out of order; the timeline sorts them
    let id = harness
        .submit(vec![
            Segment::with_speed(6.0, 8.0, 2.0),
            Segment::with_speed(1.0, 3.0, 0.5),
        ])
        .await;
    let snapshot = harness.wait(&id).await;
    assert_eq!(snapshot.status, TaskStatus::Completed);

    let calls = harness.concat.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (manifest, has_audio, _) = &calls[0];
    assert!(*has_audio);

    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 5);
    for (index, line) in lines.iter().enumerate() {
        let expected = harness.temp_file(format!("segment_{}_{}.mp4", id, index));
        assert_eq!(*line, format!("file '{}'", expected.display()));
        assert!(!expected.exists());
    }
    assert!(!harness.temp_file(format!("concat_{}.txt", id)).exists());
}

#[tokio::test]
async fn test_encoder_failure_leaves_earlier_artifacts() {
    let encoder = FakeEncoder {
        fail_on: Some(1),
        ..FakeEncoder::default()
    };
    let harness = Harness::new(Ok(media(10.0, true)), encoder);
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error_code, Some(ErrorCode::EncodeFailed));
    let message = snapshot.error.unwrap();
    assert!(message.contains("FFmpeg error on range 1"));
    assert!(message.contains("Invalid data found"));
    assert!(snapshot.progress < 100);
    assert_eq!(snapshot.progress, 40);

    assert!(harness.temp_file(format!("segment_{}_0.mp4", id)).exists());
    assert!(harness.concat.calls.lock().unwrap().is_empty());
    assert_eq!(harness.encoder.jobs.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cleanup_on_error_removes_artifacts() {
    let encoder = FakeEncoder {
        fail_on: Some(1),
        ..FakeEncoder::default()
    };
    let harness = Harness::with_config(Ok(media(10.0, true)), encoder, |config| {
        config.pipeline.cleanup_on_error = true;
    });
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Error);
    assert!(!harness.temp_file(format!("segment_{}_0.mp4", id)).exists());
}

#[tokio::test]
async fn test_silent_source_joins_video_only() {
    let harness = Harness::new(Ok(media(6.0, false)), FakeEncoder::default());
    let id = harness.submit(vec![Segment::with_speed(0.0, 6.0, 2.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let jobs = harness.encoder.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].audio, AudioPlan::None);
    assert!(!harness.concat.calls.lock().unwrap()[0].1);
}

#[tokio::test]
async fn test_out_of_band_speed_passes_audio_through() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let id = harness.submit(vec![Segment::with_speed(0.0, 10.0, 200.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.warnings.len(), 1);
    assert!(snapshot.warnings[0].contains("outside the tempo range"));
    assert_eq!(
        harness.encoder.jobs.lock().unwrap()[0].audio,
        AudioPlan::Passthrough
    );
}

#[tokio::test]
async fn test_probe_failure_degrades_and_continues() {
    let harness = Harness::new(
        Err(DomainError::ProbeFailed("ffprobe exited with 1".to_string())),
        FakeEncoder::default(),
    );
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(snapshot.warnings.iter().any(|w| w.contains("analysis failed")));

    // Unknown duration: no trailing gap, and audio is assumed absent
    let jobs = harness.encoder.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job.audio == AudioPlan::None));
}

#[tokio::test]
async fn test_missing_artifact_fails_concat() {
    let encoder = FakeEncoder {
        skip_write_on: Some(1),
        ..FakeEncoder::default()
    };
    let harness = Harness::new(Ok(media(10.0, true)), encoder);
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error_code, Some(ErrorCode::ConcatFailed));
    assert!(snapshot.error.unwrap().contains("Missing artifact"));
    assert_eq!(snapshot.progress, 85);
}

#[tokio::test]
async fn test_progress_never_moves_backward() {
    let encoder = FakeEncoder {
        delay: Some(Duration::from_millis(15)),
        ..FakeEncoder::default()
    };
    let harness = Harness::new(Ok(media(10.0, true)), encoder);
    let id = harness
        .submit(vec![
            Segment::with_speed(1.0, 2.0, 2.0),
            Segment::with_speed(3.0, 4.0, 2.0),
        ])
        .await;

    let interactor = harness.interactor();
    let mut seen = Vec::new();
    loop {
        let snapshot = interactor.status(&id).unwrap();
        seen.push(snapshot.progress);
        if snapshot.status.is_terminal() {
            assert_eq!(snapshot.status, TaskStatus::Completed);
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen[..seen.len() - 1].iter().all(|p| *p < 100));
}

#[tokio::test]
async fn test_invalid_requests_create_no_task() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let interactor = harness.interactor();

    let err = interactor
        .submit(ProcessRequest::new("", vec![Segment::with_speed(0.0, 1.0, 2.0)]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    let err = interactor
        .submit(ProcessRequest::new("in.mp4", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    let err = interactor
        .submit(ProcessRequest::new(
            "missing.mp4",
            vec![Segment::with_speed(0.0, 1.0, 2.0)],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = interactor
        .submit(ProcessRequest::new(
            "in.mp4",
            vec![
                Segment::with_speed(0.0, 5.0, 2.0),
                Segment::with_speed(3.0, 8.0, 2.0),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    assert!(interactor.registry().is_empty());
}

#[tokio::test]
async fn test_overlaps_accepted_when_allowed() {
    let harness = Harness::with_config(Ok(media(10.0, true)), FakeEncoder::default(), |config| {
        config.pipeline.reject_overlaps = false;
    });
    let id = harness
        .submit(vec![
            Segment::with_speed(0.0, 5.0, 2.0),
            Segment::with_speed(3.0, 8.0, 2.0),
        ])
        .await;
    let snapshot = harness.wait(&id).await;
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(harness.encoder.jobs.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let encoder = FakeEncoder {
        delay: Some(Duration::from_millis(20)),
        ..FakeEncoder::default()
    };
    let harness = Harness::with_config(Ok(media(4.0, true)), encoder, |config| {
        config.pipeline.max_concurrent_tasks = 1;
    });

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(harness.submit(vec![Segment::with_speed(0.0, 4.0, 2.0)]).await);
    }
    for id in &ids {
        assert_eq!(harness.wait(id).await.status, TaskStatus::Completed);
    }
    assert_eq!(harness.encoder.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_running_task() {
    let encoder = FakeEncoder {
        delay: Some(Duration::from_secs(30)),
        ..FakeEncoder::default()
    };
    let harness = Harness::new(Ok(media(10.0, true)), encoder);
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let interactor = harness.interactor();

    for _ in 0..200 {
        if matches!(
            interactor.status(&id).unwrap().status,
            TaskStatus::ProcessingSegment(_)
        ) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let snapshot = interactor.cancel(&id).unwrap();
    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error_code, Some(ErrorCode::Cancelled));

    let snapshot = harness.wait(&id).await;
    assert_eq!(snapshot.error_code, Some(ErrorCode::Cancelled));
    assert!(harness.concat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let err = harness.interactor().status(&TaskId::new()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(harness.dir.path().exists());
}

#[tokio::test]
async fn test_panicking_task_does_not_take_down_others() {
    let encoder = FakeEncoder {
        panic_on: Some(1),
        delay: Some(Duration::from_millis(20)),
        ..FakeEncoder::default()
    };
    let harness = Harness::with_config(Ok(media(10.0, true)), encoder, |config| {
        config.pipeline.max_concurrent_tasks = 2;
    });

    // Three ranges: the second one panics
    let crashing = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    // One range only
    let healthy = harness.submit(vec![Segment::with_speed(0.0, 10.0, 2.0)]).await;

    let snapshot = harness.wait(&crashing).await;
    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error_code, Some(ErrorCode::Internal));
    assert!(snapshot.error.unwrap().contains("panicked"));
    assert!(snapshot.progress < 100);

    let snapshot = harness.wait(&healthy).await;
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.progress, 100);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cancel_stops_running_ffmpeg() {
    use speedtrim::adapters::FFmpegAdapter;
    use std::os::unix::fs::PermissionsExt;

    let scratch = TempDir::new().unwrap();
    let marker = scratch.path().join("encode-finished");
    let script = scratch.path().join("slow-ffmpeg");
    std::fs::write(
        &script,
        format!("#!/bin/sh\nsleep 1\necho done > '{}'\n", marker.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let harness = Harness::with_encode_port(
        Ok(media(10.0, true)),
        Arc::new(FFmpegAdapter::new(script.clone())),
        |_| {},
    );
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = harness.interactor().cancel(&id).unwrap();
    assert_eq!(snapshot.error_code, Some(ErrorCode::Cancelled));

    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert!(!marker.exists());
    assert_eq!(
        harness.interactor().status(&id).unwrap().error_code,
        Some(ErrorCode::Cancelled)
    );
}

#[tokio::test]
async fn test_list_videos_filters_and_degrades() {
    let mut info = media(12.5, true);
    info.size = 3 * 1024 * 1024;
    let harness = Harness::new(Ok(info), FakeEncoder::default());
    let videos_dir = &harness.config.paths.videos_dir;
    std::fs::write(videos_dir.join("broken.MKV"), b"garbage").unwrap();
    std::fs::write(videos_dir.join("Talk.WebM"), b"x").unwrap();
    std::fs::write(videos_dir.join("notes.txt"), b"x").unwrap();
    std::fs::create_dir(videos_dir.join("folder.mp4")).unwrap();

    let videos = harness.interactor().list_videos().await.unwrap();
    let names: Vec<&str> = videos.iter().map(|v| v.filename.as_str()).collect();
    assert_eq!(names, vec!["Talk.WebM", "broken.MKV", "in.mp4"]);

    let listed = &videos[2];
    assert_eq!(listed.size, "3.0 MB");
    assert_eq!(listed.duration, 12.5);
    assert_eq!((listed.width, listed.height), (320, 240));

    // Unreadable files stay listed with empty metadata
    let broken = &videos[1];
    assert_eq!(broken.size, "0 B");
    assert_eq!(broken.duration, 0.0);
    assert_eq!((broken.width, broken.height), (0, 0));
}

#[tokio::test]
async fn test_list_videos_without_directory_is_empty() {
    let harness = Harness::with_config(Ok(media(1.0, false)), FakeEncoder::default(), |_| {});
    std::fs::remove_dir_all(&harness.config.paths.videos_dir).unwrap();
    assert!(harness.interactor().list_videos().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_interrupt_cancels_waiting_render() {
    use speedtrim::cli::commands::wait_for_task;

    let encoder = FakeEncoder {
        delay: Some(Duration::from_secs(30)),
        ..FakeEncoder::default()
    };
    let harness = Harness::new(Ok(media(10.0, true)), encoder);
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;
    let interactor = harness.interactor();

    // Interrupt fires long before the first real poll would be due
    let started = std::time::Instant::now();
    let snapshot = wait_for_task(
        &interactor,
        &id,
        Duration::from_secs(2),
        tokio::time::sleep(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error_code, Some(ErrorCode::Cancelled));
    assert!(harness.concat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wait_returns_completed_task() {
    use speedtrim::cli::commands::wait_for_task;

    let harness = Harness::new(Ok(media(10.0, true)), FakeEncoder::default());
    let id = harness.submit(vec![Segment::with_speed(2.0, 4.0, 3.0)]).await;

    let snapshot = wait_for_task(
        &harness.interactor(),
        &id,
        Duration::from_millis(10),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.progress, 100);
}
