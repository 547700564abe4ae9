//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（模拟 IMU + 模拟桌面捕获，无需硬件）
//! - 回放日志与 PNG 输出

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, RigConfig, Severity};

    #[test]
    fn test_default_rig_is_valid() {
        let rig = RigConfig::default();
        assert!(config_loader::ConfigLoader::validate(&rig).is_ok());
        assert_eq!(rig.filter.alpha, 0.98);
        assert_eq!(rig.filter.max_dt_s, 0.5);
        assert_eq!(rig.pipeline.queue_capacity, 2);
        assert_eq!(rig.pipeline.stage_timeout_ms, 50);
        assert_eq!(rig.pipeline.staleness_threshold_s, 0.25);
    }

    #[test]
    fn test_resource_failures_are_fatal() {
        assert_eq!(
            ContractError::sensor_lost("imu", "unplugged").severity(),
            Severity::Fatal
        );
        assert_eq!(
            ContractError::display_write("png", "disk full").severity(),
            Severity::Transient
        );
        assert_eq!(
            ContractError::config_validation("eye.ipd_m", "must be > 0").severity(),
            Severity::Configuration
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        CaptureConfig, DisplayConfig, DisplayKind, DisplayLayout, DisplayOutput, DisplaySurface,
        EyeParameters, FilterConfig, ImuSource, PipelineSettings, SessionClock, TrackingStatus,
    };
    use coordinator::{Coordinator, CoordinatorConfig, PipelineError, StageState};
    use display::ChannelDisplay;
    use ingestion::{
        IngestionPipeline, LineImuSource, MockFrameSource, MockImuConfig, MockImuSource,
    };
    use tokio::sync::mpsc;
    use tracking::TrackerWorker;

    fn small_eye() -> EyeParameters {
        EyeParameters {
            eye_width: 32,
            eye_height: 24,
            ..Default::default()
        }
    }

    fn coordinator_config(layout: DisplayLayout) -> CoordinatorConfig {
        CoordinatorConfig {
            settings: PipelineSettings {
                staleness_threshold_s: 1.0,
                ..Default::default()
            },
            eye: small_eye(),
            layout,
        }
    }

    fn mock_capture(clock: SessionClock) -> MockFrameSource {
        let config = CaptureConfig {
            width: 64,
            height: 48,
            fps: 60.0,
            ..Default::default()
        };
        MockFrameSource::new(&config, clock)
    }

    fn sensor_pipeline(source: Box<dyn ImuSource>) -> IngestionPipeline {
        let mut ingestion = IngestionPipeline::new(64);
        ingestion.register_source(source, None).unwrap();
        ingestion
    }

    fn collect(mut rx: mpsc::Receiver<DisplayOutput>) -> tokio::task::JoinHandle<Vec<DisplayOutput>> {
        tokio::spawn(async move {
            let mut outputs = Vec::new();
            while let Some(output) = rx.recv().await {
                outputs.push(output);
            }
            outputs
        })
    }

    fn attitude_lines(yaw_deg: f64) -> Vec<String> {
        vec![format!("Yaw: {yaw_deg:.1}, Pitch: 0.0, Roll: 0.0")]
    }

    /// Mock IMU -> tracker -> coordinator -> channel display
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_session() {
        let clock = SessionClock::start();
        let imu = MockImuSource::new("imu", MockImuConfig::default(), clock);
        let mut ingestion = sensor_pipeline(Box::new(imu));
        let tracker = TrackerWorker::spawn(
            "imu",
            FilterConfig::default(),
            ingestion.take_receiver().unwrap(),
        );
        ingestion.start_all().unwrap();

        let (display, rx) = ChannelDisplay::new("viewer", 256);
        let outputs = collect(rx);
        let mut handle = Coordinator::new(
            coordinator_config(DisplayLayout::SideBySide),
            mock_capture(clock),
            display,
            tracker.reader(),
            clock,
        )
        .spawn()
        .unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(handle.state(), StageState::Running);
        let stats = handle.shutdown().await.unwrap();

        let report = tracker.stop().await.unwrap();
        ingestion.close();
        assert!(report.stats.accepted > 0);
        assert!(report.last.is_some());

        let outputs = outputs.await.unwrap();
        assert!(!outputs.is_empty());
        assert_eq!(outputs.len() as u64, stats.frames_presented);
        assert!(outputs.windows(2).all(|w| w[1].frame_id > w[0].frame_id));
        // once the tracker has published, frames are live
        assert_eq!(outputs.last().unwrap().tracking, TrackingStatus::Live);
        assert!(ingestion.metrics().snapshot().messages_received > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_replayed_attitude_drives_orientation() {
        let clock = SessionClock::start();
        let imu = LineImuSource::from_lines("serial", attitude_lines(30.0), 200.0, clock).looping(true);
        let mut ingestion = sensor_pipeline(Box::new(imu));
        let tracker = TrackerWorker::spawn(
            "serial",
            FilterConfig::default(),
            ingestion.take_receiver().unwrap(),
        );
        ingestion.start_all().unwrap();

        let (display, rx) = ChannelDisplay::new("viewer", 256);
        let outputs = collect(rx);
        let mut handle = Coordinator::new(
            coordinator_config(DisplayLayout::Dual),
            mock_capture(clock),
            display,
            tracker.reader(),
            clock,
        )
        .spawn()
        .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        let estimate = tracker.reader().latest().unwrap();
        assert!((estimate.yaw - 30f64.to_radians()).abs() < 1e-6);
        assert!(estimate.pitch.abs() < 1e-9);

        handle.shutdown().await.unwrap();
        tracker.stop().await.unwrap();
        ingestion.close();

        let outputs = outputs.await.unwrap();
        assert!(!outputs.is_empty());
        for output in &outputs {
            match &output.surface {
                DisplaySurface::Dual { left, right } => {
                    assert_eq!((left.width, left.height), (32, 24));
                    assert_eq!((right.width, right.height), (32, 24));
                }
                other => panic!("expected dual surfaces, got {other:?}"),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_replay_end_is_sensor_loss() {
        let clock = SessionClock::start();
        let imu = LineImuSource::from_lines("serial", attitude_lines(5.0), 200.0, clock);
        let mut ingestion = sensor_pipeline(Box::new(imu));
        let tracker = TrackerWorker::spawn(
            "serial",
            FilterConfig::default(),
            ingestion.take_receiver().unwrap(),
        );
        ingestion.start_all().unwrap();

        let (display, _rx) = ChannelDisplay::new("viewer", 256);
        let mut handle = Coordinator::new(
            coordinator_config(DisplayLayout::SideBySide),
            mock_capture(clock),
            display,
            tracker.reader(),
            clock,
        )
        .spawn()
        .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("pipeline stops on its own")
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fatal(contracts::ContractError::SensorLost { .. })
        ));
        assert_eq!(handle.state(), StageState::Stopped);

        assert!(tracker.join().await.is_err());
        ingestion.close();
    }

    fn png_files(dir: &Path) -> Vec<std::path::PathBuf> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                found.extend(png_files(&path));
            } else if path.extension().is_some_and(|e| e == "png") {
                found.push(path);
            }
        }
        found
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_png_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let clock = SessionClock::start();
        let imu = MockImuSource::new("imu", MockImuConfig::default(), clock);
        let mut ingestion = sensor_pipeline(Box::new(imu));
        let tracker = TrackerWorker::spawn(
            "imu",
            FilterConfig::default(),
            ingestion.take_receiver().unwrap(),
        );
        ingestion.start_all().unwrap();

        let display = display::create_display(&DisplayConfig {
            kind: DisplayKind::Png,
            layout: DisplayLayout::SideBySide,
            output_dir: Some(dir.path().to_path_buf()),
            every_nth: 1,
        })
        .unwrap();

        let mut handle = Coordinator::new(
            coordinator_config(DisplayLayout::SideBySide),
            mock_capture(clock),
            display,
            tracker.reader(),
            clock,
        )
        .spawn()
        .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let stats = handle.shutdown().await.unwrap();
        tracker.stop().await.unwrap();
        ingestion.close();

        assert!(stats.frames_presented > 0);
        let pngs = png_files(dir.path());
        assert_eq!(pngs.len() as u64, stats.frames_presented);

        assert_eq!(image::image_dimensions(&pngs[0]).unwrap(), (64, 24));
    }

    #[tokio::test]
    async fn test_config_file_to_session() {
        let toml = r#"
            [eye]
            eye_width = 32
            eye_height = 24
            ipd_m = 0.06

            [capture]
            width = 64
            height = 48
            fps = 60.0

            [pipeline]
            queue_capacity = 3
        "#;
        let rig = config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
            .unwrap();

        let clock = SessionClock::start();
        let capture = ingestion::create_frame_source(&rig.capture, clock).unwrap();
        let (display, rx) = ChannelDisplay::new("viewer", 64);
        let outputs = collect(rx);
        let (cell, reader) = tracking::LatestOrientation::new();
        cell.publish(contracts::OrientationEstimate::level(clock.now()));

        let cache = Arc::new(stereo::DistortionCache::new());
        let mut handle = Coordinator::new(
            CoordinatorConfig {
                settings: rig.pipeline,
                eye: rig.eye,
                layout: rig.display.layout,
            },
            capture,
            display,
            reader,
            clock,
        )
        .with_cache(Arc::clone(&cache))
        .spawn()
        .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        let stats = handle.shutdown().await.unwrap();
        drop(cell);

        assert!(stats.frames_presented > 0);
        assert_eq!(cache.stats().misses, 2);
        assert!(cache.stats().hits > 0 || stats.frames_processed == 1);
        assert!(!outputs.await.unwrap().is_empty());
    }
}
