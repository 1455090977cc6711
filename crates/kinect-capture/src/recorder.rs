//! Kinect recorder
//!
//! Owns a capture device and pulls frame sets on a background thread
//! between `start_recording` and `stop_recording`.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::device::CaptureDevice;
use crate::frame::KinectFrame;
use crate::{CaptureError, InputPipeline, KinectConfig};

type SaveTask = JoinHandle<Result<PathBuf, CaptureError>>;

/// Queue of in-flight frame writes
#[derive(Clone, Default)]
struct SaveQueue {
    tasks: Arc<Mutex<VecDeque<SaveTask>>>,
}

impl SaveQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<SaveTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, output_dir: PathBuf, frame: KinectFrame) {
        let task = std::thread::spawn(move || frame.save(&output_dir));
        self.lock().push_back(task);
    }

    /// Wait for every queued write; returns how many succeeded
    fn drain(&self) -> usize {
        let mut saved = 0;
        loop {
            let task = {
                let mut tasks = self.lock();
                let remaining = tasks.len();
                if remaining > 0 {
                    debug!("Waiting for save tasks, {} left", remaining);
                }
                tasks.pop_front()
            };
            let Some(task) = task else { break };
            match task.join() {
                Ok(Ok(_)) => saved += 1,
                Ok(Err(e)) => error!("Could not finish save task: {}", e),
                Err(_) => error!("Save task panicked"),
            }
        }
        saved
    }
}

/// Shared between the owner and the recorder thread
struct RecorderShared {
    device: Mutex<Box<dyn CaptureDevice>>,
    should_record: AtomicBool,
    frames_recorded: AtomicU64,
    latest_color: Mutex<Option<KinectFrame>>,
}

impl RecorderShared {
    fn device(&self) -> MutexGuard<'_, Box<dyn CaptureDevice>> {
        self.device.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Kinect sensor with start/stop recording
pub struct Kinect {
    config: KinectConfig,
    shared: Arc<RecorderShared>,
    save_tasks: SaveQueue,
    recorder: Option<JoinHandle<()>>,
}

impl Kinect {
    /// Prepare the output directory and start the device streaming
    pub fn new(
        config: KinectConfig,
        mut device: Box<dyn CaptureDevice>,
    ) -> Result<Self, CaptureError> {
        if config.pipeline == InputPipeline::Other {
            return Err(CaptureError::UnsupportedPipeline(config.pipeline));
        }

        std::fs::create_dir_all(&config.image_output_dir).map_err(|source| CaptureError::Io {
            path: config.image_output_dir.clone(),
            source,
        })?;
        info!("Writing images to {}", config.image_output_dir.display());

        device.start()?;
        info!("Device started, serial number: {}", device.serial_number());

        Ok(Self {
            config,
            shared: Arc::new(RecorderShared {
                device: Mutex::new(device),
                should_record: AtomicBool::new(false),
                frames_recorded: AtomicU64::new(0),
                latest_color: Mutex::new(None),
            }),
            save_tasks: SaveQueue::default(),
            recorder: None,
        })
    }

    pub fn config(&self) -> &KinectConfig {
        &self.config
    }

    /// True while the recorder thread is pulling frames; false once it
    /// exits, including after a device error
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some() && self.shared.should_record.load(Ordering::SeqCst)
    }

    /// Frame sets pulled since the recorder was created
    pub fn frames_recorded(&self) -> u64 {
        self.shared.frames_recorded.load(Ordering::SeqCst)
    }

    /// Most recent colour frame seen while recording
    pub fn latest_color_frame(&self) -> Option<KinectFrame> {
        self.shared
            .latest_color
            .lock()
            .map(|frame| (*frame).clone())
            .unwrap_or(None)
    }

    /// Start pulling frames on a background thread; returns immediately
    pub fn start_recording(&mut self) {
        if self.is_recording() {
            warn!("Recording already in progress");
            return;
        }
        self.reap_recorder();

        self.shared.should_record.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        let save_tasks = self.save_tasks.clone();
        let output_dir = self.config.image_output_dir.clone();
        let save_frames = self.config.save_recorded_frames;
        let timeout = Duration::from_millis(self.config.frame_timeout_ms);

        self.recorder = Some(std::thread::spawn(move || {
            info!("Recording started");
            while shared.should_record.load(Ordering::SeqCst) {
                let result = shared.device().wait_for_frames(timeout);
                match result {
                    Ok(set) => {
                        shared.frames_recorded.fetch_add(1, Ordering::SeqCst);
                        if let Ok(mut latest) = shared.latest_color.lock() {
                            *latest = Some(set.color.clone());
                        }
                        if save_frames {
                            for frame in set.into_frames() {
                                save_tasks.push(output_dir.clone(), frame);
                            }
                        }
                    }
                    Err(CaptureError::Timeout(ms)) => {
                        warn!("No frame within {}ms", ms);
                    }
                    Err(e) => {
                        error!("Recording aborted: {}", e);
                        break;
                    }
                }
            }
            shared.should_record.store(false, Ordering::SeqCst);
            info!("Recording stopped");
        }));
    }

    /// Signal the recorder thread to finish and flush pending writes
    pub fn stop_recording(&mut self) {
        if self.recorder.is_none() {
            debug!("Not recording");
            return;
        }
        self.shared.should_record.store(false, Ordering::SeqCst);
        self.reap_recorder();
    }

    /// Join an exited (or signalled) recorder thread
    fn reap_recorder(&mut self) {
        if let Some(handle) = self.recorder.take() {
            if handle.join().is_err() {
                error!("Recorder thread panicked");
            }
            self.save_tasks.drain();
        }
    }

    /// Synchronously capture and write `n_frames_to_save` frame sets
    pub fn save_frames(&mut self, n_frames_to_save: u32) -> Result<usize, CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::Busy);
        }
        self.reap_recorder();

        let timeout = Duration::from_millis(self.config.frame_timeout_ms);
        info!(
            "Writing {} frame sets to {}",
            n_frames_to_save,
            self.config.image_output_dir.display()
        );

        for n_frames_saved in 1..=n_frames_to_save {
            let set = self.shared.device().wait_for_frames(timeout)?;
            info!("Saving frame {}", n_frames_saved);
            for frame in set.into_frames() {
                self.save_tasks
                    .push(self.config.image_output_dir.clone(), frame);
            }
        }

        Ok(self.save_tasks.drain())
    }
}

impl Drop for Kinect {
    fn drop(&mut self) {
        self.stop_recording();
        self.save_tasks.drain();
        self.shared.device().stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FrameSet, SimulatedKinect};

    fn kinect(dir: &std::path::Path, save_recorded_frames: bool) -> Kinect {
        let config = KinectConfig {
            image_output_dir: dir.to_path_buf(),
            frame_timeout_ms: 500,
            save_recorded_frames,
            ..Default::default()
        };
        let device = SimulatedKinect::new().with_frame_interval(Duration::from_millis(5));
        Kinect::new(config, Box::new(device)).unwrap()
    }

    #[test]
    fn test_rejects_other_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config = KinectConfig {
            pipeline: InputPipeline::Other,
            image_output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = Kinect::new(config, Box::new(SimulatedKinect::new()));
        assert!(matches!(result, Err(CaptureError::UnsupportedPipeline(_))));
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("frames");
        let _kinect = kinect(&nested, false);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_record_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut kinect = kinect(dir.path(), false);

        kinect.start_recording();
        assert!(kinect.is_recording());
        std::thread::sleep(Duration::from_millis(300));
        kinect.stop_recording();

        assert!(!kinect.is_recording());
        assert!(kinect.frames_recorded() > 0);
        let color = kinect.latest_color_frame().unwrap();
        assert_eq!(color.width, 1920);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut kinect = kinect(dir.path(), false);

        kinect.stop_recording();
        kinect.start_recording();
        kinect.start_recording();
        kinect.stop_recording();
        kinect.stop_recording();
        assert!(!kinect.is_recording());
    }

    #[test]
    fn test_recorded_frames_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut kinect = kinect(dir.path(), true);

        kinect.start_recording();
        std::thread::sleep(Duration::from_millis(100));
        kinect.stop_recording();

        let written = std::fs::read_dir(dir.path()).unwrap().count() as u64;
        assert_eq!(written, kinect.frames_recorded() * 3);
    }

    #[test]
    fn test_save_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut kinect = kinect(dir.path(), false);

        assert_eq!(kinect.save_frames(2).unwrap(), 6);
        assert!(dir.path().join("Color-1920x1080-BGRX-seq1.bin").exists());
        assert!(dir.path().join("Depth-512x424-Float-seq2.bin").exists());
    }

    /// Streams nothing but errors
    struct FailingDevice;

    impl CaptureDevice for FailingDevice {
        fn serial_number(&self) -> &str {
            "FAILING"
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn wait_for_frames(&mut self, _timeout: Duration) -> Result<FrameSet, CaptureError> {
            Err(CaptureError::Stream("device unplugged".to_string()))
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn test_device_error_ends_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = KinectConfig {
            image_output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut kinect = Kinect::new(config, Box::new(FailingDevice)).unwrap();

        kinect.start_recording();
        std::thread::sleep(Duration::from_millis(200));

        assert!(!kinect.is_recording());
        assert_eq!(kinect.frames_recorded(), 0);
        assert!(matches!(kinect.save_frames(1), Err(CaptureError::Stream(_))));
        // a fresh session can start after the failed one
        kinect.start_recording();
        kinect.stop_recording();
        assert!(!kinect.is_recording());
    }

    #[test]
    fn test_save_frames_while_recording_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let mut kinect = kinect(dir.path(), false);

        kinect.start_recording();
        assert!(matches!(kinect.save_frames(1), Err(CaptureError::Busy)));
        kinect.stop_recording();
    }
}
